use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use tracker_types::api::Claims;
use tracker_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// The authenticated caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extract and validate the bearer JWT, then confirm its user still exists.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::Unauthorized("Access token is required".into()))?;

    let claims = decode_token(&state.jwt_secret, bearer.token())?;

    let row = run_db(&state, move |db| db.get_user_by_id(claims.sub))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid token - user not found".into()))?;

    req.extensions_mut().insert(CurrentUser(row.into_user()?));
    Ok(next.run(req).await)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token has expired".into()),
        _ => ApiError::Unauthorized("Invalid token".into()),
    })
}
