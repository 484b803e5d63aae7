use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};
use uuid::Uuid;

use tracker_types::api::{ApiResponse, AuthResponse, Claims, LoginRequest, SignupRequest, UserResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::{AppState, run_db};
use crate::validation;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let new_user = validation::signup(&req)?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(new_user.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();
    let user = run_db(&state, move |db| {
        if db.get_user_by_email(&new_user.email)?.is_some() {
            return Ok(None);
        }
        db.create_user(user_id, &new_user.name, &new_user.email, &password_hash)?;
        db.get_user_by_id(user_id)?.map(|row| row.into_user()).transpose()
    })
    .await?
    .ok_or_else(|| ApiError::BadRequest("User already exists with this email".into()))?;

    let token = create_token(&state.jwt_secret, user.id, state.token_ttl)?;
    info!("User {} signed up", user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message("User created successfully", AuthResponse { user, token })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let (email, password) = validation::login(&req)?;

    let row = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&row.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash for user {} is corrupt: {}", row.id, e)))?;
    if Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_err() {
        warn!("Failed login for user {}", row.id);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let user = row.into_user()?;
    let token = create_token(&state.jwt_secret, user.id, state.token_ttl)?;

    Ok(Json(ApiResponse::ok_with_message("Login successful", AuthResponse { user, token })))
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::ok(UserResponse { user }))
}

pub fn create_token(secret: &str, user_id: Uuid, ttl: chrono::Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
