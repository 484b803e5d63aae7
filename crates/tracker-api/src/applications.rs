use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tracker_query::{Condition, PageRequest, PaginationSummary, Predicate, SortSpec, resolve_sort};
use tracker_types::api::{ApiResponse, ApplicationRequest};
use tracker_types::models::{Application, ApplicationStatus};

use crate::error::{ApiError, ApiResult};
use crate::filter::{FilterQuery, SearchQuery};
use crate::middleware::CurrentUser;
use crate::state::{AppState, run_db};
use crate::validation;

const NOT_FOUND: &str = "Application not found";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// One page of applications plus whichever parameters produced it.
#[derive(Debug, Serialize)]
pub struct ApplicationList {
    pub applications: Vec<Application>,
    pub pagination: PaginationSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchQuery>,
}

impl ApplicationList {
    pub(crate) fn new(applications: Vec<Application>, pagination: PaginationSummary) -> Self {
        Self {
            applications,
            pagination,
            filters: None,
            sort: None,
            search: None,
        }
    }
}

/// Timestamps are stored at millisecond precision; truncate so responses
/// agree with what a later read returns.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Run a paged, owner-scoped query.
pub(crate) async fn fetch_page(
    state: &AppState,
    predicate: Predicate,
    sort: SortSpec,
    page: PageRequest,
) -> ApiResult<ApplicationList> {
    let (applications, total) =
        run_db(state, move |db| db.find(&predicate, &sort, page.offset(), page.limit)).await?;
    Ok(ApplicationList::new(applications, page.summary(total)))
}

/// Ids that do not parse cannot belong to anyone, so they miss like any other.
fn parse_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse().map_err(|_| ApiError::NotFound(NOT_FOUND.into()))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<ApplicationList>>> {
    let Query(query) = query?;
    let mut predicate = Predicate::for_owner(user.id);
    if let Some(raw) = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let status = raw
            .parse::<ApplicationStatus>()
            .map_err(|e| ApiError::Validation(vec![e.to_string()]))?;
        predicate.push(Condition::Status(status));
    }

    let sort = resolve_sort(query.sort_by.as_deref(), query.sort_order.as_deref());
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());

    let list = fetch_page(&state, predicate, sort, page).await?;
    Ok(Json(ApiResponse::ok(list)))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<ApiResponse<Application>>> {
    let Path(id) = path?;
    let id = parse_id(&id)?;
    let app = run_db(&state, move |db| db.get_application(user.id, id))
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.into()))?;
    Ok(Json(ApiResponse::ok(app)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Result<Json<ApplicationRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let app = validation::new_application(user.id, &req, now())?;

    let stored = app.clone();
    run_db(&state, move |db| db.create_application(&stored)).await?;
    info!("User {} created application {}", user.id, app.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message("Application created successfully", app)),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<ApplicationRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<Application>>> {
    let Path(id) = path?;
    let id = parse_id(&id)?;
    let Json(req) = body?;

    let mut app = run_db(&state, move |db| db.get_application(user.id, id))
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.into()))?;
    validation::apply_update(&mut app, &req, now())?;

    let stored = app.clone();
    let updated = run_db(&state, move |db| db.update_application(&stored)).await?;
    if !updated {
        // Deleted between the read and the write.
        return Err(ApiError::NotFound(NOT_FOUND.into()));
    }

    Ok(Json(ApiResponse::ok_with_message("Application updated successfully", app)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Path(id) = path?;
    let id = parse_id(&id)?;
    let deleted = run_db(&state, move |db| db.delete_application(user.id, id)).await?;
    if !deleted {
        return Err(ApiError::NotFound(NOT_FOUND.into()));
    }
    Ok(Json(ApiResponse::message("Application deleted successfully")))
}

pub async fn clear(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let owner = user.id;
    let removed = run_db(&state, move |db| db.delete_all_applications(owner)).await?;
    info!("User {} cleared {} applications", owner, removed);
    Ok(Json(ApiResponse::message(format!("Successfully deleted {} applications", removed))))
}
