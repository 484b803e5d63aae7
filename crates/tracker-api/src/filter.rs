//! Filter, sort and search listings. Each echoes the parameters it was given
//! next to the page of results.

use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use tracker_query::{FilterParams, PageRequest, Predicate, SortSpec, build_predicate, resolve_sort};
use tracker_types::api::ApiResponse;

use crate::applications::{ApplicationList, fetch_page, now};
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    pub status: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    pub job_type: Option<String>,
    pub location: Option<String>,
    #[serde(skip_serializing)]
    pub page: Option<String>,
    #[serde(skip_serializing)]
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SortQuery {
    pub by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchQuery {
    pub company: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub keyword: Option<String>,
    #[serde(skip_serializing)]
    pub page: Option<String>,
    #[serde(skip_serializing)]
    pub limit: Option<String>,
}

pub async fn filter(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    query: Result<Query<FilterQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<ApplicationList>>> {
    let Query(query) = query?;
    let params = FilterParams {
        status: query.status.clone(),
        job_type: query.job_type.clone(),
        location: query.location.clone(),
        month: query.month.clone(),
        year: query.year.clone(),
        ..Default::default()
    };
    let predicate = build_predicate(user.id, &params, now().year())?;
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());

    let mut list = fetch_page(&state, predicate, SortSpec::default(), page).await?;
    list.filters = Some(query);
    Ok(Json(ApiResponse::ok(list)))
}

pub async fn sort(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    query: Result<Query<SortQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<ApplicationList>>> {
    let Query(query) = query?;
    let sort = resolve_sort(query.by.as_deref(), query.order.as_deref());
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());

    let mut list = fetch_page(&state, Predicate::for_owner(user.id), sort, page).await?;
    list.sort = Some(sort);
    Ok(Json(ApiResponse::ok(list)))
}

pub async fn search(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<ApplicationList>>> {
    let Query(query) = query?;
    let params = FilterParams {
        company: query.company.clone(),
        position: query.position.clone(),
        location: query.location.clone(),
        keyword: query.keyword.clone(),
        ..Default::default()
    };
    let predicate = build_predicate(user.id, &params, now().year())?;
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());

    let mut list = fetch_page(&state, predicate, SortSpec::default(), page).await?;
    list.search = Some(query);
    Ok(Json(ApiResponse::ok(list)))
}
