use axum::{
    Extension, Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;

use tracker_query::{Condition, Predicate};
use tracker_query::analytics::{
    Bucket, GroupKey, SummaryInput, SummaryStats, TopCompaniesReport, TrendReport, category_counts,
    parse_top_limit, resolve_window, summarize, summary_window, top_companies, trend_points,
};
use tracker_types::api::ApiResponse;

use crate::applications::now;
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::{AppState, run_db};

#[derive(Debug, Default, Deserialize)]
pub struct TrendsQuery {
    pub period: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopCompaniesQuery {
    pub limit: Option<String>,
}

pub async fn trends(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    query: Result<Query<TrendsQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<TrendReport>>> {
    let Query(query) = query?;
    let window = resolve_window(query.period.as_deref(), query.year.as_deref(), now())?;
    let predicate = Predicate::for_owner(user.id).and(Condition::AppliedWithin(window.range));
    let bucket = window.bucket;

    let (periods, statuses, types) = run_db(&state, move |db| {
        Ok((
            db.aggregate(&predicate, GroupKey::Period(bucket))?,
            db.aggregate(&predicate, GroupKey::Status)?,
            db.aggregate(&predicate, GroupKey::ApplicationType)?,
        ))
    })
    .await?;

    Ok(Json(ApiResponse::ok(TrendReport {
        trends: trend_points(periods, bucket),
        status_breakdown: category_counts(&statuses),
        type_distribution: category_counts(&types),
        period: window.period,
        date_range: window.range,
    })))
}

pub async fn top(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    query: Result<Query<TopCompaniesQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<TopCompaniesReport>>> {
    let Query(query) = query?;
    let limit = parse_top_limit(query.limit.as_deref());
    let predicate = Predicate::for_owner(user.id);
    let rows = run_db(&state, move |db| db.aggregate(&predicate, GroupKey::Company)).await?;
    Ok(Json(ApiResponse::ok(top_companies(rows, limit))))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<ApiResponse<SummaryStats>>> {
    let now = now();
    let owner = user.id;

    let input = run_db(&state, move |db| {
        let all = Predicate::for_owner(owner);
        let recent = Predicate::for_owner(owner).and(Condition::AppliedWithin(summary_window(now)));
        Ok(SummaryInput {
            total: db.count(&all)?,
            by_status: db.aggregate(&all, GroupKey::Status)?,
            by_month: db.aggregate(&recent, GroupKey::Period(Bucket::Month))?,
            by_type: db.aggregate(&all, GroupKey::ApplicationType)?,
            first_application: db.first_application_date(owner)?,
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok(summarize(input, now))))
}
