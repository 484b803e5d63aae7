use axum::{
    Json, Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::SecondsFormat;
use serde::Serialize;

use tracker_types::api::ApiResponse;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{analytics, applications, auth, filter};

#[derive(Debug, Serialize)]
pub struct Health {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
}

/// GET /health: liveness check (no auth).
pub async fn health() -> Json<Health> {
    Json(Health {
        success: true,
        message: "Application tracker API is running",
        timestamp: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ApiResponse::failure("Route not found", None)))
}

/// Every route the API serves. CORS and request tracing are layered on by the
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/applications",
            get(applications::list)
                .post(applications::create)
                .delete(applications::clear),
        )
        .route("/api/applications/filter", get(filter::filter))
        .route("/api/applications/sort", get(filter::sort))
        .route("/api/applications/search", get(filter::search))
        .route(
            "/api/applications/{id}",
            get(applications::get)
                .put(applications::update)
                .delete(applications::delete),
        )
        .route("/api/analytics/trends", get(analytics::trends))
        .route("/api/analytics/top-companies", get(analytics::top))
        .route("/api/analytics/stats", get(analytics::stats))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tracker_db::Database;

    use super::*;
    use crate::state::AppStateInner;

    fn app() -> Router {
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            token_ttl: chrono::Duration::days(7),
        });
        router(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    async fn signup(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"name": "Test User", "email": email, "password": "secret123"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create(app: &Router, token: &str, company: &str, date: &str, status: &str) -> Value {
        let (code, body) = send(
            app,
            "POST",
            "/api/applications",
            Some(token),
            Some(json!({
                "companyName": company,
                "position": "Software Intern",
                "location": "Remote",
                "applicationType": "Summer",
                "source": "LinkedIn",
                "applicationDate": date,
                "status": status,
            })),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED, "{}", body);
        body["data"].clone()
    }

    #[tokio::test]
    async fn health_is_public_and_unknown_routes_are_json() {
        let app = app();
        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = send(&app, "GET", "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Route not found");
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/applications", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Access token is required");

        let (status, body) = send(&app, "GET", "/api/analytics/stats", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
    }

    #[tokio::test]
    async fn signup_login_and_profile() {
        let app = app();
        let token = signup(&app, "ada@example.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/signup",
            None,
            Some(json!({"name": "Ada Again", "email": "ADA@example.com", "password": "secret123"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists with this email");

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "wrong-password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ada@example.com", "password": "secret123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["token"].is_string());

        let (_, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(body["data"]["user"]["email"], "ada@example.com");
        assert_eq!(body["data"]["user"]["hasApplicationCreated"], false);
        assert!(body["data"]["user"].get("password").is_none());

        create(&app, &token, "Acme", "2024-03-05", "Applied").await;
        let (_, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(body["data"]["user"]["hasApplicationCreated"], true);
    }

    #[tokio::test]
    async fn create_fills_defaults_and_fetch_returns_them() {
        let app = app();
        let token = signup(&app, "defaults@example.com").await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/applications",
            Some(&token),
            Some(json!({
                "companyName": "Initech",
                "position": "Backend Intern",
                "location": "Austin",
                "applicationType": "Fall",
                "source": "Referral",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["data"]["id"].as_str().unwrap();

        let (status, body) = send(&app, "GET", &format!("/api/applications/{}", id), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let app_json = &body["data"];
        assert_eq!(app_json["status"], "Applied");
        assert_eq!(app_json["notes"], "");
        assert_eq!(app_json["interviewRounds"], json!([]));
        assert_eq!(app_json["followUpDate"], Value::Null);
        assert_eq!(app_json["offerDetails"], json!({"stipend": "", "duration": "", "startDate": null}));
        assert_eq!(app_json, &created["data"]);
    }

    #[tokio::test]
    async fn invalid_create_reports_every_field() {
        let app = app();
        let token = signup(&app, "invalid@example.com").await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/applications",
            Some(&token),
            Some(json!({"companyName": "Acme", "applicationType": "Internship"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn month_out_of_range_is_rejected() {
        let app = app();
        let token = signup(&app, "month@example.com").await;
        let (status, body) =
            send(&app, "GET", "/api/applications/filter?month=13&year=2024", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"][0].as_str().unwrap().starts_with("Month must be a number between 1 and 12"));
    }

    #[tokio::test]
    async fn filter_only_sees_the_callers_records() {
        let app = app();
        let a = signup(&app, "a@example.com").await;
        let b = signup(&app, "b@example.com").await;

        create(&app, &a, "Acme", "2024-03-01", "Applied").await;
        create(&app, &a, "Globex", "2024-03-15", "Applied").await;
        create(&app, &a, "Initech", "2024-03-31T23:00:00Z", "Rejected").await;
        create(&app, &a, "Hooli", "2024-04-01", "Applied").await;
        create(&app, &b, "Acme", "2024-03-02", "Applied").await;
        create(&app, &b, "Umbrella", "2024-03-20", "Interview").await;

        let (status, body) = send(&app, "GET", "/api/applications/filter?month=3&year=2024", Some(&a), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["totalItems"], 3);
        assert_eq!(body["data"]["filters"]["month"], "3");
        assert!(body["data"]["filters"].get("page").is_none());

        let (_, body) = send(&app, "GET", "/api/applications/search?keyword=acme", Some(&b), None).await;
        assert_eq!(body["data"]["pagination"]["totalItems"], 1);
        assert_eq!(body["data"]["search"]["keyword"], "acme");
    }

    #[tokio::test]
    async fn malformed_query_strings_use_the_envelope() {
        let app = app();
        let token = signup(&app, "query@example.com").await;
        let (status, body) =
            send(&app, "GET", "/api/applications/filter?month=3&month=4", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Validation failed");
        assert!(body["errors"][0].is_string());
    }

    #[tokio::test]
    async fn out_of_range_years_never_reach_the_store() {
        let app = app();
        let token = signup(&app, "years@example.com").await;
        for date in ["+10000-01-01", "-0001-06-01"] {
            let (status, body) = send(
                &app,
                "POST",
                "/api/applications",
                Some(&token),
                Some(json!({
                    "companyName": "Acme",
                    "position": "Intern",
                    "location": "Remote",
                    "applicationType": "Summer",
                    "source": "LinkedIn",
                    "applicationDate": date,
                })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", date);
            assert_eq!(body["errors"][0], "Application date must be a valid ISO 8601 date");
        }

        let (status, _) = send(&app, "GET", "/api/applications", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn sub_millisecond_dates_survive_a_round_trip() {
        let app = app();
        let token = signup(&app, "precision@example.com").await;
        let created = create(&app, &token, "Acme", "2024-03-05T10:00:00.123456Z", "Applied").await;
        let uri = format!("/api/applications/{}", created["id"].as_str().unwrap());

        let (_, fetched) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(fetched["data"]["applicationDate"], created["applicationDate"]);
        assert_eq!(fetched["data"], created);
    }

    #[tokio::test]
    async fn text_search_folds_non_ascii_case() {
        let app = app();
        let token = signup(&app, "unicode@example.com").await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/applications",
            Some(&token),
            Some(json!({
                "companyName": "ÉCOLE Zürich",
                "position": "Research Intern",
                "location": "MÜNCHEN",
                "applicationType": "Summer",
                "source": "Website",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&app, "GET", "/api/applications/search?company=%C3%A9cole", Some(&token), None).await;
        assert_eq!(body["data"]["pagination"]["totalItems"], 1);
        let (_, body) =
            send(&app, "GET", "/api/applications/filter?location=m%C3%BCnchen", Some(&token), None).await;
        assert_eq!(body["data"]["pagination"]["totalItems"], 1);
    }

    #[tokio::test]
    async fn trends_report_buckets_breakdowns_and_window() {
        let app = app();
        let token = signup(&app, "trends@example.com").await;
        create(&app, &token, "Acme", "2024-03-10", "Applied").await;
        create(&app, &token, "Globex", "2024-01-15", "Rejected").await;
        create(&app, &token, "Initech", "2024-03-20", "Applied").await;
        create(&app, &token, "Hooli", "2023-12-31", "Applied").await;

        let (status, body) = send(&app, "GET", "/api/analytics/trends?year=2024", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(
            data["trends"],
            json!([
                {"date": "2024-01-01", "count": 1, "statuses": ["Rejected"]},
                {"date": "2024-03-01", "count": 2, "statuses": ["Applied", "Applied"]},
            ])
        );
        let statuses = data["statusBreakdown"].as_array().unwrap();
        assert_eq!(statuses.len(), 2);
        assert!(statuses.contains(&json!({"name": "Applied", "count": 2})));
        assert!(statuses.contains(&json!({"name": "Rejected", "count": 1})));
        assert_eq!(data["typeDistribution"], json!([{"name": "Summer", "count": 3}]));
        assert_eq!(data["dateRange"]["start"], "2024-01-01T00:00:00Z");
        assert_eq!(data["dateRange"]["end"], "2024-12-31T23:59:59Z");

        // Omitted applicationDate means now, which falls in this week's daily bucket.
        let (status, _) = send(
            &app,
            "POST",
            "/api/applications",
            Some(&token),
            Some(json!({
                "companyName": "Umbrella",
                "position": "Intern",
                "location": "Remote",
                "applicationType": "Fall",
                "source": "Referral",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&app, "GET", "/api/analytics/trends?period=week", Some(&token), None).await;
        let data = &body["data"];
        assert_eq!(data["period"], "week");
        let trends = data["trends"].as_array().unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0]["date"].as_str().unwrap().len(), 10);
        assert_eq!(data["typeDistribution"], json!([{"name": "Fall", "count": 1}]));
    }

    #[tokio::test]
    async fn other_users_records_are_not_found() {
        let app = app();
        let a = signup(&app, "owner@example.com").await;
        let b = signup(&app, "intruder@example.com").await;
        let record = create(&app, &a, "Acme", "2024-03-01", "Applied").await;
        let uri = format!("/api/applications/{}", record["id"].as_str().unwrap());

        let (status, _) = send(&app, "GET", &uri, Some(&b), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "PUT", &uri, Some(&b), Some(json!({"status": "Accepted"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", &uri, Some(&b), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "GET", "/api/applications/not-a-uuid", Some(&a), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "PUT", &uri, Some(&a), Some(json!({"status": "Accepted"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "Accepted");
        assert_eq!(body["data"]["companyName"], "Acme");
    }

    #[tokio::test]
    async fn top_companies_rank_by_count() {
        let app = app();
        let token = signup(&app, "ranking@example.com").await;
        create(&app, &token, "Acme", "2024-01-01", "Accepted").await;
        create(&app, &token, "Acme", "2024-01-02", "Rejected").await;
        for day in 3..8 {
            create(&app, &token, "Globex", &format!("2024-01-0{}", day), "Applied").await;
        }

        let (status, body) = send(&app, "GET", "/api/analytics/top-companies?limit=10", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let top = body["data"]["topCompanies"].as_array().unwrap();
        assert_eq!(top[0]["company"], "Globex");
        assert_eq!(top[0]["count"], 5);
        assert_eq!(top[0]["successRate"], 0.0);
        assert_eq!(top[1]["company"], "Acme");
        assert_eq!(top[1]["successRate"], 0.5);
        assert_eq!(body["data"]["totalCompanies"], 2);
    }

    #[tokio::test]
    async fn stats_and_sort_and_bulk_delete() {
        let app = app();
        let token = signup(&app, "stats@example.com").await;

        let (_, body) = send(&app, "GET", "/api/analytics/stats", Some(&token), None).await;
        assert_eq!(body["data"]["totalApplications"], 0);
        assert_eq!(body["data"]["successRate"], 0.0);
        assert_eq!(body["data"]["avgApplicationsPerMonth"], 0.0);

        create(&app, &token, "Beta", "2024-02-01", "Accepted").await;
        create(&app, &token, "Alpha", "2024-02-02", "Applied").await;

        let (_, body) = send(&app, "GET", "/api/analytics/stats", Some(&token), None).await;
        assert_eq!(body["data"]["totalApplications"], 2);
        assert_eq!(body["data"]["successRate"], 50.0);

        let (_, body) =
            send(&app, "GET", "/api/applications/sort?by=companyName&order=asc", Some(&token), None).await;
        assert_eq!(body["data"]["applications"][0]["companyName"], "Alpha");
        assert_eq!(body["data"]["sort"], json!({"by": "companyName", "order": "asc"}));

        let (status, body) = send(&app, "DELETE", "/api/applications", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Successfully deleted 2 applications");

        let (_, body) = send(&app, "GET", "/api/applications", Some(&token), None).await;
        assert_eq!(body["data"]["pagination"]["totalItems"], 0);
        assert_eq!(body["data"]["pagination"]["totalPages"], 0);
    }
}
