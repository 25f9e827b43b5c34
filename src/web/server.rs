use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::activity::ActivityKind;
use crate::config::{Config, WebConfig};
use crate::desk::ReviewDesk;
use crate::employees::{EmployeeFilter, EmployeePatch, NewEmployee};
use crate::error::AppResult;
use crate::evaluation::{self, Decision, DetailsPatch, FormStep, StepUpdate};
use crate::reviews::ReviewFilter;
use crate::rubric::{Rating, ScoreCard, Scores};
use crate::web::extract::{Body, CurrentUser, TOKEN_COOKIE};

/// HTTP API server
pub struct WebServer {
    desk: Arc<ReviewDesk>,
    config: Arc<Config>,
}

#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<ReviewDesk>,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewReviewBody {
    employee_id: String,
    details: Option<DetailsPatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionBody {
    decision: Decision,
    #[serde(default)]
    hr_comments: String,
}

#[derive(Deserialize)]
struct FeedQuery {
    kind: Option<ActivityKind>,
    limit: Option<usize>,
}

impl WebServer {
    pub fn new(desk: Arc<ReviewDesk>, config: Arc<Config>) -> Self {
        Self { desk, config }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let app = router(self.desk.clone());

        let addr = format!("{}:{}", self.config.web.address, self.config.web.port);
        info!("🌐 API listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Full application router
pub fn router(desk: Arc<ReviewDesk>) -> Router {
    let web = desk.config.web.clone();
    let state = AppState { desk };

    let api = Router::new()
        .route("/api/auth/login", post(api_login))
        .route("/api/auth/logout", post(api_logout))
        .route("/api/auth/me", get(api_me))
        .route("/api/employees", get(api_list_employees).post(api_create_employee))
        .route(
            "/api/employees/:id",
            get(api_get_employee)
                .put(api_update_employee)
                .delete(api_delete_employee),
        )
        .route("/api/reviews", get(api_list_reviews).post(api_create_review))
        .route("/api/reviews/recent", get(api_recent_reviews))
        .route("/api/reviews/:id", get(api_get_review).delete(api_delete_review))
        .route("/api/reviews/:id/steps/:step", put(api_update_step))
        .route("/api/reviews/:id/submit", post(api_submit_review))
        .route("/api/reviews/:id/decision", post(api_decide_review))
        .route("/api/reviews/:id/report", get(api_report))
        .route("/api/score", post(api_score))
        .route("/api/rating-scale", get(api_rating_scale))
        .route("/api/dashboard", get(api_dashboard))
        .route("/api/activities", get(api_activities))
        .route("/api/notifications", get(api_notifications))
        .route("/api/notifications/read", post(api_mark_read))
        .route("/api/stats", get(api_stats))
        .with_state(state);

    let app = match web.static_dir.as_deref() {
        Some(dir) => {
            info!("Serving static files from {}", dir);
            api.fallback_service(ServeDir::new(dir))
        }
        None => api,
    };

    app.layer(cors_layer(&web))
}

fn cors_layer(web: &WebConfig) -> CorsLayer {
    if web.cors_origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = web
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        TOKEN_COOKIE, token, max_age_secs
    )
}

// ---- auth ----

async fn api_login(State(state): State<AppState>, Body(body): Body<LoginBody>) -> AppResult<Response> {
    let login = state.desk.login(&body.email, &body.password)?;
    let cookie = session_cookie(&login.token, state.desk.sessions.ttl().as_secs());
    Ok(([(header::SET_COOKIE, cookie)], Json(login)).into_response())
}

async fn api_logout(State(state): State<AppState>, current: CurrentUser) -> Response {
    state.desk.logout(&current.token);
    (
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(serde_json::json!({ "ok": true })),
    )
        .into_response()
}

async fn api_me(current: CurrentUser) -> Json<crate::auth::UserProfile> {
    Json(current.user.profile())
}

// ---- employees ----

async fn api_list_employees(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<EmployeeFilter>,
) -> AppResult<Json<serde_json::Value>> {
    let employees = state.desk.list_employees(&current.user, &filter)?;
    Ok(Json(serde_json::json!({
        "employees": employees,
        "total": employees.len(),
    })))
}

async fn api_create_employee(
    State(state): State<AppState>,
    current: CurrentUser,
    Body(input): Body<NewEmployee>,
) -> AppResult<Response> {
    let employee = state.desk.create_employee(&current.user, input)?;
    Ok((StatusCode::CREATED, Json(employee)).into_response())
}

async fn api_get_employee(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    Ok(Json(state.desk.get_employee(&current.user, &id)?).into_response())
}

async fn api_update_employee(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Body(patch): Body<EmployeePatch>,
) -> AppResult<Response> {
    Ok(Json(state.desk.update_employee(&current.user, &id, patch)?).into_response())
}

async fn api_delete_employee(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    Ok(Json(state.desk.delete_employee(&current.user, &id)?).into_response())
}

// ---- reviews ----

async fn api_list_reviews(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<ReviewFilter>,
) -> Json<serde_json::Value> {
    let reviews = state.desk.list_reviews(&current.user, &filter);
    Json(serde_json::json!({
        "reviews": reviews,
        "total": reviews.len(),
    }))
}

async fn api_recent_reviews(State(state): State<AppState>, current: CurrentUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "reviews": state.desk.recent_reviews(&current.user),
    }))
}

async fn api_create_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Body(body): Body<NewReviewBody>,
) -> AppResult<Response> {
    let review = state
        .desk
        .create_review(&current.user, &body.employee_id, body.details)?;
    Ok((StatusCode::CREATED, Json(review)).into_response())
}

async fn api_get_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    Ok(Json(state.desk.get_review(&current.user, &id)?).into_response())
}

async fn api_delete_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    Ok(Json(state.desk.delete_review(&current.user, &id)?).into_response())
}

async fn api_update_step(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((id, step)): Path<(String, FormStep)>,
    Body(update): Body<StepUpdate>,
) -> AppResult<Response> {
    Ok(Json(state.desk.update_step(&current.user, &id, step, update)?).into_response())
}

async fn api_submit_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    Ok(Json(state.desk.submit_review(&current.user, &id)?).into_response())
}

async fn api_decide_review(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Body(body): Body<DecisionBody>,
) -> AppResult<Response> {
    let review = state
        .desk
        .decide_review(&current.user, &id, body.decision, body.hr_comments)?;
    Ok(Json(review).into_response())
}

async fn api_report(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    Ok(Html(state.desk.report(&current.user, &id)?))
}

// ---- scoring ----

/// Score a set of answers without saving anything
async fn api_score(_current: CurrentUser, Body(scores): Body<Scores>) -> AppResult<Json<ScoreCard>> {
    evaluation::validate_scores(&scores)?;
    Ok(Json(ScoreCard::compute(&scores)))
}

async fn api_rating_scale() -> Json<serde_json::Value> {
    let scale: Vec<serde_json::Value> = Rating::ALL
        .iter()
        .map(|r| {
            serde_json::json!({
                "rating": r,
                "code": r.code(),
                "label": r.label(),
                "range": r.range(),
                "description": r.description(),
            })
        })
        .collect();
    Json(serde_json::json!({ "scale": scale }))
}

// ---- feed ----

async fn api_dashboard(State(state): State<AppState>, current: CurrentUser) -> Json<serde_json::Value> {
    Json(state.desk.dashboard(&current.user))
}

async fn api_activities(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<FeedQuery>,
) -> Json<serde_json::Value> {
    let entries = state.desk.activities(&current.user, params.kind, params.limit);
    Json(serde_json::json!({ "activities": entries }))
}

async fn api_notifications(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<FeedQuery>,
) -> Response {
    Json(state.desk.notifications(&current.user, params.limit)).into_response()
}

async fn api_mark_read(State(state): State<AppState>, current: CurrentUser) -> AppResult<Response> {
    Ok(Json(state.desk.mark_notifications_read(&current.user)?).into_response())
}

async fn api_stats(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(state.desk.get_stats(&current.user)?))
}
