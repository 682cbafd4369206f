pub mod health;
pub mod reports;
pub mod sessions;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(sessions::index))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/{id}", get(sessions::show_session))
        .route("/sessions/{id}/scenario", post(sessions::select_scenario))
        .route("/sessions/{id}/back", post(sessions::go_back))
        .route("/sessions/{id}/submit", post(sessions::submit))
        .route("/sessions/{id}/reset", post(sessions::reset))
        .route("/sessions/{id}/report.md", get(reports::report_markdown))
        .route("/api/sessions/{id}", get(reports::session_status))
        .route("/api/sessions/{id}/report", get(reports::report_json))
        .route("/api/health", get(health::health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}
