pub mod handlers;
pub mod requests;
pub mod responses;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingestion/start", post(handlers::start_ingestion))
        .route("/ingestion/refresh", post(handlers::refresh_ingestion))
        .route("/ingestion/status", get(handlers::ingestion_status))
        .route("/coverage", get(handlers::coverage))
}
