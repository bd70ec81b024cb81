//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the three role endpoints and the liveness route, and
//! serves the client pages as static files from the configured directory.
//! Static serving is a thin collaborator — the protocol lives entirely in
//! the websocket routes.

pub mod ws;

use std::path::Path;

use axum::Router;
use axum::handler::HandlerWithoutStateExt;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::state::AppState;

#[must_use]
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/host", get(ws::host_ws))
        .route("/user", get(ws::user_ws))
        .route("/board", get(ws::board_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
        .fallback_service(static_files)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404: File Not Found!")
}
