//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the shared wall record to every editor and render
//! client, plus read-only panel geometry and a health probe. CORS allows any
//! origin. Records carry inlined images, so the body limit is raised well
//! past axum's 2 MB default and set from configuration.

pub mod groups;
pub mod wall_state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            walls::WALL_STATE_PATH,
            get(wall_state::get_wall_state).post(wall_state::post_wall_state),
        )
        .route("/api/groups/{group}", get(groups::get_group))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
