pub mod health;

use axum::{routing::get, routing::post, Router};

use crate::ai::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/ai/generate-resume",
            post(handlers::handle_generate_resume),
        )
        .route("/api/ai/ats-check", post(handlers::handle_ats_check))
        .with_state(state)
}
