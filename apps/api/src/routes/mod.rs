pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ats::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ranking API
        .route(
            "/api/v1/jobs/:job_id/ranking",
            get(handlers::handle_rank_job).post(handlers::handle_rank_job),
        )
        .route("/api/v1/ats/preview", post(handlers::handle_preview))
        // Taxonomy API
        .route("/api/v1/taxonomy", get(handlers::handle_list_taxonomy))
        .route(
            "/api/v1/taxonomy/refresh",
            post(handlers::handle_taxonomy_refresh),
        )
        .with_state(state)
}
