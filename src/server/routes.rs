use crate::server::handlers::{analysis, health, jobs};
use crate::server::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analyze-8k", post(analysis::analyze_8k))
        .route("/crawl-news", post(analysis::crawl_news))
        .route("/health", get(health::health))
        .route("/readyz", get(health::readyz))
        .route("/cost-info", get(health::cost_info))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{name}/run", post(jobs::run_job))
}
