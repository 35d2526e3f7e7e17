use crate::core::JobInfo;
use crate::server::errors::AppError;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

/// `GET /jobs`
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobInfo>> {
    Json(state.scheduler.jobs())
}

/// `POST /jobs/{name}/run`：背景執行，回 202
pub async fn run_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.scheduler.trigger(&name)?;
    tracing::info!("▶️ Job '{}' triggered via API", name);
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job": name, "status": "accepted" })),
    ))
}
