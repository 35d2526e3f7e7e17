//! Health, readiness 與費用資訊。
//!
//! - GET /health    -> liveness，不做任何 I/O
//! - GET /readyz    -> 檢查資料庫連線
//! - GET /cost-info -> 目前使用的模型與單價

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Serialize)]
struct ReadinessResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct CostInfo {
    model: String,
    input_cost_per_1k_tokens: String,
    output_cost_per_1k_tokens: String,
    estimated_cost_per_request: &'static str,
    max_cost_per_request_usd: f64,
    optimization: &'static str,
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        message: "SEC 8-K 분석기가 정상 작동 중입니다.",
    })
}

/// `GET /readyz`：資料庫可用回 200，否則 503
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.services.repository.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("⚠️ Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unavailable",
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// `GET /cost-info`
pub async fn cost_info(State(state): State<AppState>) -> impl IntoResponse {
    let settings = state.services.analyzer.settings();
    Json(CostInfo {
        model: settings.model.clone(),
        input_cost_per_1k_tokens: format!("${:.5}", settings.input_cost_per_1k),
        output_cost_per_1k_tokens: format!("${:.5}", settings.output_cost_per_1k),
        estimated_cost_per_request: "$0.005-0.015",
        max_cost_per_request_usd: settings.max_cost_usd,
        optimization: "청크 크기 최적화, 중요 섹션만 추출, 문서당 최대 3개 청크",
    })
}
