pub mod errors;
pub mod extract;
pub mod handlers;
pub mod routes;

use crate::app::Services;
use crate::config::{AppConfig, ServerConfig};
use crate::core::Scheduler;
use crate::utils::error::Result;
use axum::Router;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// handler 共用狀態
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub scheduler: Scheduler,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(services: Services, scheduler: Scheduler, config: Arc<AppConfig>) -> Self {
        Self {
            services,
            scheduler,
            config,
        }
    }
}

pub fn router(state: AppState) -> Router {
    routes::routes().with_state(state)
}

/// 綁定監聽位址；`0.0.0.0` 沒有權限時退回 `127.0.0.1`
pub async fn bind(server: &ServerConfig) -> Result<TcpListener> {
    let addr = server.addr();
    match TcpListener::bind(&addr).await {
        Ok(listener) => Ok(listener),
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(server.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", server.port);
            tracing::warn!(
                "⚠️ Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            Ok(TcpListener::bind(&fallback_addr).await?)
        }
        Err(err) => Err(err.into()),
    }
}

/// 提供 HTTP 服務直到 `shutdown` 被取消
pub async fn serve(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> Result<()> {
    tracing::info!("🌐 Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    tracing::info!("👋 Server stopped");
    Ok(())
}
