use crate::core::{LoadReport, Pipeline, StageData};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// 排程器與 HTTP 觸發用的可執行工作
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<LoadReport>;
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: Arc<SystemMonitor>,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::with_monitor(pipeline, Arc::new(SystemMonitor::new(false)))
    }

    pub fn with_monitor(pipeline: P, monitor: Arc<SystemMonitor>) -> Self {
        Self { pipeline, monitor }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<LoadReport> {
        let name = self.pipeline.name();
        let started = Instant::now();
        tracing::info!("🚀 Starting job '{}'", name);

        // Extract
        tracing::debug!("[{}] Extracting data...", name);
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("📥 [{}] Extracted {} records", name, raw_data.record_count());
        self.monitor.log_stats(name, "extract");

        // Transform
        tracing::debug!("[{}] Transforming data...", name);
        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!("🔄 [{}] Transformed {} records", name, transformed.record_count());
        self.monitor.log_stats(name, "transform");

        // Load
        tracing::debug!("[{}] Loading data...", name);
        let report = self.pipeline.load(transformed).await?;
        self.monitor.log_stats(name, "load");

        tracing::info!(
            "✅ Job '{}' finished in {:?}: stored {}, skipped {}, failed {}",
            name,
            started.elapsed(),
            report.stored,
            report.skipped,
            report.failed
        );
        Ok(report)
    }
}

#[async_trait]
impl<P: Pipeline> Job for EtlEngine<P> {
    fn name(&self) -> &'static str {
        self.pipeline.name()
    }

    async fn run(&self) -> Result<LoadReport> {
        EtlEngine::run(self).await
    }
}
