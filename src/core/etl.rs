use crate::core::Pipeline;
use crate::domain::model::LoadReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    name: String,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(name: impl Into<String>, pipeline: P) -> Self {
        Self::new_with_monitoring(name, pipeline, false)
    }

    pub fn new_with_monitoring(name: impl Into<String>, pipeline: P, monitor: bool) -> Self {
        Self {
            pipeline,
            name: name.into(),
            monitor: SystemMonitor::new(monitor),
        }
    }

    pub async fn run(&self) -> Result<LoadReport> {
        tracing::info!("🚀 Kicking off {} ETL...", self.name);

        // Extract
        tracing::info!("[1/3] {}: extracting", self.name);
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("[1/3] {}: extracted {} records", self.name, raw_data.len());
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("[2/3] {}: transforming", self.name);
        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "[2/3] {}: {} rows, {} columns",
            self.name,
            transformed.table.len(),
            transformed.table.columns.len()
        );
        if transformed.coercion_failures > 0 {
            tracing::info!(
                "[2/3] {}: {} values could not be cast and were stored as null",
                self.name,
                transformed.coercion_failures
            );
        }
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!(
            "[3/3] 💫 Loading {} records into {}...",
            transformed.table.len(),
            self.name
        );
        let report = self.pipeline.load(transformed).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        tracing::info!(
            "🌈 {} rows have been loaded into {}",
            report.rows_written,
            report.target
        );
        Ok(report)
    }
}
