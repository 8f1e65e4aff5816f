use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;

/// Runs a pipeline's extract, transform and load phases in order.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("🚀 Starting {} pipeline", self.pipeline.name());
        self.monitor.log_stats("start");

        tracing::info!("📥 Extracting...");
        let raw = self.pipeline.extract().await?;
        self.monitor.log_stats("extract");

        tracing::info!("🔄 Transforming...");
        let output = self.pipeline.transform(raw).await?;
        self.monitor.log_stats("transform");

        tracing::info!("💾 Loading...");
        let location = self.pipeline.load(output).await?;
        self.monitor.log_stats("load");

        tracing::info!(
            "{} finished in {:.1}s",
            self.pipeline.name(),
            started.elapsed().as_secs_f64()
        );
        self.monitor.log_final_stats();
        Ok(location)
    }
}
