use crate::core::Pipeline;
use crate::domain::model::RunReport;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub output_path: String,
    pub report: RunReport,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let name = self.pipeline.name().to_string();
        tracing::info!("Starting {} pipeline", name);

        // Extract
        tracing::info!("Extracting {} input...", name);
        let batch = self.pipeline.extract().await?;

        // Transform
        tracing::info!("Fetching and parsing records...");
        let transformed = self.pipeline.transform(batch).await?;
        let report = transformed.report.clone();
        tracing::info!(
            "Finished getting and saving data! {} rows ({} attempted, {} fetch errors, {} parse errors, {} timeouts)",
            transformed.table.len(),
            report.attempted,
            report.fetch_failures,
            report.parse_failures,
            report.timeouts
        );

        // Load
        tracing::info!("Loading data...");
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(RunOutcome {
            output_path,
            report,
        })
    }
}
