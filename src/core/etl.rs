use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: String,
    pub extracted: usize,
    pub processed: usize,
    pub unassessed: usize,
    pub rejected: usize,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("Starting normalization run");

        // Extract
        let raw_data = self.pipeline.extract().await?;
        let extracted = raw_data.len();
        tracing::info!("Extracted {} records", extracted);

        // Transform
        let transformed = self.pipeline.transform(raw_data).await?;
        let processed = transformed.processed_records.len();
        let unassessed = transformed.unassessed_records.len();
        let rejected = transformed.rejected_records.len();
        tracing::info!(
            "Normalized {} records ({} without risk assessment, {} rejected)",
            processed,
            unassessed,
            rejected
        );

        // Load
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!(
            "Output saved to: {} ({} ms)",
            output_path,
            started.elapsed().as_millis()
        );

        Ok(RunSummary {
            output_path,
            extracted,
            processed,
            unassessed,
            rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Record, TransformResult};
    use async_trait::async_trait;

    struct FixedPipeline;

    #[async_trait]
    impl Pipeline for FixedPipeline {
        async fn extract(&self) -> Result<Vec<Record>> {
            Ok(vec![Record::default(), Record::default(), Record::default()])
        }

        async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
            let mut result = TransformResult::default();
            let mut data = data.into_iter();
            result.rejected_records.extend(data.next());
            for record in data {
                result.unassessed_records.push(record.clone());
                result.processed_records.push(record);
            }
            Ok(result)
        }

        async fn load(&self, _result: TransformResult) -> Result<String> {
            Ok("memory".to_string())
        }
    }

    #[test]
    fn test_run_reports_counts() {
        let engine = EtlEngine::new(FixedPipeline);
        let summary = tokio_test::block_on(engine.run()).unwrap();

        assert_eq!(
            summary,
            RunSummary {
                output_path: "memory".to_string(),
                extracted: 3,
                processed: 2,
                unassessed: 2,
                rejected: 1,
            }
        );
    }
}
