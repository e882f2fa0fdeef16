// Pipeline runner - Scoped pipeline execution
use crate::application::dashboard_api::DashboardApi;
use crate::application::errors::{FetchError, FetchResult};
use crate::application::request_lifecycle::FetchScope;
use crate::domain::pipeline::PipelineResultRow;
use std::sync::Arc;

pub const DEFAULT_ROW_LIMIT: usize = 5000;

#[derive(Clone)]
pub struct PipelineRunner {
    api: Arc<dyn DashboardApi>,
    row_limit: usize,
}

impl PipelineRunner {
    pub fn new(api: Arc<dyn DashboardApi>, row_limit: usize) -> Self {
        Self { api, row_limit }
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// Execute a pipeline under `scope`, capped at `limit` rows (the configured
    /// limit when `None`).
    ///
    /// A cancelled run resolves to [`FetchError::Cancelled`] and is only logged
    /// at debug level.
    pub async fn run(
        &self,
        pipeline_id: &str,
        limit: Option<usize>,
        scope: &FetchScope,
    ) -> FetchResult<Vec<PipelineResultRow>> {
        let limit = limit.unwrap_or(self.row_limit);
        tracing::debug!("Running pipeline {} (limit {})", pipeline_id, limit);

        let result = scope.run(self.api.run_pipeline(pipeline_id, limit)).await;
        match &result {
            Ok(rows) => {
                tracing::debug!("Pipeline {} returned {} rows", pipeline_id, rows.len());
            }
            Err(FetchError::Cancelled) => {
                tracing::debug!("Pipeline run {} cancelled", pipeline_id);
            }
            Err(e) => {
                tracing::warn!("Pipeline run {} failed: {}", pipeline_id, e);
            }
        }

        // Some backends ignore the requested cap.
        result.map(|mut rows| {
            rows.truncate(limit);
            rows
        })
    }
}
