// Collaborator trait for the pipeline/dashboard storage API
use crate::domain::chart::Chart;
use crate::domain::dashboard::{Dashboard, LayoutEntry};
use crate::domain::pipeline::{Pipeline, PipelineResultRow, PipelineSummary};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("backend responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Storage and execution backend. Calls are not cancellable by themselves;
/// callers bind them to a `FetchScope`, which drops the future on cancellation.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn list_pipelines(&self) -> ApiResult<Vec<PipelineSummary>>;

    async fn get_pipeline(&self, pipeline_id: &str) -> ApiResult<Pipeline>;

    /// Execute a pipeline, asking for at most `limit` rows
    async fn run_pipeline(&self, pipeline_id: &str, limit: usize) -> ApiResult<Vec<PipelineResultRow>>;

    async fn get_chart(&self, dashboard_id: &str, chart_id: &str) -> ApiResult<Chart>;

    async fn edit_chart(&self, dashboard_id: &str, chart: &Chart) -> ApiResult<()>;

    async fn delete_chart(&self, dashboard_id: &str, chart_id: &str) -> ApiResult<()>;

    async fn get_dashboard(&self, dashboard_id: &str) -> ApiResult<Dashboard>;

    async fn patch_layout(&self, dashboard_id: &str, layout: &[LayoutEntry]) -> ApiResult<()>;
}
