// Catalog service - Scoped access to pipelines and chart definitions
use crate::application::dashboard_api::DashboardApi;
use crate::application::errors::FetchResult;
use crate::application::request_lifecycle::FetchScope;
use crate::domain::chart::Chart;
use crate::domain::pipeline::{Pipeline, PipelineSummary};
use std::sync::Arc;

#[derive(Clone)]
pub struct CatalogService {
    api: Arc<dyn DashboardApi>,
}

impl CatalogService {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> Arc<dyn DashboardApi> {
        self.api.clone()
    }

    pub async fn list_pipelines(&self, scope: &FetchScope) -> FetchResult<Vec<PipelineSummary>> {
        scope.run(self.api.list_pipelines()).await
    }

    pub async fn pipeline(&self, pipeline_id: &str, scope: &FetchScope) -> FetchResult<Pipeline> {
        scope.run(self.api.get_pipeline(pipeline_id)).await
    }

    pub async fn chart(&self, dashboard_id: &str, chart_id: &str, scope: &FetchScope) -> FetchResult<Chart> {
        scope.run(self.api.get_chart(dashboard_id, chart_id)).await
    }

    pub async fn save_chart(&self, dashboard_id: &str, chart: &Chart, scope: &FetchScope) -> FetchResult<()> {
        scope.run(self.api.edit_chart(dashboard_id, chart)).await?;
        tracing::info!("Saved chart {} on dashboard {}", chart.id, dashboard_id);
        Ok(())
    }

    pub async fn delete_chart(&self, dashboard_id: &str, chart_id: &str, scope: &FetchScope) -> FetchResult<()> {
        scope.run(self.api.delete_chart(dashboard_id, chart_id)).await?;
        tracing::info!("Deleted chart {} from dashboard {}", chart_id, dashboard_id);
        Ok(())
    }
}
