// HTTP implementation of the dashboard storage API
use crate::application::dashboard_api::{ApiError, ApiResult, DashboardApi};
use crate::domain::chart::Chart;
use crate::domain::dashboard::{Dashboard, LayoutEntry};
use crate::domain::pipeline::{Pipeline, PipelineResultRow, PipelineSummary};
use crate::infrastructure::config::endpoint_url;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct LayoutPatch<'a> {
    dashboard_id: &'a str,
    charts_layout: &'a [LayoutEntry],
}

impl HttpDashboardApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str, params: &[(&'static str, &str)]) -> String {
        let params: BTreeMap<&str, String> = params.iter().map(|(k, v)| (*k, v.to_string())).collect();
        endpoint_url(&self.base_url, path, &params)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: String) -> ApiResult<reqwest::Response> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(what));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String, what: String) -> ApiResult<T> {
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(&url), what).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn list_pipelines(&self) -> ApiResult<Vec<PipelineSummary>> {
        let url = self.url("/api/pipelines/view_all", &[]);
        self.get_json(url, "pipeline list".to_string()).await
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> ApiResult<Pipeline> {
        let url = self.url("/api/pipelines/view", &[("pipeline_id", pipeline_id)]);
        self.get_json(url, format!("pipeline {pipeline_id}")).await
    }

    async fn run_pipeline(&self, pipeline_id: &str, limit: usize) -> ApiResult<Vec<PipelineResultRow>> {
        let limit = limit.to_string();
        let url = self.url(
            "/api/pipelines/run",
            &[("pipeline_id", pipeline_id), ("limit", &limit)],
        );
        self.get_json(url, format!("pipeline {pipeline_id}")).await
    }

    async fn get_chart(&self, dashboard_id: &str, chart_id: &str) -> ApiResult<Chart> {
        let url = self.url(
            "/api/dashboards/charts/view",
            &[("chart_id", chart_id), ("dashboard_id", dashboard_id)],
        );
        self.get_json(url, format!("chart {chart_id}")).await
    }

    async fn edit_chart(&self, dashboard_id: &str, chart: &Chart) -> ApiResult<()> {
        let url = self.url("/api/dashboards/charts/edit", &[("dashboard_id", dashboard_id)]);
        self.send(self.client.post(&url).json(chart), format!("dashboard {dashboard_id}"))
            .await?;
        Ok(())
    }

    async fn delete_chart(&self, dashboard_id: &str, chart_id: &str) -> ApiResult<()> {
        let url = self.url(
            "/api/dashboards/charts/delete",
            &[("chart_id", chart_id), ("dashboard_id", dashboard_id)],
        );
        self.send(self.client.delete(&url), format!("chart {chart_id}")).await?;
        Ok(())
    }

    async fn get_dashboard(&self, dashboard_id: &str) -> ApiResult<Dashboard> {
        let url = self.url("/api/dashboards/view", &[("dashboard_id", dashboard_id)]);
        self.get_json(url, format!("dashboard {dashboard_id}")).await
    }

    async fn patch_layout(&self, dashboard_id: &str, layout: &[LayoutEntry]) -> ApiResult<()> {
        let url = self.url("/api/dashboards/edit_chart_layout", &[]);
        let body = LayoutPatch {
            dashboard_id,
            charts_layout: layout,
        };
        self.send(self.client.patch(&url).json(&body), format!("dashboard {dashboard_id}"))
            .await?;
        Ok(())
    }
}
