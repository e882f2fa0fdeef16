// In-memory DashboardApi used by application tests
use crate::application::chart_controller::ChartContext;
use crate::application::dashboard_api::{ApiError, ApiResult, DashboardApi};
use crate::application::live_refresh::RefreshState;
use crate::application::pipeline_runner::{DEFAULT_ROW_LIMIT, PipelineRunner};
use crate::application::request_lifecycle::{DEFAULT_SOFT_TIMEOUT, FetchScope};
use crate::domain::series::SeriesGrouper;
use crate::domain::chart::Chart;
use crate::domain::dashboard::{Dashboard, LayoutEntry};
use crate::domain::pipeline::{Pipeline, PipelineResultRow, PipelineSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone)]
struct RunScript {
    delay: Duration,
    outcome: ApiResult<Vec<PipelineResultRow>>,
}

#[derive(Default)]
pub struct FakeDashboardApi {
    pipelines: Mutex<Vec<Pipeline>>,
    runs: Mutex<HashMap<String, RunScript>>,
    dashboards: Mutex<HashMap<String, Dashboard>>,
    run_calls: Mutex<Vec<String>>,
    completed_runs: AtomicUsize,
    patches: Mutex<Vec<(String, Vec<LayoutEntry>)>>,
    fail_patches: AtomicBool,
}

impl FakeDashboardApi {
    pub fn with_pipeline(self, id: &str, name: &str) -> Self {
        self.pipelines.lock().unwrap().push(Pipeline {
            id: id.to_string(),
            name: name.to_string(),
            database_name: "sensors".to_string(),
            collection: "readings".to_string(),
            stages: Vec::new(),
        });
        self
    }

    pub fn with_rows(self, pipeline_id: &str, rows: Vec<PipelineResultRow>) -> Self {
        self.with_delayed_rows(pipeline_id, rows, Duration::ZERO)
    }

    pub fn with_delayed_rows(
        self,
        pipeline_id: &str,
        rows: Vec<PipelineResultRow>,
        delay: Duration,
    ) -> Self {
        self.script(pipeline_id, delay, Ok(rows));
        self
    }

    pub fn with_run_failure(self, pipeline_id: &str, body: &str) -> Self {
        self.script(
            pipeline_id,
            Duration::ZERO,
            Err(ApiError::Status {
                status: 500,
                body: body.to_string(),
            }),
        );
        self
    }

    pub fn with_dashboard(self, dashboard: Dashboard) -> Self {
        self.dashboards
            .lock()
            .unwrap()
            .insert(dashboard.id.clone(), dashboard);
        self
    }

    pub fn failing_patches(self) -> Self {
        self.fail_patches.store(true, Ordering::SeqCst);
        self
    }

    /// Replace the scripted outcome of a pipeline after construction
    pub fn script(&self, pipeline_id: &str, delay: Duration, outcome: ApiResult<Vec<PipelineResultRow>>) {
        self.runs
            .lock()
            .unwrap()
            .insert(pipeline_id.to_string(), RunScript { delay, outcome });
    }

    pub fn run_calls(&self) -> Vec<String> {
        self.run_calls.lock().unwrap().clone()
    }

    pub fn completed_runs(&self) -> usize {
        self.completed_runs.load(Ordering::SeqCst)
    }

    pub fn patches(&self) -> Vec<(String, Vec<LayoutEntry>)> {
        self.patches.lock().unwrap().clone()
    }

    pub fn dashboard(&self, dashboard_id: &str) -> Option<Dashboard> {
        self.dashboards.lock().unwrap().get(dashboard_id).cloned()
    }
}

#[async_trait]
impl DashboardApi for FakeDashboardApi {
    async fn list_pipelines(&self) -> ApiResult<Vec<PipelineSummary>> {
        Ok(self.pipelines.lock().unwrap().iter().map(Pipeline::summary).collect())
    }

    async fn get_pipeline(&self, pipeline_id: &str) -> ApiResult<Pipeline> {
        self.pipelines
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == pipeline_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("pipeline {pipeline_id}")))
    }

    async fn run_pipeline(&self, pipeline_id: &str, limit: usize) -> ApiResult<Vec<PipelineResultRow>> {
        self.run_calls.lock().unwrap().push(pipeline_id.to_string());
        let script = self.runs.lock().unwrap().get(pipeline_id).cloned();
        let Some(script) = script else {
            return Err(ApiError::NotFound(format!("pipeline {pipeline_id}")));
        };

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        self.completed_runs.fetch_add(1, Ordering::SeqCst);
        script.outcome.map(|mut rows| {
            rows.truncate(limit);
            rows
        })
    }

    async fn get_chart(&self, dashboard_id: &str, chart_id: &str) -> ApiResult<Chart> {
        self.dashboards
            .lock()
            .unwrap()
            .get(dashboard_id)
            .and_then(|d| d.charts.iter().find(|c| c.id == chart_id).cloned())
            .ok_or_else(|| ApiError::NotFound(format!("chart {chart_id}")))
    }

    async fn edit_chart(&self, dashboard_id: &str, chart: &Chart) -> ApiResult<()> {
        let mut dashboards = self.dashboards.lock().unwrap();
        let dashboard = dashboards
            .get_mut(dashboard_id)
            .ok_or_else(|| ApiError::NotFound(format!("dashboard {dashboard_id}")))?;
        match dashboard.charts.iter_mut().find(|c| c.id == chart.id) {
            Some(existing) => *existing = chart.clone(),
            None => dashboard.charts.push(chart.clone()),
        }
        Ok(())
    }

    async fn delete_chart(&self, dashboard_id: &str, chart_id: &str) -> ApiResult<()> {
        let mut dashboards = self.dashboards.lock().unwrap();
        let dashboard = dashboards
            .get_mut(dashboard_id)
            .ok_or_else(|| ApiError::NotFound(format!("dashboard {dashboard_id}")))?;
        dashboard.charts.retain(|c| c.id != chart_id);
        dashboard.charts_layout.retain(|l| l.i != chart_id);
        Ok(())
    }

    async fn get_dashboard(&self, dashboard_id: &str) -> ApiResult<Dashboard> {
        self.dashboard(dashboard_id)
            .ok_or_else(|| ApiError::NotFound(format!("dashboard {dashboard_id}")))
    }

    async fn patch_layout(&self, dashboard_id: &str, layout: &[LayoutEntry]) -> ApiResult<()> {
        self.patches
            .lock()
            .unwrap()
            .push((dashboard_id.to_string(), layout.to_vec()));
        if self.fail_patches.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("connection reset".to_string()));
        }
        if let Some(dashboard) = self.dashboards.lock().unwrap().get_mut(dashboard_id) {
            dashboard.charts_layout = layout.to_vec();
        }
        Ok(())
    }
}

pub fn dashboard_with_charts(id: &str, pipelines: &[&str]) -> Dashboard {
    let charts: Vec<Chart> = pipelines
        .iter()
        .enumerate()
        .map(|(i, pipeline_id)| Chart::new(&format!("c{i}"), &format!("Chart {i}"), pipeline_id))
        .collect();
    let charts_layout = charts
        .iter()
        .enumerate()
        .map(|(i, c)| LayoutEntry::new(&c.id, (i as u32 % 2) * 6, (i as u32 / 2) * 4, 6, 4))
        .collect();

    Dashboard {
        id: id.to_string(),
        name: format!("Dashboard {id}"),
        charts,
        charts_layout,
    }
}

/// Controller context over `api` with a fresh view scope and no update feed
pub fn chart_context(api: Arc<FakeDashboardApi>) -> ChartContext {
    ChartContext {
        runner: PipelineRunner::new(api, DEFAULT_ROW_LIMIT),
        grouper: SeriesGrouper::default(),
        scope: FetchScope::new(DEFAULT_SOFT_TIMEOUT),
        refresh_state: Arc::new(watch::channel(RefreshState::default()).0),
        updates: None,
    }
}
