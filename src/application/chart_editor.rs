// Chart editor - Editing session for one chart with a live preview
use crate::application::catalog_service::CatalogService;
use crate::application::chart_controller::{ChartContext, ChartResultController, ChartState, RefreshTrigger};
use crate::application::dashboard_view::ViewConfig;
use crate::application::errors::{FetchError, FetchResult};
use crate::application::live_refresh::RefreshState;
use crate::application::pipeline_runner::PipelineRunner;
use crate::application::request_lifecycle::{FetchScope, RequestLifecycleManager};
use crate::domain::chart::{Axis, Chart, ChartKind};
use crate::domain::pipeline::{Pipeline, PipelineSummary};
use crate::domain::series::SeriesGrouper;
use std::sync::Arc;
use tokio::sync::watch;

pub struct ChartEditor {
    catalog: CatalogService,
    dashboard_id: String,
    chart: Chart,
    pipelines: Vec<PipelineSummary>,
    pipeline: Option<Pipeline>,
    preview: Arc<ChartResultController>,
    lifecycle: RequestLifecycleManager,
}

impl ChartEditor {
    /// Load the chart, the pipeline catalog and the selected pipeline, then run
    /// the preview once.
    ///
    /// Only a missing chart fails the session; catalog or pipeline detail
    /// errors are logged and leave those parts empty.
    pub async fn open(
        catalog: CatalogService,
        dashboard_id: &str,
        chart_id: &str,
        config: &ViewConfig,
    ) -> FetchResult<Self> {
        let mut lifecycle = RequestLifecycleManager::new(config.soft_timeout);
        let scope = lifecycle.mount();

        let chart = catalog.chart(dashboard_id, chart_id, &scope).await?;
        let pipelines = match catalog.list_pipelines(&scope).await {
            Ok(pipelines) => pipelines,
            Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
            Err(e) => {
                tracing::warn!("Error listing pipelines: {}", e);
                Vec::new()
            }
        };
        let pipeline = fetch_detail(&catalog, &chart.pipeline_id, &scope).await?;

        let ctx = ChartContext {
            runner: PipelineRunner::new(catalog.api(), config.row_limit),
            grouper: SeriesGrouper::new(config.missing_values),
            scope,
            refresh_state: Arc::new(watch::channel(RefreshState::default()).0),
            updates: None,
        };
        let preview = Arc::new(ChartResultController::new(&chart, ctx));
        preview.load(RefreshTrigger::Mount).await;

        Ok(Self {
            catalog,
            dashboard_id: dashboard_id.to_string(),
            chart,
            pipelines,
            pipeline,
            preview,
            lifecycle,
        })
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn pipelines(&self) -> &[PipelineSummary] {
        &self.pipelines
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.pipeline.as_ref()
    }

    pub fn preview(&self) -> ChartState {
        self.preview.state()
    }

    /// Switch the chart to another pipeline and re-run the preview.
    ///
    /// A preview still running for the previous selection is cancelled and its
    /// result discarded.
    pub async fn select_pipeline(&mut self, pipeline_id: &str) -> FetchResult<ChartState> {
        let scope = self.scope()?;
        self.chart.pipeline_id = pipeline_id.to_string();
        self.pipeline = fetch_detail(&self.catalog, pipeline_id, &scope).await?;

        Ok(self
            .preview
            .select_pipeline(pipeline_id)
            .await
            .unwrap_or_else(|| self.preview.state()))
    }

    /// Persist the chart under `name` as a time-series line chart.
    pub async fn save(&mut self, name: &str) -> FetchResult<&Chart> {
        let scope = self.scope()?;
        self.chart.name = name.to_string();
        self.chart.kind = ChartKind::TimeseriesLine;
        self.chart.x_axis = Axis::new("X-axis", "x");
        self.chart.y_axis = Axis::new("Y-axis", "y");

        self.catalog.save_chart(&self.dashboard_id, &self.chart, &scope).await?;
        Ok(&self.chart)
    }

    fn scope(&self) -> FetchResult<FetchScope> {
        self.lifecycle.scope().cloned().ok_or(FetchError::Cancelled)
    }
}

async fn fetch_detail(
    catalog: &CatalogService,
    pipeline_id: &str,
    scope: &FetchScope,
) -> FetchResult<Option<Pipeline>> {
    match catalog.pipeline(pipeline_id, scope).await {
        Ok(pipeline) => Ok(Some(pipeline)),
        Err(FetchError::Cancelled) => Err(FetchError::Cancelled),
        Err(e) => {
            tracing::warn!("Error retrieving pipeline details for {}: {}", pipeline_id, e);
            Ok(None)
        }
    }
}
