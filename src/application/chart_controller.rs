// Chart result controller - Per-chart fetch state machine
use crate::application::errors::FetchError;
use crate::application::live_refresh::RefreshState;
use crate::application::pipeline_runner::PipelineRunner;
use crate::application::request_lifecycle::FetchScope;
use crate::application::update_feed::UpdateFeed;
use crate::domain::chart::Chart;
use crate::domain::series::{Series, SeriesGrouper};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ChartState {
    Idle,
    Loading,
    Ready(Vec<Series>),
    /// The pipeline ran but produced no series; rendered as "no data"
    Empty,
    /// User-facing reason
    Failed(String),
}

/// What caused a chart to (re)load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Mount,
    SelectionChange,
    LiveTick,
    ManualRefresh,
}

impl RefreshTrigger {
    /// Whether a successful load counts as a fresh update of the view
    pub fn marks_fresh(self) -> bool {
        matches!(self, RefreshTrigger::LiveTick | RefreshTrigger::ManualRefresh)
    }
}

/// State transition event, fed to whoever renders the view
#[derive(Debug, Clone, Serialize)]
pub struct ChartUpdate {
    pub chart_id: String,
    pub state: ChartState,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Everything a controller shares with the view that owns it
#[derive(Clone)]
pub struct ChartContext {
    pub runner: PipelineRunner,
    pub grouper: SeriesGrouper,
    pub scope: FetchScope,
    pub refresh_state: Arc<watch::Sender<RefreshState>>,
    pub updates: Option<Arc<UpdateFeed>>,
}

struct InFlight {
    pipeline_id: String,
    scope: Option<FetchScope>,
}

/// Drives one chart through `Idle -> Loading -> Ready | Empty | Failed`.
///
/// At most one fetch is active per chart: starting a load cancels the previous
/// one, and a cancelled load never publishes its result.
pub struct ChartResultController {
    chart_id: String,
    ctx: ChartContext,
    in_flight: Mutex<InFlight>,
    state: watch::Sender<ChartState>,
}

impl ChartResultController {
    pub fn new(chart: &Chart, ctx: ChartContext) -> Self {
        let (state, _) = watch::channel(ChartState::Idle);
        Self {
            chart_id: chart.id.clone(),
            ctx,
            in_flight: Mutex::new(InFlight {
                pipeline_id: chart.pipeline_id.clone(),
                scope: None,
            }),
            state,
        }
    }

    pub fn chart_id(&self) -> &str {
        &self.chart_id
    }

    pub fn state(&self) -> ChartState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChartState> {
        self.state.subscribe()
    }

    pub async fn pipeline_id(&self) -> String {
        self.in_flight.lock().await.pipeline_id.clone()
    }

    /// Point the chart at another pipeline and reload it.
    pub async fn select_pipeline(&self, pipeline_id: &str) -> Option<ChartState> {
        self.in_flight.lock().await.pipeline_id = pipeline_id.to_string();
        self.load(RefreshTrigger::SelectionChange).await
    }

    /// Fetch and group the chart's pipeline result.
    ///
    /// Returns the state this load settled on, or `None` when it was superseded
    /// by a newer load or cancelled with the view.
    pub async fn load(&self, trigger: RefreshTrigger) -> Option<ChartState> {
        let (scope, pipeline_id) = {
            let mut in_flight = self.in_flight.lock().await;
            if self.ctx.scope.is_cancelled() {
                return None;
            }
            if let Some(previous) = in_flight.scope.take() {
                tracing::debug!("Chart {} superseding in-flight fetch", self.chart_id);
                previous.cancel();
            }
            let scope = self.ctx.scope.child();
            in_flight.scope = Some(scope.clone());
            self.publish(ChartState::Loading);
            (scope, in_flight.pipeline_id.clone())
        };

        let result = self.ctx.runner.run(&pipeline_id, None, &scope).await;

        let mut in_flight = self.in_flight.lock().await;
        if scope.is_cancelled() {
            return None;
        }
        in_flight.scope = None;

        let next = match result {
            Ok(rows) => {
                let series = self.ctx.grouper.group(&rows);
                if series.is_empty() {
                    ChartState::Empty
                } else {
                    ChartState::Ready(series)
                }
            }
            Err(FetchError::Cancelled) => return None,
            Err(e) => {
                tracing::warn!("Chart {} failed to load: {}", self.chart_id, e);
                ChartState::Failed(e.to_string())
            }
        };

        if trigger.marks_fresh() && !matches!(next, ChartState::Failed(_)) {
            self.ctx
                .refresh_state
                .send_modify(|s| s.last_updated = Some(Utc::now()));
        }
        self.publish(next.clone());
        Some(next)
    }

    /// Cancel the chart's in-flight fetch, if any.
    pub async fn cancel(&self) {
        if let Some(scope) = self.in_flight.lock().await.scope.take() {
            scope.cancel();
        }
    }

    fn publish(&self, next: ChartState) {
        self.state.send_replace(next.clone());
        if let Some(updates) = &self.ctx.updates {
            updates.push(ChartUpdate {
                chart_id: self.chart_id.clone(),
                state: next,
                last_updated: self.ctx.refresh_state.borrow().last_updated,
            });
        }
    }
}
