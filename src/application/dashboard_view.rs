// Dashboard view - One mounted dashboard with its charts, scope and live timer
use crate::application::chart_controller::{
    ChartContext, ChartResultController, ChartState, RefreshTrigger,
};
use crate::application::dashboard_api::DashboardApi;
use crate::application::errors::{FetchError, FetchResult};
use crate::application::layout_store::{DEFAULT_GRID_COLUMNS, DashboardLayoutStore, DashboardSnapshot};
use crate::application::live_refresh::{DEFAULT_REFRESH_INTERVAL, LiveRefreshScheduler, RefreshState};
use crate::application::pipeline_runner::{DEFAULT_ROW_LIMIT, PipelineRunner};
use crate::application::request_lifecycle::{DEFAULT_SOFT_TIMEOUT, FetchScope, RequestLifecycleManager};
use crate::application::update_feed::UpdateFeed;
use crate::domain::dashboard::{Dashboard, LayoutEntry};
use crate::domain::series::{MissingValuePolicy, SeriesGrouper};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub refresh_interval: Duration,
    pub row_limit: usize,
    pub soft_timeout: Duration,
    pub grid_columns: u32,
    pub missing_values: MissingValuePolicy,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            row_limit: DEFAULT_ROW_LIMIT,
            soft_timeout: DEFAULT_SOFT_TIMEOUT,
            grid_columns: DEFAULT_GRID_COLUMNS,
            missing_values: MissingValuePolicy::default(),
        }
    }
}

/// Control messages for a mounted view. Each carries the channel its answer
/// goes back on.
#[derive(Debug)]
pub enum ViewCommand {
    /// `None` flips the current mode
    SetLive {
        live: Option<bool>,
        reply: oneshot::Sender<RefreshState>,
    },
    /// Answered with the number of charts being reloaded
    RefreshNow { reply: oneshot::Sender<usize> },
    UpdateLayout {
        layout: Vec<LayoutEntry>,
        reply: oneshot::Sender<FetchResult<()>>,
    },
    SwitchDashboard {
        dashboard_id: String,
        reply: oneshot::Sender<FetchResult<DashboardSnapshot>>,
    },
}

/// A mounted dashboard.
///
/// The view owns its fetch scope and its live timer; nothing else can reach
/// them. Dropping the view cancels every pending call and stops the timer.
pub struct DashboardView {
    api: Arc<dyn DashboardApi>,
    config: ViewConfig,
    lifecycle: RequestLifecycleManager,
    store: DashboardLayoutStore,
    snapshot: watch::Sender<DashboardSnapshot>,
    charts: Arc<[Arc<ChartResultController>]>,
    scheduler: LiveRefreshScheduler,
    refresh_state: Arc<watch::Sender<RefreshState>>,
    updates: Arc<UpdateFeed>,
}

impl DashboardView {
    /// Load the dashboard and start fetching every chart in the background.
    pub async fn mount(
        api: Arc<dyn DashboardApi>,
        dashboard_id: &str,
        config: ViewConfig,
    ) -> FetchResult<Self> {
        let mut lifecycle = RequestLifecycleManager::new(config.soft_timeout);
        let scope = lifecycle.mount();
        let store = DashboardLayoutStore::new(api.clone(), config.grid_columns);
        let snapshot = store.load(dashboard_id, &scope).await?;

        let refresh_state = Arc::new(watch::channel(RefreshState::default()).0);
        let updates = Arc::new(UpdateFeed::new());
        let charts = build_controllers(&api, &config, &snapshot.dashboard, &scope, &refresh_state, &updates);
        let scheduler = LiveRefreshScheduler::new(
            config.refresh_interval,
            charts.clone(),
            scope,
            refresh_state.clone(),
        );

        tracing::info!(
            "Mounted dashboard {} with {} charts",
            snapshot.dashboard.id,
            charts.len()
        );

        let view = Self {
            api,
            config,
            lifecycle,
            store,
            snapshot: watch::channel(snapshot).0,
            charts,
            scheduler,
            refresh_state,
            updates,
        };
        view.spawn_loads(RefreshTrigger::Mount);
        Ok(view)
    }

    /// Show another dashboard in this view.
    ///
    /// The new dashboard is loaded first. Only once it is there is the current
    /// one torn down: its pending fetches are cancelled and the live timer is
    /// stopped. If loading fails the view keeps showing the current dashboard.
    pub async fn switch_dashboard(&mut self, dashboard_id: &str) -> FetchResult<()> {
        let scope = self.lifecycle.prepare();
        let store = DashboardLayoutStore::new(self.api.clone(), self.config.grid_columns);
        let snapshot = match store.load(dashboard_id, &scope).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::warn!("Cannot switch view to dashboard {}: {}", dashboard_id, e);
                }
                return Err(e);
            }
        };

        self.scheduler.stop();
        self.lifecycle.adopt(scope.clone());
        self.updates.clear();
        self.refresh_state.send_replace(RefreshState::default());
        self.charts = build_controllers(
            &self.api,
            &self.config,
            &snapshot.dashboard,
            &scope,
            &self.refresh_state,
            &self.updates,
        );
        self.scheduler = LiveRefreshScheduler::new(
            self.config.refresh_interval,
            self.charts.clone(),
            scope,
            self.refresh_state.clone(),
        );
        self.store = store;
        self.snapshot.send_replace(snapshot);

        tracing::info!("Switched view to dashboard {}", dashboard_id);
        self.spawn_loads(RefreshTrigger::Mount);
        Ok(())
    }

    pub fn dashboard(&self) -> Dashboard {
        self.snapshot.borrow().dashboard.clone()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Notified whenever the dashboard or its layout changes
    pub fn subscribe_snapshot(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn charts(&self) -> &[Arc<ChartResultController>] {
        &self.charts
    }

    pub fn chart_states(&self) -> Vec<(String, ChartState)> {
        self.charts
            .iter()
            .map(|c| (c.chart_id().to_string(), c.state()))
            .collect()
    }

    /// Latest unread state of every chart that changed
    pub fn updates(&self) -> Arc<UpdateFeed> {
        self.updates.clone()
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.refresh_state.borrow().clone()
    }

    pub fn subscribe_refresh(&self) -> watch::Receiver<RefreshState> {
        self.refresh_state.subscribe()
    }

    pub fn is_live(&self) -> bool {
        self.scheduler.is_live()
    }

    pub fn set_live(&mut self, live: bool) {
        self.scheduler.set_live(live);
    }

    pub fn toggle_live(&mut self) -> bool {
        self.scheduler.toggle()
    }

    /// Reload every chart now. The loads run in the background and report
    /// through the update feed.
    pub fn refresh_now(&self) {
        tracing::info!("Manual refresh of {} charts", self.charts.len());
        self.spawn_loads(RefreshTrigger::ManualRefresh);
    }

    pub async fn layout(&self) -> Vec<LayoutEntry> {
        self.store.layout().await
    }

    /// Apply a dragged/resized layout. See [`DashboardLayoutStore::update_layout`]
    /// for the no-rollback policy on persistence failures.
    pub async fn update_layout(&self, new_layout: Vec<LayoutEntry>) -> FetchResult<()> {
        let scope = self.scope();
        let dashboard_id = self.snapshot.borrow().dashboard.id.clone();
        let result = self.store.update_layout(&dashboard_id, new_layout, &scope).await;

        if matches!(result, Ok(()) | Err(FetchError::LayoutPersistFailed(_))) {
            let layout = self.store.layout().await;
            self.snapshot
                .send_modify(|snapshot| snapshot.dashboard.charts_layout = layout);
        }
        result
    }

    /// Execute one control command against this view.
    pub async fn apply(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::SetLive { live, reply } => {
                match live {
                    Some(live) => self.set_live(live),
                    None => {
                        self.toggle_live();
                    }
                }
                let _ = reply.send(self.refresh_state());
            }
            ViewCommand::RefreshNow { reply } => {
                self.refresh_now();
                let _ = reply.send(self.charts.len());
            }
            ViewCommand::UpdateLayout { layout, reply } => {
                let _ = reply.send(self.update_layout(layout).await);
            }
            ViewCommand::SwitchDashboard { dashboard_id, reply } => {
                let result = self.switch_dashboard(&dashboard_id).await.map(|()| self.snapshot());
                let _ = reply.send(result);
            }
        }
    }

    /// Run commands until every sender is gone, then unmount the view.
    pub async fn serve(mut self, mut commands: mpsc::Receiver<ViewCommand>) {
        while let Some(command) = commands.recv().await {
            self.apply(command).await;
        }
    }

    fn scope(&self) -> FetchScope {
        match self.lifecycle.scope() {
            Some(scope) => scope.clone(),
            None => {
                // Only reachable after teardown; calls fail as cancelled.
                let scope = FetchScope::new(self.config.soft_timeout);
                scope.cancel();
                scope
            }
        }
    }

    fn spawn_loads(&self, trigger: RefreshTrigger) {
        for controller in self.charts.iter() {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.load(trigger).await;
            });
        }
    }
}

impl Drop for DashboardView {
    fn drop(&mut self) {
        self.scheduler.stop();
        self.lifecycle.teardown();
        tracing::info!("Unmounted dashboard {}", self.snapshot.borrow().dashboard.id);
    }
}

fn build_controllers(
    api: &Arc<dyn DashboardApi>,
    config: &ViewConfig,
    dashboard: &Dashboard,
    scope: &FetchScope,
    refresh_state: &Arc<watch::Sender<RefreshState>>,
    updates: &Arc<UpdateFeed>,
) -> Arc<[Arc<ChartResultController>]> {
    let ctx = ChartContext {
        runner: PipelineRunner::new(api.clone(), config.row_limit),
        grouper: SeriesGrouper::new(config.missing_values),
        scope: scope.clone(),
        refresh_state: refresh_state.clone(),
        updates: Some(updates.clone()),
    };

    dashboard
        .charts
        .iter()
        .map(|chart| Arc::new(ChartResultController::new(chart, ctx.clone())))
        .collect()
}
