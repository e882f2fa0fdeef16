// Live refresh scheduler - Interval-driven chart reloads for one view
use crate::application::chart_controller::{ChartResultController, RefreshTrigger};
use crate::application::request_lifecycle::FetchScope;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Transient refresh state of a mounted view. Reset on every mount.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshState {
    pub is_live: bool,
    /// Last successful live or manual refresh; `None` right after mount
    pub last_updated: Option<DateTime<Utc>>,
}

/// Owns the live timer of exactly one dashboard view.
///
/// There is at most one timer task at any time. Dropping the scheduler aborts
/// the timer whether or not live mode is on, and the task also exits on its own
/// once the view scope is cancelled.
pub struct LiveRefreshScheduler {
    period: Duration,
    charts: Arc<[Arc<ChartResultController>]>,
    scope: FetchScope,
    refresh_state: Arc<watch::Sender<RefreshState>>,
    timer: Option<JoinHandle<()>>,
    ticks: Arc<AtomicU64>,
}

impl LiveRefreshScheduler {
    pub fn new(
        period: Duration,
        charts: Arc<[Arc<ChartResultController>]>,
        scope: FetchScope,
        refresh_state: Arc<watch::Sender<RefreshState>>,
    ) -> Self {
        Self {
            period,
            charts,
            scope,
            refresh_state,
            timer: None,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.timer.is_some()
    }

    /// Number of ticks fired since the scheduler was created
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Turn live mode on. A no-op when already live.
    pub fn start(&mut self) {
        if self.timer.is_some() {
            tracing::debug!("Live refresh already running");
            return;
        }

        tracing::info!("Live refresh on (every {:?})", self.period);
        self.timer = Some(tokio::spawn(tick_loop(
            self.period,
            self.charts.clone(),
            self.scope.clone(),
            self.ticks.clone(),
        )));
        self.refresh_state.send_modify(|s| s.is_live = true);
    }

    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            tracing::info!("Live refresh off");
            timer.abort();
        }
        self.refresh_state.send_modify(|s| s.is_live = false);
    }

    /// Flip live mode and return the new state
    pub fn toggle(&mut self) -> bool {
        self.set_live(!self.is_live());
        self.is_live()
    }

    pub fn set_live(&mut self, live: bool) {
        if live {
            self.start();
        } else {
            self.stop();
        }
    }
}

impl Drop for LiveRefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

async fn tick_loop(
    period: Duration,
    charts: Arc<[Arc<ChartResultController>]>,
    scope: FetchScope,
    ticks: Arc<AtomicU64>,
) {
    // First tick one full period after going live.
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = scope.cancelled() => break,
            _ = interval.tick() => {}
        }

        ticks.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Live tick: reloading {} charts", charts.len());

        // One task per chart; charts never wait on each other.
        for controller in charts.iter() {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.load(RefreshTrigger::LiveTick).await;
            });
        }
    }
}
