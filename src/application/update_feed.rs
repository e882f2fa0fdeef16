// Update feed - Latest pending state per chart, for whoever renders the view
use crate::application::chart_controller::ChartUpdate;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Coalescing queue of chart updates.
///
/// Holds at most one pending update per chart: a newer update replaces the
/// queued one in place, so a slow reader sees each chart's latest state and
/// the queue never grows past the number of charts.
#[derive(Debug, Default)]
pub struct UpdateFeed {
    pending: Mutex<VecDeque<ChartUpdate>>,
    notify: Notify,
}

impl UpdateFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, update: ChartUpdate) {
        {
            let mut pending = self.lock();
            match pending.iter_mut().find(|queued| queued.chart_id == update.chart_id) {
                Some(queued) => *queued = update,
                None => pending.push_back(update),
            }
        }
        self.notify.notify_one();
    }

    /// Wait for the next update. Cancel safe: an update is only removed from
    /// the queue when it is returned.
    pub async fn next(&self) -> ChartUpdate {
        loop {
            if let Some(update) = self.lock().pop_front() {
                return update;
            }
            self.notify.notified().await;
        }
    }

    pub fn try_next(&self) -> Option<ChartUpdate> {
        self.lock().pop_front()
    }

    /// Drop everything pending, e.g. updates of charts that are no longer shown.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ChartUpdate>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
