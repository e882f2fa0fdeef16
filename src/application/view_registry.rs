// View registry - Routes control commands to mounted dashboard views
use crate::application::dashboard_view::ViewCommand;
use crate::application::errors::{FetchError, FetchResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

pub type ViewId = u64;

/// Commands queued per view before senders wait
const COMMAND_BUFFER: usize = 16;

/// Every view that is currently mounted, by id.
///
/// The registry only holds the sending half of a view's command channel. A
/// view is unregistered when its [`Registration`] is dropped; its command
/// loop then ends and the view unmounts.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    next_id: AtomicU64,
    views: Mutex<HashMap<ViewId, mpsc::Sender<ViewCommand>>>,
}

/// Keeps a view reachable for as long as it lives
#[derive(Debug)]
pub struct Registration {
    id: ViewId,
    registry: Arc<ViewRegistry>,
}

impl Registration {
    pub fn id(&self) -> ViewId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
        tracing::debug!("View {} unregistered", self.id);
    }
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for a new view and open its command channel.
    pub fn register(self: &Arc<Self>) -> (Registration, mpsc::Receiver<ViewCommand>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (commands, inbox) = mpsc::channel(COMMAND_BUFFER);
        self.lock().insert(id, commands);
        tracing::debug!("View {} registered", id);

        let registration = Registration {
            id,
            registry: self.clone(),
        };
        (registration, inbox)
    }

    /// Send a command to a view and wait for its answer.
    ///
    /// A view that is unknown or unmounts before answering is `NotFound`.
    pub async fn send<T>(
        &self,
        id: ViewId,
        command: impl FnOnce(oneshot::Sender<T>) -> ViewCommand,
    ) -> FetchResult<T> {
        let gone = || FetchError::NotFound(format!("view {id}"));
        let commands = self.lock().get(&id).cloned().ok_or_else(gone)?;

        let (reply, answer) = oneshot::channel();
        commands.send(command(reply)).await.map_err(|_| gone())?;
        answer.await.map_err(|_| gone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ViewId, mpsc::Sender<ViewCommand>>> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
