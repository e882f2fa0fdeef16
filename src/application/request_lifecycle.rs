// Cancellation scopes tied to a mounted view
use crate::application::dashboard_api::ApiResult;
use crate::application::errors::{FetchError, FetchResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Soft timeout applied to every scoped call; the HTTP transport has none.
pub const DEFAULT_SOFT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cancellation boundary for backend calls.
///
/// Scopes are hierarchical: cancelling a scope cancels every child created
/// from it, cancelling a child leaves the parent untouched.
#[derive(Debug, Clone)]
pub struct FetchScope {
    token: CancellationToken,
    timeout: Duration,
}

impl FetchScope {
    pub fn new(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            timeout,
        }
    }

    pub fn child(&self) -> FetchScope {
        Self {
            token: self.token.child_token(),
            timeout: self.timeout,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Run a backend call under this scope.
    ///
    /// Cancellation wins over a result that is ready at the same time, and the
    /// call future is dropped as soon as the scope is cancelled.
    pub async fn run<T, F>(&self, call: F) -> FetchResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        if self.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(FetchError::Cancelled),
            outcome = tokio::time::timeout(self.timeout, call) => match outcome {
                Ok(result) => result.map_err(FetchError::from),
                Err(_) => Err(FetchError::ExecutionFailed(format!(
                    "no response within {}s",
                    self.timeout.as_secs()
                ))),
            },
        }
    }
}

/// Issues one scope per view mount and cancels it on teardown.
#[derive(Debug)]
pub struct RequestLifecycleManager {
    timeout: Duration,
    current: Option<FetchScope>,
}

impl RequestLifecycleManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            current: None,
        }
    }

    /// Start a new mount. Any scope from a previous mount is cancelled first.
    pub fn mount(&mut self) -> FetchScope {
        let scope = self.prepare();
        self.adopt(scope.clone());
        scope
    }

    /// A scope for a mount that is not committed yet. The current scope stays
    /// active until [`adopt`](Self::adopt) is called.
    pub fn prepare(&self) -> FetchScope {
        FetchScope::new(self.timeout)
    }

    /// Make `scope` the current mount, cancelling the previous one.
    pub fn adopt(&mut self, scope: FetchScope) {
        self.teardown();
        self.current = Some(scope);
    }

    pub fn scope(&self) -> Option<&FetchScope> {
        self.current.as_ref()
    }

    pub fn teardown(&mut self) {
        if let Some(scope) = self.current.take() {
            tracing::debug!("Cancelling view scope");
            scope.cancel();
        }
    }
}

impl Drop for RequestLifecycleManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
