// Error taxonomy for scoped fetches
use crate::application::dashboard_api::ApiError;
use crate::domain::dashboard::LayoutMismatch;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Aborted by scope teardown or supersession. Never shown to the user.
    #[error("request cancelled")]
    Cancelled,

    #[error("pipeline execution failed: {0}")]
    ExecutionFailed(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("failed to persist layout: {0}")]
    LayoutPersistFailed(String),

    #[error("layout has {} entries for {} charts", .0.layout, .0.charts)]
    IntegrityMismatch(LayoutMismatch),
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(what) => FetchError::NotFound(what),
            other => FetchError::ExecutionFailed(other.to_string()),
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
