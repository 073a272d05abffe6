//! Initial-data error definitions.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::view::LoadError;

/// Error type returned by loaders and initial-data capabilities.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to produce initial data for a view.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The view's module could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The view's initial-data capability failed.
    #[error("initial data for view `{view}` failed: {source}")]
    Fetch {
        view: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Load and fetch did not settle within the configured deadline.
    #[error("initial data for view `{view}` timed out after {after:?}")]
    Timeout { view: String, after: Duration },
}

impl FetchError {
    pub fn fetch(view: impl Into<String>, source: BoxError) -> Self {
        FetchError::Fetch {
            view: view.into(),
            source: Arc::from(source),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Load(_) => "load",
            FetchError::Fetch { .. } => "fetch",
            FetchError::Timeout { .. } => "timeout",
        }
    }
}
