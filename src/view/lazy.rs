//! Lazily loaded views.
//!
//! # Responsibilities
//! - Run the underlying loader on demand
//! - Share a single in-flight load among concurrent callers
//! - Memoize the resolved component for the lifetime of the unit
//!
//! # Design Decisions
//! - The memo cell belongs to the unit, never to a module-level static
//! - A failed load is reported to every waiter of that attempt and then
//!   forgotten, so the next `load()` retries
//! - The lock is never held across an `.await`

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;

use crate::data::error::BoxError;
use crate::view::component::{Component, Module};

/// Resolves a view's module.
pub trait Loader: Send + Sync {
    fn load(&self) -> BoxFuture<'static, Result<Module, BoxError>>;
}

impl<F, Fut> Loader for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Module, BoxError>> + Send + 'static,
{
    fn load(&self) -> BoxFuture<'static, Result<Module, BoxError>> {
        Box::pin(self())
    }
}

/// A load failure, shared by every caller that awaited the same attempt.
#[derive(Debug, Clone, Error)]
#[error("failed to load view `{view}`: {source}")]
pub struct LoadError {
    view: Arc<str>,
    #[source]
    source: Arc<dyn std::error::Error + Send + Sync>,
}

impl LoadError {
    pub fn new(view: Arc<str>, source: BoxError) -> Self {
        Self {
            view,
            source: Arc::from(source),
        }
    }

    pub fn view(&self) -> &str {
        &self.view
    }
}

type SharedLoad = Shared<BoxFuture<'static, Result<Component, LoadError>>>;

#[derive(Default)]
struct LoadSlot {
    resolved: Option<Component>,
    in_flight: Option<(u64, SharedLoad)>,
    attempts: u64,
}

/// A view whose component is resolved on first use.
pub struct LazyView {
    name: Arc<str>,
    loader: Arc<dyn Loader>,
    fetches_data: bool,
    slot: Mutex<LoadSlot>,
}

impl LazyView {
    pub fn new(name: impl Into<Arc<str>>, loader: impl Loader + 'static) -> Self {
        Self {
            name: name.into(),
            loader: Arc::new(loader),
            fetches_data: false,
            slot: Mutex::new(LoadSlot::default()),
        }
    }

    /// Declare that the resolved component provides initial data.
    pub fn with_initial_data(mut self) -> Self {
        self.fetches_data = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fetches_data(&self) -> bool {
        self.fetches_data
    }

    /// The resolved component, if a load has completed.
    pub fn resolved(&self) -> Option<Component> {
        self.slot.lock().resolved.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().resolved.is_some()
    }

    /// Load attempts started so far (successful or not).
    pub fn attempts(&self) -> u64 {
        self.slot.lock().attempts
    }

    /// Resolve the component, starting the loader only if no attempt is
    /// already running and nothing is memoized yet.
    pub async fn load(&self) -> Result<Component, LoadError> {
        let (attempt, pending) = {
            let mut slot = self.slot.lock();
            if let Some(component) = &slot.resolved {
                return Ok(component.clone());
            }
            match slot.in_flight.clone() {
                Some(running) => running,
                None => {
                    slot.attempts += 1;
                    let attempt = slot.attempts;
                    let pending = self.start_load();
                    slot.in_flight = Some((attempt, pending.clone()));
                    (attempt, pending)
                }
            }
        };

        let result = pending.await;

        let mut slot = self.slot.lock();
        if matches!(&slot.in_flight, Some((current, _)) if *current == attempt) {
            slot.in_flight = None;
            match &result {
                Ok(component) => {
                    tracing::debug!(view = %self.name, attempt, "View loaded");
                    slot.resolved = Some(component.clone());
                }
                Err(e) => {
                    tracing::warn!(view = %self.name, attempt, error = %e, "View load failed");
                }
            }
        }
        result
    }

    fn start_load(&self) -> SharedLoad {
        let loader = self.loader.clone();
        let name = self.name.clone();
        async move {
            loader
                .load()
                .await
                .map(Module::into_component)
                .map_err(|e| LoadError::new(name, e))
        }
        .boxed()
        .shared()
    }
}
