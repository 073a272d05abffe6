//! View units bound to routes.
//!
//! # Data Flow
//! ```text
//! Application bootstrap
//!     → component.rs (Component: render + optional initial data)
//!     → lazy.rs (LazyView: load on demand, memoized per unit)
//!     → ViewUnit (Plain | DataBound | Lazy), shared via Arc
//!     → registry.rs (name → ViewUnit, used by config-driven route tables)
//! ```
//!
//! # Design Decisions
//! - Capabilities are fixed when the unit is built, not probed per call
//! - A unit is shared by every match of its route; it is never cloned per request

pub mod component;
pub mod lazy;
pub mod registry;

use std::fmt;
use std::sync::Arc;

pub use component::{Component, InitialData, Module, PageProps, Render};
pub use lazy::{LazyView, LoadError, Loader};
pub use registry::ViewRegistry;

/// The capability set of a view unit.
pub enum ViewKind {
    /// Render only.
    Plain(Component),
    /// Render and fetch initial data.
    DataBound(Component),
    /// Resolved on demand; may fetch initial data once loaded.
    Lazy(LazyView),
}

/// A shared handle to the view bound to a route.
#[derive(Clone)]
pub struct ViewUnit(Arc<ViewKind>);

impl ViewUnit {
    /// Wrap an already-resolved component. The variant follows its capabilities.
    pub fn eager(component: Component) -> Self {
        let kind = if component.has_initial_data() {
            ViewKind::DataBound(component)
        } else {
            ViewKind::Plain(component)
        };
        Self(Arc::new(kind))
    }

    pub fn plain(name: impl Into<Arc<str>>, render: impl Render + 'static) -> Self {
        Self(Arc::new(ViewKind::Plain(Component::new(name, render))))
    }

    pub fn data_bound(
        name: impl Into<Arc<str>>,
        render: impl Render + 'static,
        fetch: impl InitialData + 'static,
    ) -> Self {
        Self::eager(Component::new(name, render).with_initial_data(fetch))
    }

    pub fn lazy(view: LazyView) -> Self {
        Self(Arc::new(ViewKind::Lazy(view)))
    }

    pub fn kind(&self) -> &ViewKind {
        &self.0
    }

    pub fn name(&self) -> &str {
        match self.kind() {
            ViewKind::Plain(c) | ViewKind::DataBound(c) => c.name(),
            ViewKind::Lazy(l) => l.name(),
        }
    }

    /// Whether fetching initial data may produce anything.
    pub fn has_initial_data(&self) -> bool {
        match self.kind() {
            ViewKind::Plain(_) => false,
            ViewKind::DataBound(_) => true,
            ViewKind::Lazy(l) => l.fetches_data(),
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.kind(), ViewKind::Lazy(_))
    }

    /// Whether the component can be rendered without awaiting a load.
    pub fn is_ready(&self) -> bool {
        match self.kind() {
            ViewKind::Lazy(l) => l.is_loaded(),
            _ => true,
        }
    }

    /// The component to render, if it is available now.
    pub fn component(&self) -> Option<Component> {
        match self.kind() {
            ViewKind::Plain(c) | ViewKind::DataBound(c) => Some(c.clone()),
            ViewKind::Lazy(l) => l.resolved(),
        }
    }

    /// Resolve the component, loading it if needed.
    pub async fn load(&self) -> Result<Component, LoadError> {
        match self.kind() {
            ViewKind::Plain(c) | ViewKind::DataBound(c) => Ok(c.clone()),
            ViewKind::Lazy(l) => l.load().await,
        }
    }

    /// True when both handles point at the same unit.
    pub fn ptr_eq(&self, other: &ViewUnit) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ViewUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind() {
            ViewKind::Plain(_) => "plain",
            ViewKind::DataBound(_) => "data_bound",
            ViewKind::Lazy(_) => "lazy",
        };
        f.debug_struct("ViewUnit")
            .field("name", &self.name())
            .field("kind", &kind)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl From<Component> for ViewUnit {
    fn from(component: Component) -> Self {
        ViewUnit::eager(component)
    }
}

impl From<LazyView> for ViewUnit {
    fn from(view: LazyView) -> Self {
        ViewUnit::lazy(view)
    }
}
