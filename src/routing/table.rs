//! Route descriptors and the compiled route table.
//!
//! # Responsibilities
//! - Hold route descriptors in declaration order
//! - Compile every path pattern once, at construction
//! - Build tables from configuration against a view registry
//!
//! # Design Decisions
//! - Immutable after construction (shared via Arc, no locks)
//! - Construction fails on the first invalid pattern or unknown view

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::RouteConfig;
use crate::routing::pattern::{MatchOptions, PathPattern, PatternError, CATCH_ALL};
use crate::view::{ViewRegistry, ViewUnit};

/// Errors raised while building a route table.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("route `{path}`: {source}")]
    Pattern {
        path: String,
        #[source]
        source: PatternError,
    },

    #[error("route `{path}` refers to unknown view `{view}`")]
    UnknownView { path: String, view: String },
}

/// A (path pattern, view, metadata) binding.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub path: String,
    pub exact: bool,
    pub sensitive: bool,
    pub strict: bool,
    pub view: ViewUnit,
    pub redirect_to: Option<String>,
    pub prefetch: bool,
    /// Label used in logs and metrics.
    pub name: Option<String>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, view: impl Into<ViewUnit>) -> Self {
        Self {
            path: path.into(),
            exact: false,
            sensitive: false,
            strict: false,
            view: view.into(),
            redirect_to: None,
            prefetch: false,
            name: None,
        }
    }

    /// Catch-all route, conventionally the last entry of a table.
    pub fn not_found(view: impl Into<ViewUnit>) -> Self {
        Self::new(CATCH_ALL, view)
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn redirect_to(mut self, target: impl Into<String>) -> Self {
        self.redirect_to = Some(target.into());
        self
    }

    pub fn prefetch(mut self) -> Self {
        self.prefetch = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn options(&self) -> MatchOptions {
        MatchOptions {
            exact: self.exact,
            strict: self.strict,
            sensitive: self.sensitive,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.path == CATCH_ALL
    }

    /// Name for logs: the explicit name, else the path.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("path", &self.path)
            .field("exact", &self.exact)
            .field("strict", &self.strict)
            .field("sensitive", &self.sensitive)
            .field("view", &self.view)
            .field("redirect_to", &self.redirect_to)
            .field("prefetch", &self.prefetch)
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct RouteEntry {
    pub(crate) route: Arc<RouteDescriptor>,
    pub(crate) pattern: PathPattern,
}

/// Ordered, compiled routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    pub(crate) entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Compile `routes`, keeping their declaration order.
    pub fn new(routes: Vec<RouteDescriptor>) -> Result<Self, RouteTableError> {
        let mut entries = Vec::with_capacity(routes.len());
        for route in routes {
            let pattern = PathPattern::compile(&route.path, route.options()).map_err(|source| {
                RouteTableError::Pattern {
                    path: route.path.clone(),
                    source,
                }
            })?;
            tracing::debug!(
                path = %route.path,
                view = %route.view.name(),
                exact = route.exact,
                redirect = ?route.redirect_to,
                "Route compiled"
            );
            entries.push(RouteEntry {
                route: Arc::new(route),
                pattern,
            });
        }
        Ok(Self { entries })
    }

    /// Build a table from configuration, resolving view names in `registry`.
    pub fn from_config(
        configs: &[RouteConfig],
        registry: &ViewRegistry,
    ) -> Result<Self, RouteTableError> {
        let mut routes = Vec::with_capacity(configs.len());
        for config in configs {
            let view = registry
                .get(&config.view)
                .cloned()
                .ok_or_else(|| RouteTableError::UnknownView {
                    path: config.path.clone(),
                    view: config.view.clone(),
                })?;
            routes.push(RouteDescriptor {
                path: config.path.clone(),
                exact: config.exact,
                sensitive: config.sensitive,
                strict: config.strict,
                view,
                redirect_to: config.redirect_to.clone(),
                prefetch: config.prefetch,
                name: config.name.clone(),
            });
        }
        Self::new(routes)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteDescriptor>> {
        self.entries.iter().map(|e| &e.route)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
