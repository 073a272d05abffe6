//! Resolved view components and the capabilities they expose.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::data::context::FetchContext;
use crate::data::error::BoxError;
use crate::routing::location::{Location, Query};

/// Props handed to a component when it renders.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageProps {
    /// Initial data for the matched route, `None` when there is none.
    pub data: Option<Value>,
    pub params: BTreeMap<String, String>,
    pub query: Query,
    pub location: Location,
}

/// Produces markup from props. The rendering engine itself lives outside
/// this crate; this is the seam it plugs into.
pub trait Render: Send + Sync {
    fn render(&self, props: &PageProps) -> String;
}

impl<F> Render for F
where
    F: Fn(&PageProps) -> String + Send + Sync,
{
    fn render(&self, props: &PageProps) -> String {
        self(props)
    }
}

/// The initial-data capability of a component.
pub trait InitialData: Send + Sync {
    fn fetch_initial_data(&self, ctx: FetchContext) -> BoxFuture<'static, Result<Value, BoxError>>;
}

impl<F, Fut> InitialData for F
where
    F: Fn(FetchContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    fn fetch_initial_data(&self, ctx: FetchContext) -> BoxFuture<'static, Result<Value, BoxError>> {
        Box::pin(self(ctx))
    }
}

/// A renderable component, optionally carrying an initial-data capability.
#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    render: Arc<dyn Render>,
    initial_data: Option<Arc<dyn InitialData>>,
}

impl Component {
    pub fn new(name: impl Into<Arc<str>>, render: impl Render + 'static) -> Self {
        Self {
            name: name.into(),
            render: Arc::new(render),
            initial_data: None,
        }
    }

    /// Attach an initial-data capability.
    pub fn with_initial_data(mut self, fetch: impl InitialData + 'static) -> Self {
        self.initial_data = Some(Arc::new(fetch));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, props: &PageProps) -> String {
        self.render.render(props)
    }

    pub fn initial_data(&self) -> Option<&Arc<dyn InitialData>> {
        self.initial_data.as_ref()
    }

    pub fn has_initial_data(&self) -> bool {
        self.initial_data.is_some()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("initial_data", &self.initial_data.is_some())
            .finish()
    }
}

/// What a lazy loader resolves to.
///
/// The component used for rendering is the default export when present,
/// otherwise the module value.
#[derive(Debug, Clone)]
pub struct Module {
    default_export: Option<Component>,
    value: Component,
}

impl Module {
    pub fn new(value: Component) -> Self {
        Self {
            default_export: None,
            value,
        }
    }

    pub fn with_default(mut self, default_export: Component) -> Self {
        self.default_export = Some(default_export);
        self
    }

    pub fn into_component(self) -> Component {
        self.default_export.unwrap_or(self.value)
    }
}

impl From<Component> for Module {
    fn from(value: Component) -> Self {
        Module::new(value)
    }
}
