//! Page rendering: the matched view with its props.
//!
//! # Responsibilities
//! - Resolve the view matched for the request, loading it if needed
//! - Build props from data, params and the request query
//! - Hand the component to the pluggable [`PageRenderer`]

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::data::context::RequestInfo;
use crate::data::error::BoxError;
use crate::render::RenderError;
use crate::routing::table::RouteTable;
use crate::view::{Component, PageProps};

/// Output of page rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// Markup placed inside the root element.
    pub html: String,
    /// Extra tags for `<head>` (title, meta, links).
    pub head: Vec<String>,
}

impl RenderedPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            head: Vec::new(),
        }
    }
}

/// Turns a component and its props into a page. Replaceable for engines that
/// render asynchronously or produce head tags.
pub trait PageRenderer: Send + Sync {
    fn render_page(
        &self,
        component: Component,
        props: PageProps,
    ) -> BoxFuture<'static, Result<RenderedPage, BoxError>>;
}

/// Calls the component's own render function.
#[derive(Debug, Clone, Default)]
pub struct DefaultPageRenderer;

impl PageRenderer for DefaultPageRenderer {
    fn render_page(
        &self,
        component: Component,
        props: PageProps,
    ) -> BoxFuture<'static, Result<RenderedPage, BoxError>> {
        let html = component.render(&props);
        async move { Ok(RenderedPage::new(html)) }.boxed()
    }
}

/// Deferred "render the view for this request with this data".
#[derive(Clone)]
pub struct RenderPage {
    routes: Arc<RouteTable>,
    request: RequestInfo,
    renderer: Arc<dyn PageRenderer>,
}

impl RenderPage {
    pub fn new(
        routes: Arc<RouteTable>,
        request: RequestInfo,
        renderer: Arc<dyn PageRenderer>,
    ) -> Self {
        Self {
            routes,
            request,
            renderer,
        }
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Render the view matching the request path. Nothing matched renders
    /// an empty page.
    pub async fn render(&self, data: Option<&Value>) -> Result<RenderedPage, RenderError> {
        let Some(route_match) = self.routes.match_path(&self.request.path) else {
            return Ok(RenderedPage::default());
        };

        let component = route_match.view().load().await?;
        let props = PageProps {
            data: data.cloned(),
            params: route_match.params.clone(),
            query: self.request.query.clone(),
            location: self.request.location(),
        };

        self.renderer
            .render_page(component, props)
            .await
            .map_err(|source| RenderError::Page {
                view: route_match.view().name().to_string(),
                source,
            })
    }
}
