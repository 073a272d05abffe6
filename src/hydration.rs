//! Client bootstrap.
//!
//! # Responsibilities
//! - Load the lazy views the first render needs before it happens
//! - Read the server-embedded state blob, once
//! - Seed a [`NavigationCoordinator`] with that data
//!
//! # Design Decisions
//! - The state blob is a JSON `<script>` element; `<`, `>` and `&` are
//!   written as unicode escapes so the payload cannot close the element
//! - On the server nothing is read and the data is `None`

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde_json::Value;
use thiserror::Error;

use crate::data::context::Environment;
use crate::navigation::NavigationCoordinator;
use crate::routing::location::Location;
use crate::routing::table::RouteTable;
use crate::view::LoadError;

/// Element id the server writes initial data under.
pub const DEFAULT_STATE_ELEMENT_ID: &str = "server-app-state";

#[derive(Debug, Error)]
pub enum HydrationError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("server state in `#{id}` is not valid JSON: {source}")]
    InvalidState {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Bootstrap settings.
#[derive(Debug, Clone)]
pub struct Hydration {
    state_element_id: String,
}

impl Default for Hydration {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_ELEMENT_ID)
    }
}

impl Hydration {
    pub fn new(state_element_id: impl Into<String>) -> Self {
        Self {
            state_element_id: state_element_id.into(),
        }
    }

    pub fn state_element_id(&self) -> &str {
        &self.state_element_id
    }

    /// Load what the first render of `pathname` needs and read the state blob
    /// from `document` on the client.
    ///
    /// Loads the matched route's view and every route marked `prefetch`.
    pub async fn ensure_ready(
        &self,
        routes: &RouteTable,
        pathname: &str,
        environment: Environment,
        document: Option<&str>,
    ) -> Result<Option<Value>, HydrationError> {
        let matched = routes.match_path(pathname);
        let views = routes
            .routes()
            .filter(|route| route.prefetch)
            .map(|route| route.view.clone())
            .chain(matched.map(|m| m.view().clone()))
            .filter(|view| view.is_lazy());

        try_join_all(views.map(|view| async move { view.load().await })).await?;

        if environment == Environment::Server {
            return Ok(None);
        }
        let Some(document) = document else {
            tracing::debug!("No document to read server state from");
            return Ok(None);
        };

        extract_state(document, &self.state_element_id).map_err(|e| {
            tracing::error!(error = %e, "Failed to read server state");
            e
        })
    }

    /// Run [`Hydration::ensure_ready`] and start navigation at `location`.
    pub async fn bootstrap(
        &self,
        routes: Arc<RouteTable>,
        location: Location,
        document: &str,
    ) -> Result<NavigationCoordinator, HydrationError> {
        let data = self
            .ensure_ready(&routes, &location.pathname, Environment::Client, Some(document))
            .await?;
        tracing::info!(path = %location.pathname, has_data = data.is_some(), "Client hydrated");
        Ok(NavigationCoordinator::new(routes, location, data))
    }
}

/// [`Hydration::ensure_ready`] with the default element id.
pub async fn ensure_ready(
    routes: &RouteTable,
    pathname: &str,
    environment: Environment,
    document: Option<&str>,
) -> Result<Option<Value>, HydrationError> {
    Hydration::default()
        .ensure_ready(routes, pathname, environment, document)
        .await
}

/// Serialize `data` as the script element `extract_state` reads.
pub fn embed_state(id: &str, data: Option<&Value>) -> String {
    let json = data.map(Value::to_string).unwrap_or_else(|| "null".to_string());
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    format!(r#"<script id="{id}" type="application/json">{escaped}</script>"#)
}

/// Parse the JSON inside the element with `id`.
///
/// A missing element, an empty element and `null` all read as `None`.
pub fn extract_state(html: &str, id: &str) -> Result<Option<Value>, HydrationError> {
    let marker = format!(r#"id="{id}""#);
    let Some(start) = html.find(&marker) else {
        return Ok(None);
    };
    let rest = &html[start + marker.len()..];
    let Some(open_end) = rest.find('>') else {
        return Ok(None);
    };
    let body = &rest[open_end + 1..];
    let text = match body.find("</script>") {
        Some(end) => &body[..end],
        None => body,
    }
    .trim();

    if text.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(text) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(source) => Err(HydrationError::InvalidState {
            id: id.to_string(),
            source,
        }),
    }
}
