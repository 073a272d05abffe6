//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the render
//! server. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the render server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RenderServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Document and initial-data settings.
    pub render: RenderConfig,

    /// Route definitions, in match order.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Document rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Document `<title>`.
    pub title: String,

    /// Id of the element carrying the serialized initial data.
    pub state_element_id: String,

    /// Id of the element the page is rendered into.
    pub root_element_id: String,

    /// Deadline for loading a view and fetching its data, in milliseconds.
    /// Unset means no deadline.
    pub fetch_timeout_ms: Option<u64>,

    /// Client stylesheet URL.
    pub stylesheet: Option<String>,

    /// Client script URLs, loaded deferred.
    pub scripts: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            state_element_id: "server-app-state".to_string(),
            root_element_id: "root".to_string(),
            fetch_timeout_ms: None,
            stylesheet: None,
            scripts: Vec::new(),
        }
    }
}

/// Route configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RouteConfig {
    /// Path template (`/users/:id`), or `**` for the not-found route.
    pub path: String,

    /// Name of a registered view.
    pub view: String,

    /// Match the whole pathname only.
    pub exact: bool,

    /// Trailing slash is significant.
    pub strict: bool,

    /// Case-sensitive matching.
    pub sensitive: bool,

    /// Redirect matching requests to this path.
    pub redirect_to: Option<String>,

    /// Load the view during client bootstrap even when not matched.
    pub prefetch: bool,

    /// Route identifier for logging.
    pub name: Option<String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: RenderServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.render.state_element_id, "server-app-state");
        assert!(config.routes.is_empty());
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_routes_parse_in_order() {
        let config: RenderServerConfig = toml::from_str(
            r#"
            [render]
            title = "Shop"
            fetch_timeout_ms = 2000

            [[routes]]
            path = "/"
            view = "home"
            exact = true

            [[routes]]
            path = "/old"
            view = "home"
            redirect_to = "/"

            [[routes]]
            path = "**"
            view = "not-found"
            "#,
        )
        .unwrap();

        assert_eq!(config.render.title, "Shop");
        assert_eq!(config.render.fetch_timeout_ms, Some(2000));
        let paths: Vec<_> = config.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/", "/old", "**"]);
        assert!(config.routes[0].exact);
        assert_eq!(config.routes[1].redirect_to.as_deref(), Some("/"));
    }
}
