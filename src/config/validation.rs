//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate route paths and the catch-all placement
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RenderServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - View names are resolved later, against the view registry

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::RenderServerConfig;
use crate::routing::CATCH_ALL;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted location of the offending field, e.g. `routes[2].path`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &RenderServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.render.fetch_timeout_ms == Some(0) {
        errors.push(ValidationError::new("render.fetch_timeout_ms", "must be greater than 0"));
    }
    if config.render.state_element_id.is_empty() {
        errors.push(ValidationError::new("render.state_element_id", "must not be empty"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", config.observability.metrics_address),
        ));
    }

    let mut catch_all_seen = false;
    let last = config.routes.len().saturating_sub(1);
    for (i, route) in config.routes.iter().enumerate() {
        let field = |name: &str| format!("routes[{i}].{name}");

        if route.view.is_empty() {
            errors.push(ValidationError::new(field("view"), "must name a view"));
        }

        if route.path == CATCH_ALL {
            if catch_all_seen {
                errors.push(ValidationError::new(field("path"), "duplicate catch-all route"));
            }
            catch_all_seen = true;
            if i != last {
                errors.push(ValidationError::new(
                    field("path"),
                    "catch-all route must be the last route",
                ));
            }
            if route.redirect_to.is_some() {
                errors.push(ValidationError::new(
                    field("redirect_to"),
                    "catch-all route cannot redirect",
                ));
            }
            continue;
        }

        if route.path.is_empty() {
            errors.push(ValidationError::new(field("path"), "must not be empty"));
        } else if !route.path.starts_with('/') {
            errors.push(ValidationError::new(field("path"), "must start with `/`"));
        }

        if let Some(target) = &route.redirect_to {
            if !target.starts_with('/') {
                errors.push(ValidationError::new(field("redirect_to"), "must start with `/`"));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
