//! Route matching logic.
//!
//! # Responsibilities
//! - Test a pathname against each route in declaration order
//! - Return the first matching route with its extracted parameters
//!
//! # Design Decisions
//! - First match wins, not best match
//! - Query and fragment never take part in matching
//! - No match is an ordinary outcome (`None`), never an error

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::routing::table::{RouteDescriptor, RouteTable};
use crate::view::ViewUnit;

/// A route that accepted a pathname.
#[derive(Clone)]
pub struct MatchResult {
    pub route: Arc<RouteDescriptor>,
    pub params: BTreeMap<String, String>,
    pub is_exact: bool,
    /// The portion of the pathname the pattern consumed.
    pub url: String,
}

impl MatchResult {
    pub fn path(&self) -> &str {
        &self.route.path
    }

    pub fn view(&self) -> &ViewUnit {
        &self.route.view
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn is_catch_all(&self) -> bool {
        self.route.is_catch_all()
    }
}

impl fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchResult")
            .field("path", &self.route.path)
            .field("params", &self.params)
            .field("is_exact", &self.is_exact)
            .field("url", &self.url)
            .finish()
    }
}

impl RouteTable {
    /// The first route accepting `pathname`, if any.
    pub fn match_path(&self, pathname: &str) -> Option<MatchResult> {
        self.entries.iter().find_map(|entry| {
            entry.pattern.matches(pathname).map(|m| MatchResult {
                route: entry.route.clone(),
                params: m.params,
                is_exact: m.is_exact,
                url: m.url,
            })
        })
    }
}

/// Free-function form of [`RouteTable::match_path`].
pub fn match_route(pathname: &str, routes: &RouteTable) -> Option<MatchResult> {
    let matched = routes.match_path(pathname);
    match &matched {
        Some(m) => tracing::trace!(pathname, route = %m.route.label(), "Route matched"),
        None => tracing::trace!(pathname, "No route matched"),
    }
    matched
}
