//! Context handed to initial-data capabilities.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::routing::location::{Location, Query};
use crate::routing::matcher::MatchResult;

/// Where the code is running. Injected, never probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Server,
    Client,
}

/// The parts of an HTTP request the fetch contract sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestInfo {
    pub path: String,
    pub original_url: String,
    pub query: Query,
}

impl RequestInfo {
    /// Derive path and query from an absolute or origin-relative URL.
    pub fn from_url(original_url: impl Into<String>) -> Self {
        let original_url = original_url.into();
        let (path, query) = match url::Url::parse(&original_url) {
            Ok(parsed) => (
                parsed.path().to_string(),
                Query::parse(parsed.query().unwrap_or_default()),
            ),
            Err(_) => {
                let location = Location::parse(&original_url);
                let query = location.query();
                (location.pathname, query)
            }
        };
        Self {
            path,
            original_url,
            query,
        }
    }
}

/// Ambient request/location information for one fetch.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub environment: Environment,
    pub location: Location,
    pub request: Option<RequestInfo>,
    /// Always the match the fetch was issued for.
    pub route_match: Option<MatchResult>,
    /// Parsed from `location.search` on the client, taken from the request on the server.
    pub query: Query,
    /// Application-provided values.
    pub extensions: Map<String, Value>,
}

impl FetchContext {
    pub fn server(request: RequestInfo) -> Self {
        let location = request.location();
        Self {
            environment: Environment::Server,
            location,
            query: request.query.clone(),
            request: Some(request),
            route_match: None,
            extensions: Map::new(),
        }
    }

    pub fn client(location: Location) -> Self {
        Self {
            environment: Environment::Client,
            query: location.query(),
            location,
            request: None,
            route_match: None,
            extensions: Map::new(),
        }
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    /// A matched path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route_match.as_ref().and_then(|m| m.param(name))
    }

    /// Replace the match (the fresh one always wins) and refresh `query`.
    pub fn with_match(mut self, route_match: MatchResult) -> Self {
        self.route_match = Some(route_match);
        self.query = self.resolve_query();
        self
    }

    fn resolve_query(&self) -> Query {
        match self.environment {
            Environment::Client => self.location.query(),
            Environment::Server => self
                .request
                .as_ref()
                .map(|r| r.query.clone())
                .unwrap_or_default(),
        }
    }
}

impl RequestInfo {
    /// The request as a [`Location`] (path, search and hash of `original_url`).
    pub fn location(&self) -> Location {
        Location::parse(&self.original_url_path())
    }

    /// Path plus query of `original_url`, without scheme and host.
    fn original_url_path(&self) -> String {
        match url::Url::parse(&self.original_url) {
            Ok(parsed) => match parsed.query() {
                Some(q) => format!("{}?{}", parsed.path(), q),
                None => parsed.path().to_string(),
            },
            Err(_) if self.original_url.is_empty() => self.path.clone(),
            Err(_) => self.original_url.clone(),
        }
    }
}
