//! Universal rendering core.
//!
//! Matches URLs against a route table, fetches initial data for the matched
//! view, renders it on the server with the data embedded for the client, and
//! coordinates re-fetching during client-side navigation.

// Core subsystems
pub mod data;
pub mod navigation;
pub mod render;
pub mod routing;
pub mod view;

// Client bootstrap
pub mod hydration;

// Serving
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::RenderServerConfig;
pub use data::{DataFetcher, Environment, FetchContext, FetchError, RequestInfo, RouteData};
pub use http::{RenderServer, ServerError};
pub use lifecycle::Shutdown;
pub use navigation::{HistoryEvent, NavigationCoordinator};
pub use render::{Orchestrator, RenderOutcome};
pub use routing::{match_route, Location, MatchResult, RouteDescriptor, RouteTable};
pub use view::{Component, LazyView, Module, PageProps, ViewRegistry, ViewUnit};
