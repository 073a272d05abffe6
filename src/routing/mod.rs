//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming pathname (server request path or client location)
//!     → location.rs (split pathname / search / hash, parse query)
//!     → matcher.rs (first route in declaration order that accepts it)
//!     → pattern.rs (compiled template, parameter extraction)
//!     → Return: MatchResult or None
//!
//! Route Compilation (at startup):
//!     RouteDescriptor[] (code) or RouteConfig[] + ViewRegistry (config)
//!     → table.rs compiles every pattern
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order)
//! - `**` is the not-found catch-all

pub mod location;
pub mod matcher;
pub mod pattern;
pub mod table;

pub use location::{Location, Query};
pub use matcher::{match_route, MatchResult};
pub use pattern::{MatchOptions, PathMatch, PathPattern, PatternError, CATCH_ALL};
pub use table::{RouteDescriptor, RouteTable, RouteTableError};
