//! Initial-data subsystem.
//!
//! # Data Flow
//! ```text
//! Pathname + FetchContext (server request or client location)
//!     → fetcher.rs (match the route table, pick the view)
//!     → view load (lazy units only, memoized)
//!     → InitialData capability (context.rs carries the fresh match)
//!     → Return: RouteData { route, data } or FetchError
//! ```
//!
//! # Design Decisions
//! - One no-match convention everywhere: `route: None, data: None`
//! - Load and fetch failures share one error channel (`FetchError`)
//! - Environment is injected into the context, never detected

pub mod context;
pub mod error;
pub mod fetcher;

pub use context::{Environment, FetchContext, RequestInfo};
pub use error::{BoxError, FetchError};
pub use fetcher::{DataFetcher, RouteData};
