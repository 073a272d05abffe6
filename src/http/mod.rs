//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → request.rs (RenderRequest: path, original URL, query, request ID)
//!     → render orchestrator
//!     → server.rs (RenderOutcome → 404 / 301 + Location / 200 HTML)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{RenderRequest, REQUEST_ID_EXTENSION, X_REQUEST_ID};
pub use server::{AppState, RenderServer, ServerError};
