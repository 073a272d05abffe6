//! Server render subsystem.
//!
//! # Data Flow
//! ```text
//! RequestInfo (path, original URL, query)
//!     → orchestrator.rs
//!         → data fetcher (route match + initial data; errors become error data)
//!         → catch-all route?   → RenderOutcome::NotFound
//!         → redirect route?    → RenderOutcome::Redirect (301)
//!         → document.rs (HTML shell, state blob, error_view.rs)
//!             → page.rs (RenderPage continuation → PageRenderer)
//!         → RenderOutcome::Page
//! ```
//!
//! # Design Decisions
//! - One `RenderOutcome` per request: the response is written once
//! - No cross-request state beyond the shared view load memo

use thiserror::Error;

use crate::data::error::BoxError;
use crate::view::LoadError;

pub mod document;
pub mod error_view;
pub mod orchestrator;
pub mod page;

pub use document::{escape_html, Assets, DocumentContext, DocumentRenderer, HtmlDocument};
pub use error_view::{DefaultErrorView, ErrorInfo, ErrorView};
pub use orchestrator::{redirect_location, Orchestrator, RenderOutcome};
pub use page::{DefaultPageRenderer, PageRenderer, RenderPage, RenderedPage};

/// Failure to produce markup. Initial-data failures never end up here.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("rendering view `{view}` failed: {source}")]
    Page {
        view: String,
        #[source]
        source: BoxError,
    },

    #[error("document rendering failed: {0}")]
    Document(#[source] BoxError),
}
