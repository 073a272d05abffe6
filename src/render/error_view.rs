//! Error view shown when initial data could not be produced.

use std::error::Error as StdError;

use serde::Serialize;

use crate::data::error::FetchError;
use crate::render::document::escape_html;

/// What an error view gets to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// `load`, `fetch` or `timeout`.
    pub kind: &'static str,
    pub message: String,
    /// Messages of the underlying causes, outermost first.
    pub causes: Vec<String>,
}

impl From<&FetchError> for ErrorInfo {
    fn from(error: &FetchError) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            kind: error.kind(),
            message: error.to_string(),
            causes,
        }
    }
}

/// Renders an [`ErrorInfo`] into the document body.
pub trait ErrorView: Send + Sync {
    fn render(&self, error: &ErrorInfo) -> String;
}

impl<F> ErrorView for F
where
    F: Fn(&ErrorInfo) -> String + Send + Sync,
{
    fn render(&self, error: &ErrorInfo) -> String {
        self(error)
    }
}

/// Built-in error page section.
#[derive(Debug, Clone, Default)]
pub struct DefaultErrorView;

impl ErrorView for DefaultErrorView {
    fn render(&self, error: &ErrorInfo) -> String {
        let mut html = String::from(
            r#"<article class="error"><h1>Whoops!</h1><h2>Something went wrong.</h2><section>"#,
        );
        html.push_str("<p><strong>");
        html.push_str(&escape_html(&error.message));
        html.push_str("</strong></p>");
        for cause in &error.causes {
            html.push_str("<p>");
            html.push_str(&escape_html(cause));
            html.push_str("</p>");
        }
        html.push_str("</section></article>");
        html
    }
}
