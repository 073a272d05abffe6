//! Document rendering.
//!
//! # Responsibilities
//! - Render the page through the [`RenderPage`] continuation
//! - Wrap it in the HTML shell: head, assets, root node, state blob
//! - Show the error view when initial data failed
//!
//! # Design Decisions
//! - The document is a trait so applications can own the shell entirely
//! - The state blob holds exactly the data the page rendered with, after
//!   the optional `filter_server_data` hook

use std::fmt;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::config::RenderConfig;
use crate::hydration::{embed_state, DEFAULT_STATE_ELEMENT_ID};
use crate::render::error_view::{DefaultErrorView, ErrorInfo, ErrorView};
use crate::render::page::RenderPage;
use crate::render::RenderError;
use crate::routing::matcher::MatchResult;

/// Client assets referenced by the document.
#[derive(Debug, Clone, Default)]
pub struct Assets {
    pub stylesheet: Option<String>,
    pub scripts: Vec<String>,
}

/// Everything the document step receives for one request.
pub struct DocumentContext {
    pub title: String,
    pub assets: Assets,
    pub route: Option<MatchResult>,
    pub data: Option<Value>,
    pub error: Option<ErrorInfo>,
    pub render_page: RenderPage,
}

impl fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentContext")
            .field("title", &self.title)
            .field("route", &self.route)
            .field("data", &self.data)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Produces the final markup of a response.
pub trait DocumentRenderer: Send + Sync {
    fn render_document(&self, ctx: DocumentContext) -> BoxFuture<'_, Result<String, RenderError>>;
}

type DataFilter = Arc<dyn Fn(Option<Value>) -> Option<Value> + Send + Sync>;
type CriticalCss = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Default HTML shell.
#[derive(Clone)]
pub struct HtmlDocument {
    state_element_id: String,
    root_element_id: String,
    error_view: Arc<dyn ErrorView>,
    filter_server_data: Option<DataFilter>,
    critical_css: Option<CriticalCss>,
}

impl Default for HtmlDocument {
    fn default() -> Self {
        Self {
            state_element_id: DEFAULT_STATE_ELEMENT_ID.to_string(),
            root_element_id: "root".to_string(),
            error_view: Arc::new(DefaultErrorView),
            filter_server_data: None,
            critical_css: None,
        }
    }
}

impl HtmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            state_element_id: config.state_element_id.clone(),
            root_element_id: config.root_element_id.clone(),
            ..Self::default()
        }
    }

    pub fn with_error_view(mut self, view: impl ErrorView + 'static) -> Self {
        self.error_view = Arc::new(view);
        self
    }

    /// Transform the data before it is embedded for the client.
    pub fn with_filter_server_data(
        mut self,
        filter: impl Fn(Option<Value>) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.filter_server_data = Some(Arc::new(filter));
        self
    }

    /// Inline CSS placed in `<head>`, re-evaluated per request.
    pub fn with_critical_css(
        mut self,
        css: impl Fn() -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.critical_css = Some(Arc::new(css));
        self
    }

    pub fn state_element_id(&self) -> &str {
        &self.state_element_id
    }

    async fn render(&self, ctx: DocumentContext) -> Result<String, RenderError> {
        let page = ctx.render_page.render(ctx.data.as_ref()).await?;
        let state = match &self.filter_server_data {
            Some(filter) => filter(ctx.data),
            None => ctx.data,
        };

        let mut html = String::with_capacity(page.html.len() + 512);
        html.push_str("<!doctype html><html><head>");
        html.push_str(r#"<meta http-equiv="X-UA-Compatible" content="IE=edge">"#);
        html.push_str(r#"<meta charset="utf-8">"#);
        html.push_str(r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#);
        html.push_str("<title>");
        html.push_str(&escape_html(&ctx.title));
        html.push_str("</title>");
        for tag in &page.head {
            html.push_str(tag);
        }
        if let Some(css) = self.critical_css.as_ref().and_then(|css| css()) {
            html.push_str("<style>");
            html.push_str(&css);
            html.push_str("</style>");
        }
        if let Some(href) = &ctx.assets.stylesheet {
            html.push_str(&format!(r#"<link rel="stylesheet" href="{}">"#, escape_html(href)));
        }
        html.push_str("</head><body>");
        html.push_str(&format!(r#"<div id="{}">"#, escape_html(&self.root_element_id)));
        html.push_str(&page.html);
        html.push_str("</div>");
        html.push_str(&embed_state(&self.state_element_id, state.as_ref()));
        if let Some(error) = &ctx.error {
            html.push_str(&self.error_view.render(error));
        }
        for src in &ctx.assets.scripts {
            html.push_str(&format!(r#"<script src="{}" defer></script>"#, escape_html(src)));
        }
        html.push_str("</body></html>");
        Ok(html)
    }
}

impl DocumentRenderer for HtmlDocument {
    fn render_document(&self, ctx: DocumentContext) -> BoxFuture<'_, Result<String, RenderError>> {
        self.render(ctx).boxed()
    }
}

/// Escape text for HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::context::RequestInfo;
    use crate::hydration::extract_state;
    use crate::render::page::DefaultPageRenderer;
    use crate::routing::table::{RouteDescriptor, RouteTable};
    use crate::view::{PageProps, ViewUnit};
    use serde_json::json;

    fn context(data: Option<Value>, error: Option<ErrorInfo>) -> DocumentContext {
        let routes = RouteTable::new(vec![RouteDescriptor::new(
            "/",
            ViewUnit::plain("home", |_: &PageProps| "<main>home</main>".to_string()),
        )])
        .unwrap();
        DocumentContext {
            title: "Home & Co".into(),
            assets: Assets {
                stylesheet: Some("/static/app.css".into()),
                scripts: vec!["/static/client.js".into()],
            },
            route: None,
            data,
            error,
            render_page: RenderPage::new(
                Arc::new(routes),
                RequestInfo::from_url("/"),
                Arc::new(DefaultPageRenderer),
            ),
        }
    }

    #[tokio::test]
    async fn test_default_document_shell() {
        let html = HtmlDocument::new()
            .render_document(context(Some(json!({"a": 1})), None))
            .await
            .unwrap();

        assert!(html.starts_with("<!doctype html><html><head>"));
        assert!(html.contains("<title>Home &amp; Co</title>"));
        assert!(html.contains(r#"<link rel="stylesheet" href="/static/app.css">"#));
        assert!(html.contains(r#"<div id="root"><main>home</main></div>"#));
        assert!(html.contains(r#"<script src="/static/client.js" defer></script>"#));
        assert!(!html.contains("Whoops!"));
        assert_eq!(extract_state(&html, DEFAULT_STATE_ELEMENT_ID).unwrap(), Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_filter_and_critical_css() {
        let html = HtmlDocument::new()
            .with_filter_server_data(|_| Some(json!({"filtered": true})))
            .with_critical_css(|| Some("body{margin:0}".to_string()))
            .render_document(context(Some(json!({"secret": 1})), None))
            .await
            .unwrap();

        assert!(html.contains("<style>body{margin:0}</style>"));
        assert_eq!(
            extract_state(&html, DEFAULT_STATE_ELEMENT_ID).unwrap(),
            Some(json!({"filtered": true}))
        );
    }

    #[tokio::test]
    async fn test_error_rendered_with_custom_view() {
        let error = ErrorInfo {
            kind: "fetch",
            message: "boom".into(),
            causes: vec![],
        };
        let html = HtmlDocument::new()
            .with_error_view(|e: &ErrorInfo| format!("<pre>{}</pre>", e.message))
            .render_document(context(None, Some(error)))
            .await
            .unwrap();
        assert!(html.contains("<pre>boom</pre>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
