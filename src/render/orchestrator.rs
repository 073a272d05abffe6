//! Server render orchestration.
//!
//! # Responsibilities
//! - Fetch initial data for the request path
//! - Decide between not found, redirect and page
//! - Convert initial-data failures into error data for the document
//!
//! # Design Decisions
//! - Terminal on the first applicable branch
//! - A failed fetch skips the not-found and redirect checks and renders the
//!   page with the error, so the request still completes
//! - The route table can be swapped while requests are in flight; each
//!   request keeps the table it started with

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use serde_json::{Map, Value};

use crate::config::RenderConfig;
use crate::data::context::{FetchContext, RequestInfo};
use crate::data::fetcher::{DataFetcher, RouteData};
use crate::observability::metrics;
use crate::render::document::{Assets, DocumentContext, DocumentRenderer, HtmlDocument};
use crate::render::error_view::ErrorInfo;
use crate::render::page::{DefaultPageRenderer, PageRenderer, RenderPage};
use crate::render::RenderError;
use crate::routing::matcher::MatchResult;
use crate::routing::table::RouteTable;

/// Redirect status used for `redirect_to` routes.
pub const REDIRECT_STATUS: u16 = 301;

/// The single response decision for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    NotFound,
    Redirect { status: u16, location: String },
    Page { html: String },
}

impl RenderOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RenderOutcome::NotFound => "not_found",
            RenderOutcome::Redirect { .. } => "redirect",
            RenderOutcome::Page { .. } => "page",
        }
    }
}

/// Runs the server render sequence.
#[derive(Clone)]
pub struct Orchestrator {
    routes: Arc<ArcSwap<RouteTable>>,
    fetcher: DataFetcher,
    document: Arc<dyn DocumentRenderer>,
    page: Arc<dyn PageRenderer>,
    title: String,
    assets: Assets,
}

impl Orchestrator {
    pub fn new(routes: impl Into<Arc<RouteTable>>) -> Self {
        Self {
            routes: Arc::new(ArcSwap::new(routes.into())),
            fetcher: DataFetcher::new(),
            document: Arc::new(HtmlDocument::default()),
            page: Arc::new(DefaultPageRenderer),
            title: String::new(),
            assets: Assets::default(),
        }
    }

    /// Orchestrator set up from the `[render]` section.
    pub fn from_config(routes: RouteTable, config: &RenderConfig) -> Self {
        let mut fetcher = DataFetcher::new();
        if let Some(ms) = config.fetch_timeout_ms {
            fetcher = fetcher.with_timeout(Duration::from_millis(ms));
        }
        Self {
            fetcher,
            document: Arc::new(HtmlDocument::from_config(config)),
            title: config.title.clone(),
            assets: Assets {
                stylesheet: config.stylesheet.clone(),
                scripts: config.scripts.clone(),
            },
            ..Self::new(routes)
        }
    }

    pub fn with_document(mut self, document: impl DocumentRenderer + 'static) -> Self {
        self.document = Arc::new(document);
        self
    }

    pub fn with_page_renderer(mut self, page: impl PageRenderer + 'static) -> Self {
        self.page = Arc::new(page);
        self
    }

    pub fn with_fetcher(mut self, fetcher: DataFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_assets(mut self, assets: Assets) -> Self {
        self.assets = assets;
        self
    }

    pub fn routes(&self) -> Arc<RouteTable> {
        self.routes.load_full()
    }

    /// Swap in a new route table for subsequent requests.
    pub fn replace_routes(&self, routes: impl Into<Arc<RouteTable>>) {
        let routes = routes.into();
        tracing::info!(routes = routes.len(), "Route table replaced");
        self.routes.store(routes);
    }

    pub async fn render(&self, request: RequestInfo) -> Result<RenderOutcome, RenderError> {
        self.render_with(request, Map::new()).await
    }

    /// Render `request`, passing `extensions` to initial-data capabilities.
    pub async fn render_with(
        &self,
        request: RequestInfo,
        extensions: Map<String, Value>,
    ) -> Result<RenderOutcome, RenderError> {
        let started = Instant::now();
        let result = self.run(request, extensions).await;
        match &result {
            Ok(outcome) => metrics::record_render(outcome.label(), started),
            Err(e) => {
                tracing::error!(error = %e, "Server render failed");
                metrics::record_render("error", started);
            }
        }
        result
    }

    async fn run(
        &self,
        request: RequestInfo,
        extensions: Map<String, Value>,
    ) -> Result<RenderOutcome, RenderError> {
        let routes = self.routes.load_full();
        let ctx = FetchContext::server(request.clone()).with_extensions(extensions);

        let (route, data, error) = match self
            .fetcher
            .fetch_initial_props_from_route(&routes, &request.path, ctx)
            .await
        {
            Ok(RouteData { route, data }) => (route, data, None),
            Err(e) => {
                tracing::error!(
                    path = %request.path,
                    error = %e,
                    "There was an error while loading the initial props"
                );
                (None, None, Some(ErrorInfo::from(&e)))
            }
        };

        if let Some(route_match) = &route {
            if route_match.is_catch_all() {
                tracing::debug!(path = %request.path, "Catch-all route matched, not found");
                return Ok(RenderOutcome::NotFound);
            }
            if let Some(target) = &route_match.route.redirect_to {
                let location = redirect_location(&request.original_url, route_match, target);
                tracing::debug!(path = %request.path, location = %location, "Redirecting");
                return Ok(RenderOutcome::Redirect {
                    status: REDIRECT_STATUS,
                    location,
                });
            }
        }

        let render_page = RenderPage::new(routes, request, self.page.clone());
        let html = self
            .document
            .render_document(DocumentContext {
                title: self.title.clone(),
                assets: self.assets.clone(),
                route,
                data,
                error,
                render_page,
            })
            .await?;
        Ok(RenderOutcome::Page { html })
    }
}

/// `original_url` with the matched part of its path replaced by `target`.
///
/// `:name` segments of `target` take the matched parameter values. Scheme,
/// host, query and fragment are kept.
pub fn redirect_location(original_url: &str, route_match: &MatchResult, target: &str) -> String {
    let target = substitute_params(target, &route_match.params);

    if let Ok(mut url) = url::Url::parse(original_url) {
        let path = replace_matched(url.path(), &route_match.url, &target);
        url.set_path(&path);
        return url.to_string();
    }

    let split = original_url
        .find(|c| c == '?' || c == '#')
        .unwrap_or(original_url.len());
    let (path, suffix) = original_url.split_at(split);
    format!("{}{}", replace_matched(path, &route_match.url, &target), suffix)
}

fn replace_matched(path: &str, matched: &str, target: &str) -> String {
    let rest = path.get(matched.len()..).unwrap_or_default();
    if rest.is_empty() {
        return target.to_string();
    }
    match (target.ends_with('/'), rest.starts_with('/')) {
        (true, true) => format!("{}{}", target, &rest[1..]),
        (false, false) => format!("{}/{}", target, rest),
        _ => format!("{}{}", target, rest),
    }
}

fn substitute_params(target: &str, params: &BTreeMap<String, String>) -> String {
    let mut segments = Vec::new();
    for segment in target.split('/') {
        let Some(token) = segment.strip_prefix(':') else {
            segments.push(segment.to_string());
            continue;
        };
        let name = token.trim_end_matches(['?', '*', '+']);
        match params.get(name) {
            Some(value) => segments.push(value.clone()),
            None if token.ends_with(['?', '*']) => {}
            None => segments.push(segment.to_string()),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::BoxError;
    use crate::hydration::{extract_state, DEFAULT_STATE_ELEMENT_ID};
    use crate::routing::table::RouteDescriptor;
    use crate::view::{PageProps, ViewUnit};
    use serde_json::json;

    fn plain(name: &'static str) -> ViewUnit {
        ViewUnit::plain(name, move |_: &PageProps| format!("<p>{name}</p>"))
    }

    fn table(routes: Vec<RouteDescriptor>) -> RouteTable {
        RouteTable::new(routes).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_replaces_matched_portion() {
        let orchestrator = Orchestrator::new(table(vec![
            RouteDescriptor::new("/a", plain("a")).redirect_to("/b"),
        ]));
        let outcome = orchestrator.render(RequestInfo::from_url("http://x/a")).await.unwrap();
        assert_eq!(
            outcome,
            RenderOutcome::Redirect {
                status: 301,
                location: "http://x/b".into()
            }
        );
    }

    #[tokio::test]
    async fn test_catch_all_is_not_found() {
        let orchestrator = Orchestrator::new(table(vec![
            RouteDescriptor::new("/", plain("home")).exact(),
            RouteDescriptor::not_found(plain("missing")),
        ]));
        let outcome = orchestrator.render(RequestInfo::from_url("/nope")).await.unwrap();
        assert_eq!(outcome, RenderOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_error_renders_error_view() {
        let broken = ViewUnit::data_bound("broken", |_: &PageProps| "<p>page</p>".to_string(), |_: crate::data::FetchContext| async {
            Err::<Value, BoxError>("boom".into())
        });
        let orchestrator = Orchestrator::new(table(vec![RouteDescriptor::new("/", broken)]));

        let outcome = orchestrator.render(RequestInfo::from_url("/")).await.unwrap();
        let RenderOutcome::Page { html } = outcome else {
            panic!("expected a page");
        };
        assert!(html.contains("Whoops!"));
        assert!(html.contains("boom"));
        assert!(html.contains("<p>page</p>"));
    }

    #[tokio::test]
    async fn test_page_embeds_rendered_data() {
        let view = ViewUnit::data_bound(
            "user",
            |props: &PageProps| format!("<p>{}</p>", props.data.as_ref().map(|d| d["id"].to_string()).unwrap_or_default()),
            |ctx: crate::data::FetchContext| async move { Ok::<_, BoxError>(json!({"id": ctx.param("id")})) },
        );
        let orchestrator = Orchestrator::new(table(vec![RouteDescriptor::new("/users/:id", view)]))
            .with_title("Users");

        let outcome = orchestrator.render(RequestInfo::from_url("/users/9")).await.unwrap();
        let RenderOutcome::Page { html } = outcome else {
            panic!("expected a page");
        };
        assert!(html.contains("<title>Users</title>"));
        assert!(html.contains(r#"<p>"9"</p>"#));
        assert_eq!(
            extract_state(&html, DEFAULT_STATE_ELEMENT_ID).unwrap(),
            Some(json!({"id": "9"}))
        );
    }

    #[tokio::test]
    async fn test_unmatched_request_renders_empty_page() {
        let orchestrator = Orchestrator::new(table(vec![RouteDescriptor::new("/", plain("home")).exact()]));
        let outcome = orchestrator.render(RequestInfo::from_url("/foo")).await.unwrap();
        assert_eq!(outcome.label(), "page");
    }

    #[tokio::test]
    async fn test_replace_routes_applies_to_next_request() {
        let orchestrator = Orchestrator::new(table(vec![RouteDescriptor::new("/", plain("home")).exact()]));
        orchestrator.replace_routes(table(vec![RouteDescriptor::not_found(plain("missing"))]));
        let outcome = orchestrator.render(RequestInfo::from_url("/")).await.unwrap();
        assert_eq!(outcome, RenderOutcome::NotFound);
    }

    #[test]
    fn test_redirect_substitutes_params_and_keeps_rest() {
        let routes = table(vec![RouteDescriptor::new("/old/:id", plain("old")).redirect_to("/new/:id")]);
        let m = routes.match_path("/old/5/edit").unwrap();
        assert_eq!(
            redirect_location("https://x.test/old/5/edit?tab=1", &m, "/new/:id"),
            "https://x.test/new/5/edit?tab=1"
        );
        assert_eq!(redirect_location("/old/5?x=1", &m, "/new/:id"), "/new/5?x=1");
    }

    #[test]
    fn test_redirect_drops_missing_optional_param() {
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), "1".to_string());
        assert_eq!(substitute_params("/a/:id/:tab?", &params), "/a/1");
        assert_eq!(substitute_params("/a/:missing", &params), "/a/:missing");
    }
}
