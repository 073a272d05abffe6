//! Initial-data fetching.
//!
//! # Responsibilities
//! - Invoke a view's initial-data capability for a match
//! - Load lazy views before fetching
//! - Bound every fetch by the configured deadline
//! - Log and report failures to the caller
//!
//! # Design Decisions
//! - No match or no capability resolves to `None` without touching the view
//! - The fresh match always overwrites whatever the context carried
//! - Errors are logged where they happen and still returned; recovery is
//!   the caller's decision

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::data::context::FetchContext;
use crate::data::error::FetchError;
use crate::observability::metrics;
use crate::routing::matcher::MatchResult;
use crate::routing::table::RouteTable;
use crate::view::ViewUnit;

/// Matched route plus its initial data.
///
/// Both fields are `None` when nothing matched.
#[derive(Debug, Clone, Default)]
pub struct RouteData {
    pub route: Option<MatchResult>,
    pub data: Option<Value>,
}

/// Runs initial-data capabilities.
#[derive(Debug, Clone, Default)]
pub struct DataFetcher {
    timeout: Option<Duration>,
}

impl DataFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail fetches that take longer than `timeout` (load included).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Fetch initial data for `view` under `route_match`.
    pub async fn fetch_initial_data(
        &self,
        view: &ViewUnit,
        route_match: Option<&MatchResult>,
        ctx: FetchContext,
    ) -> Result<Option<Value>, FetchError> {
        let Some(route_match) = route_match else {
            return Ok(None);
        };
        if !view.has_initial_data() {
            return Ok(None);
        }

        let ctx = ctx.with_match(route_match.clone());
        let started = Instant::now();
        let result = self.run(view, ctx).await;

        match &result {
            Ok(_) => {
                tracing::debug!(
                    view = %view.name(),
                    path = %route_match.url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Initial data fetched"
                );
                metrics::record_fetch("ok", started);
            }
            Err(e) => {
                tracing::error!(
                    view = %view.name(),
                    path = %route_match.url,
                    error = %e,
                    "There was an error while trying to retrieve the initial data"
                );
                metrics::record_fetch(e.kind(), started);
            }
        }
        result
    }

    /// Match `pathname` in `routes` and fetch the matched view's initial data.
    pub async fn fetch_initial_props_from_route(
        &self,
        routes: &RouteTable,
        pathname: &str,
        ctx: FetchContext,
    ) -> Result<RouteData, FetchError> {
        let Some(route_match) = routes.match_path(pathname) else {
            tracing::debug!(pathname, "No route matched, no initial data");
            return Ok(RouteData::default());
        };

        let view = route_match.view().clone();
        let data = self.fetch_initial_data(&view, Some(&route_match), ctx).await?;
        Ok(RouteData {
            route: Some(route_match),
            data,
        })
    }

    async fn run(&self, view: &ViewUnit, ctx: FetchContext) -> Result<Option<Value>, FetchError> {
        let work = async {
            let component = view.load().await?;
            match component.initial_data() {
                Some(capability) => capability
                    .fetch_initial_data(ctx)
                    .await
                    .map(Some)
                    .map_err(|e| FetchError::fetch(view.name(), e)),
                None => {
                    tracing::warn!(
                        view = %view.name(),
                        "View declared initial data but its component has none"
                    );
                    Ok(None)
                }
            }
        };

        match self.timeout {
            Some(after) => tokio::time::timeout(after, work)
                .await
                .map_err(|_| FetchError::Timeout {
                    view: view.name().to_string(),
                    after,
                })?,
            None => work.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::context::{Environment, RequestInfo};
    use crate::data::error::BoxError;
    use crate::routing::location::Location;
    use crate::routing::table::RouteDescriptor;
    use crate::view::{Component, LazyView, Module, PageProps};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn render(_: &PageProps) -> String {
        "<span></span>".to_string()
    }

    fn counting_view(name: &'static str, calls: Arc<AtomicUsize>) -> ViewUnit {
        ViewUnit::data_bound(name, render, move |ctx: FetchContext| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(json!({
                    "id": ctx.param("id"),
                    "q": ctx.query.get("q"),
                }))
            }
        })
    }

    #[tokio::test]
    async fn test_no_match_yields_empty_route_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let routes =
            RouteTable::new(vec![RouteDescriptor::new("/", counting_view("home", calls.clone())).exact()])
                .unwrap();

        let result = DataFetcher::new()
            .fetch_initial_props_from_route(&routes, "/foo", FetchContext::client(Location::parse("/foo")))
            .await
            .unwrap();

        assert!(result.route.is_none());
        assert!(result.data.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_plain_view_resolves_to_none() {
        let routes = RouteTable::new(vec![RouteDescriptor::new("/", ViewUnit::plain("home", render))]).unwrap();
        let result = DataFetcher::new()
            .fetch_initial_props_from_route(&routes, "/", FetchContext::client(Location::parse("/")))
            .await
            .unwrap();
        assert!(result.route.is_some());
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn test_missing_match_skips_capability() {
        let calls = Arc::new(AtomicUsize::new(0));
        let view = counting_view("home", calls.clone());
        let data = DataFetcher::new()
            .fetch_initial_data(&view, None, FetchContext::client(Location::parse("/")))
            .await
            .unwrap();
        assert!(data.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_receives_fresh_match_and_query() {
        let calls = Arc::new(AtomicUsize::new(0));
        let routes = RouteTable::new(vec![
            RouteDescriptor::new("/other", ViewUnit::plain("other", render)),
            RouteDescriptor::new("/users/:id", counting_view("user", calls.clone())),
        ])
        .unwrap();

        // The context arrives carrying a stale match for another route.
        let stale = routes.match_path("/other").unwrap();
        let mut ctx = FetchContext::server(RequestInfo::from_url("https://test.com/users/42?q=rust"));
        ctx.route_match = Some(stale);

        let result = DataFetcher::new()
            .fetch_initial_props_from_route(&routes, "/users/42", ctx)
            .await
            .unwrap();

        assert_eq!(result.route.unwrap().param("id"), Some("42"));
        assert_eq!(result.data, Some(json!({"id": "42", "q": "rust"})));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lazy_view_loads_before_fetch() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let lazy = LazyView::new("lazy", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let component = Component::new("lazy", render).with_initial_data(|_: FetchContext| async {
                    Ok::<_, BoxError>(json!({"loaded": true}))
                });
                Ok::<_, BoxError>(Module::new(component))
            }
        })
        .with_initial_data();
        let view = ViewUnit::lazy(lazy);
        let routes = RouteTable::new(vec![RouteDescriptor::new("/", view.clone())]).unwrap();

        let fetcher = DataFetcher::new();
        for _ in 0..2 {
            let result = fetcher
                .fetch_initial_props_from_route(&routes, "/", FetchContext::client(Location::parse("/")))
                .await
                .unwrap();
            assert_eq!(result.data, Some(json!({"loaded": true})));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(view.is_ready());
    }

    #[tokio::test]
    async fn test_lazy_view_without_data_is_not_loaded() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let view = ViewUnit::lazy(LazyView::new("lazy", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BoxError>(Module::new(Component::new("lazy", render))) }
        }));
        let routes = RouteTable::new(vec![RouteDescriptor::new("/", view.clone())]).unwrap();

        let result = DataFetcher::new()
            .fetch_initial_props_from_route(&routes, "/", FetchContext::client(Location::parse("/")))
            .await
            .unwrap();
        assert!(result.data.is_none());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(!view.is_ready());
    }

    #[tokio::test]
    async fn test_fetch_error_is_returned() {
        let view = ViewUnit::data_bound("broken", render, |_: FetchContext| async {
            Err::<Value, BoxError>("boom".into())
        });
        let routes = RouteTable::new(vec![RouteDescriptor::new("/", view)]).unwrap();

        let err = DataFetcher::new()
            .fetch_initial_props_from_route(&routes, "/", FetchContext::client(Location::parse("/")))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Fetch { .. }));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_load_error_uses_same_channel() {
        let view = ViewUnit::lazy(
            LazyView::new("chunk", || async { Err::<Module, BoxError>("chunk missing".into()) })
                .with_initial_data(),
        );
        let routes = RouteTable::new(vec![RouteDescriptor::new("/", view)]).unwrap();

        let err = DataFetcher::new()
            .fetch_initial_props_from_route(&routes, "/", FetchContext::client(Location::parse("/")))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Load(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fetch_times_out() {
        let view = ViewUnit::data_bound("slow", render, |_: FetchContext| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BoxError>(Value::Null)
        });
        let routes = RouteTable::new(vec![RouteDescriptor::new("/", view)]).unwrap();

        let err = DataFetcher::new()
            .with_timeout(Duration::from_secs(1))
            .fetch_initial_props_from_route(&routes, "/", FetchContext::client(Location::parse("/")))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));
    }

    #[test]
    fn test_environment_is_explicit() {
        let ctx = FetchContext::server(RequestInfo::from_url("/"));
        assert_eq!(ctx.environment, Environment::Server);
    }
}
