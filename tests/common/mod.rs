//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use universal_render::config::{RenderServerConfig, RouteConfig};
use universal_render::data::BoxError;
use universal_render::lifecycle::Shutdown;
use universal_render::view::{PageProps, ViewRegistry, ViewUnit};
use universal_render::{FetchContext, RenderServer};

/// A render server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<RenderServerConfig>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server for `config` on 127.0.0.1 with a random port.
pub async fn spawn_server(config: RenderServerConfig, registry: ViewRegistry) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = RenderServer::new(&config, registry).unwrap();

    let shutdown = Shutdown::new();
    let (updates, updates_rx) = mpsc::unbounded_channel();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, Some(updates_rx), rx).await.unwrap();
    });

    // Give the server a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    TestServer {
        addr,
        shutdown,
        updates,
    }
}

/// HTTP client that does not follow redirects and ignores proxy settings.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

pub fn route(path: &str, view: &str) -> RouteConfig {
    RouteConfig {
        path: path.to_string(),
        view: view.to_string(),
        ..Default::default()
    }
}

pub fn plain(name: &'static str) -> ViewUnit {
    ViewUnit::plain(name, move |_: &PageProps| format!("<p>{name}</p>"))
}

/// A view that echoes its params and query as data, counting fetches.
pub fn echo(name: &'static str, calls: Arc<AtomicUsize>) -> ViewUnit {
    ViewUnit::data_bound(
        name,
        move |props: &PageProps| {
            format!(
                "<p>{name}:{}</p>",
                props.data.as_ref().map(Value::to_string).unwrap_or_default()
            )
        },
        move |ctx: FetchContext| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(json!({
                    "params": ctx.route_match.as_ref().map(|m| m.params.clone()),
                    "q": ctx.query.get("q"),
                    "request_id": ctx.extension("request_id").is_some(),
                }))
            }
        },
    )
}

/// A view whose fetch always fails with `boom`.
pub fn failing(name: &'static str) -> ViewUnit {
    ViewUnit::data_bound(
        name,
        move |_: &PageProps| format!("<p>{name}</p>"),
        |_: FetchContext| async { Err::<Value, BoxError>("boom".into()) },
    )
}
