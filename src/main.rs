//! Universal render server.
//!
//! Serves server-rendered pages for a route table loaded from TOML, using
//! the built-in demo views.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ──────────────▶ http::server ──▶ render::orchestrator ──▶ data::fetcher
//!                        │                  │                     │
//!                        │                  │                     ▼
//!                        │                  │              routing (match)
//!                        │                  │              view (load, fetch)
//!                        │                  ▼
//!   ◀────────────── 404 / 301 / HTML ◀── render::document (state blob)
//!
//!   config::watcher ──▶ rebuilt RouteTable swapped into the orchestrator
//!   lifecycle ──▶ shutdown broadcast to server and reloader
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use universal_render::config::{load_config, ConfigWatcher, RenderServerConfig, RouteConfig};
use universal_render::data::BoxError;
use universal_render::lifecycle::{spawn_signal_handler, Shutdown};
use universal_render::observability::{logging, metrics};
use universal_render::view::{Component, LazyView, Module, PageProps, ViewRegistry, ViewUnit};
use universal_render::{FetchContext, RenderServer};

#[derive(Debug, Parser)]
#[command(name = "universal-render", version, about = "Universal render server")]
struct Args {
    /// TOML configuration file. Watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => demo_config(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("universal-render v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = RenderServer::new(&config, demo_views())?;

    // Keep the watcher alive for the life of the server.
    let (updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(updates), Some(watcher.run()?))
        }
        None => (None, None),
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    server.run(listener, updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn route(path: &str, view: &str) -> RouteConfig {
    RouteConfig {
        path: path.to_string(),
        view: view.to_string(),
        ..Default::default()
    }
}

fn demo_config() -> RenderServerConfig {
    let mut config = RenderServerConfig::default();
    config.render.title = "universal-render".to_string();
    config.routes = vec![
        RouteConfig {
            exact: true,
            ..route("/", "home")
        },
        route("/users/:id", "user"),
        route("/about", "about"),
        RouteConfig {
            redirect_to: Some("/about".to_string()),
            ..route("/info", "about")
        },
        route("**", "not-found"),
    ];
    config
}

fn demo_views() -> ViewRegistry {
    ViewRegistry::new()
        .with(
            "home",
            ViewUnit::plain("home", |_: &PageProps| "<h1>Home</h1>".to_string()),
        )
        .with(
            "user",
            ViewUnit::data_bound(
                "user",
                |props: &PageProps| {
                    let name = props
                        .data
                        .as_ref()
                        .and_then(|d| d["name"].as_str())
                        .unwrap_or("unknown");
                    format!("<h1>User {name}</h1>")
                },
                |ctx: FetchContext| async move {
                    let id = ctx.param("id").unwrap_or_default().to_string();
                    Ok::<_, BoxError>(json!({ "id": id, "name": format!("user-{id}") }))
                },
            ),
        )
        .with(
            "about",
            ViewUnit::lazy(LazyView::new("about", || async {
                Ok::<_, BoxError>(Module::new(Component::new("about", |_: &PageProps| {
                    "<h1>About</h1>".to_string()
                })))
            })),
        )
        .with(
            "not-found",
            ViewUnit::plain("not-found", |_: &PageProps| "<h1>Not found</h1>".to_string()),
        )
}
