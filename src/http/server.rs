//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: every path falls back to the render handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Translate a `RenderOutcome` into exactly one response
//! - Swap in rebuilt route tables when the config file changes
//! - Drain and stop on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{validate_config, ConfigError, RenderServerConfig, TimeoutConfig};
use crate::http::request::RenderRequest;
use crate::render::{Orchestrator, RenderOutcome};
use crate::routing::{RouteTable, RouteTableError};
use crate::view::ViewRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub registry: Arc<ViewRegistry>,
}

/// Failure to assemble a server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routes(#[from] RouteTableError),
}

/// HTTP server for universal rendering.
pub struct RenderServer {
    router: Router,
    state: AppState,
}

impl RenderServer {
    /// Validate `config`, then build the route table from it and the views in `registry`.
    ///
    /// Configs built in code get the same checks as files read by the loader.
    pub fn new(config: &RenderServerConfig, registry: ViewRegistry) -> Result<Self, ServerError> {
        validate_config(config).map_err(ConfigError::Validation)?;
        let routes = RouteTable::from_config(&config.routes, &registry)?;
        let orchestrator = Orchestrator::from_config(routes, &config.render);
        Ok(Self::with_orchestrator(orchestrator, registry, &config.timeouts))
    }

    /// Serve an already assembled orchestrator.
    pub fn with_orchestrator(
        orchestrator: Orchestrator,
        registry: ViewRegistry,
        timeouts: &TimeoutConfig,
    ) -> Self {
        let state = AppState {
            orchestrator,
            registry: Arc::new(registry),
        };
        let router = Self::build_router(timeouts, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
        Router::new()
            .fallback(render_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.state.orchestrator
    }

    /// Run the server on `listener` until `shutdown` fires.
    ///
    /// Each config received on `config_updates` rebuilds the route table.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: Option<mpsc::UnboundedReceiver<RenderServerConfig>>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(updates) = config_updates {
            tokio::spawn(reload_routes(self.state.clone(), updates, shutdown.resubscribe()));
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Render any path.
async fn render_handler(
    State(state): State<AppState>,
    method: Method,
    request: RenderRequest,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET, HEAD")]).into_response();
    }

    let extensions = request.extensions();
    let path = request.info.path.clone();
    match state.orchestrator.render_with(request.info, extensions).await {
        Ok(RenderOutcome::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Ok(RenderOutcome::Redirect { status, location }) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::MOVED_PERMANENTLY);
            (status, [(header::LOCATION, location)]).into_response()
        }
        Ok(RenderOutcome::Page { html }) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn reload_routes(
    state: AppState,
    mut updates: mpsc::UnboundedReceiver<RenderServerConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                if let Err(errors) = validate_config(&config) {
                    let e = ConfigError::Validation(errors);
                    tracing::error!(error = %e, "Reloaded config rejected, keeping current table");
                    continue;
                }
                match RouteTable::from_config(&config.routes, &state.registry) {
                    Ok(routes) => state.orchestrator.replace_routes(routes),
                    Err(e) => tracing::error!(error = %e, "Reloaded routes rejected, keeping current table"),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Route reloader stopped");
}
