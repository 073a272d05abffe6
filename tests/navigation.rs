//! Server render followed by client hydration and navigation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{broadcast, mpsc};

use universal_render::config::RenderServerConfig;
use universal_render::hydration::Hydration;
use universal_render::navigation::{HistoryEvent, Settled, Transition};
use universal_render::routing::{RouteDescriptor, RouteTable};
use universal_render::view::ViewRegistry;
use universal_render::{Location, RenderOutcome, RequestInfo};

mod common;

fn routes(calls: &Arc<AtomicUsize>) -> Arc<RouteTable> {
    Arc::new(
        RouteTable::new(vec![
            RouteDescriptor::new("/", common::plain("home")).exact(),
            RouteDescriptor::new("/users/:id", common::echo("user", calls.clone())),
        ])
        .unwrap(),
    )
}

#[tokio::test]
async fn test_server_data_seeds_client_without_refetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let routes = routes(&calls);

    let orchestrator = universal_render::Orchestrator::new(routes.clone());
    let RenderOutcome::Page { html } = orchestrator
        .render(RequestInfo::from_url("/users/1?q=a"))
        .await
        .unwrap()
    else {
        panic!("expected a page");
    };
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let nav = Hydration::default()
        .bootstrap(routes, Location::parse("/users/1?q=a"), &html)
        .await
        .unwrap();
    let seeded = nav.snapshot().data.unwrap();
    assert_eq!(seeded["params"], json!({"id": "1"}));
    assert_eq!(seeded["q"], "a");

    // Away and back: the seeded entry is a cache hit.
    assert!(matches!(nav.handle(HistoryEvent::push("/")), Transition::Committed));
    assert!(matches!(nav.handle(HistoryEvent::pop("/users/1?q=a")), Transition::Committed));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A new user is fetched on the client, with the client query.
    let transition = nav.handle(HistoryEvent::push("/users/2?q=b"));
    assert_eq!(transition.settled().await, Settled::Committed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let data = nav.snapshot().data.unwrap();
    assert_eq!(data["params"], json!({"id": "2"}));
    assert_eq!(data["q"], "b");
}

#[tokio::test]
async fn test_served_page_hydrates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut config = RenderServerConfig::default();
    config.routes = vec![common::route("/users/:id", "user")];
    let registry = ViewRegistry::new().with("user", common::echo("user", calls.clone()));
    let server = common::spawn_server(config, registry).await;

    let html = common::client()
        .get(server.url("/users/5"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let nav = Hydration::default()
        .bootstrap(routes(&calls), Location::parse("/users/5"), &html)
        .await
        .unwrap();
    assert_eq!(nav.snapshot().data.unwrap()["params"], json!({"id": "5"}));
    assert_eq!(nav.snapshot().render().unwrap(), format!("<p>user:{}</p>", nav.snapshot().data.unwrap()));
}

#[tokio::test]
async fn test_event_loop_follows_history() {
    let calls = Arc::new(AtomicUsize::new(0));
    let nav = universal_render::NavigationCoordinator::new(routes(&calls), Location::parse("/"), None);
    let mut render_rx = nav.subscribe();

    let (events_tx, events_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(nav.clone().run(events_rx, shutdown_rx));

    events_tx.send(HistoryEvent::push("/users/3")).await.unwrap();
    render_rx.changed().await.unwrap();
    assert_eq!(render_rx.borrow().location.pathname, "/users/3");

    events_tx.send(HistoryEvent::pop("/")).await.unwrap();
    render_rx.changed().await.unwrap();
    assert_eq!(render_rx.borrow().location.pathname, "/");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
}
