//! Client-side navigation coordinator.
//!
//! # Responsibilities
//! - Observe history events and decide between cache hit and fetch
//! - Commit a location only once its data entry exists
//! - Discard results of navigations that were superseded
//! - Publish committed render state and fetch status on separate channels
//!
//! # Design Decisions
//! - Last navigation wins through a generation counter; stale fetches run to
//!   completion but cannot commit
//! - A stale success fills an empty or failed cache entry; a stale failure
//!   is dropped
//! - Push and replace events for the shown location are echoes and change
//!   nothing; a pop back to it abandons the pending navigation
//! - Failures commit with no data so the view never waits forever
//! - The state lock is never held across an await

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use parking_lot::Mutex;

use crate::data::context::FetchContext;
use crate::data::fetcher::DataFetcher;
use crate::navigation::history::{Action, HistoryEvent, HistorySink};
use crate::navigation::state::{
    CacheEntry, FetchStatus, NavigationState, PendingNavigation, RenderState,
};
use crate::observability::metrics;
use crate::routing::location::Location;
use crate::routing::matcher::{match_route, MatchResult};
use crate::routing::table::RouteTable;

/// What handling an event did right away.
#[derive(Debug)]
pub enum Transition {
    /// The event targets the location already shown.
    Unchanged,
    /// Committed without fetching (cache hit, no data needed, or no match).
    Committed,
    /// A fetch is running; the handle resolves when it settles.
    Fetching(JoinHandle<Settled>),
}

impl Transition {
    /// Wait for the navigation to settle.
    pub async fn settled(self) -> Settled {
        match self {
            Transition::Unchanged => Settled::Unchanged,
            Transition::Committed => Settled::Committed,
            Transition::Fetching(handle) => match handle.await {
                Ok(settled) => settled,
                Err(e) => {
                    tracing::error!(error = %e, "Navigation task failed");
                    Settled::Aborted
                }
            },
        }
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, Transition::Fetching(_))
    }
}

/// How a navigation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Unchanged,
    Committed,
    /// A newer navigation took over before the data arrived.
    Superseded,
    Aborted,
}

struct Shared {
    state: Mutex<NavigationState>,
    render_tx: watch::Sender<RenderState>,
    status_tx: watch::Sender<FetchStatus>,
}

/// Drives navigation for one client session.
#[derive(Clone)]
pub struct NavigationCoordinator {
    routes: Arc<RouteTable>,
    fetcher: DataFetcher,
    history: Option<Arc<dyn HistorySink>>,
    extensions: Map<String, Value>,
    shared: Arc<Shared>,
}

impl NavigationCoordinator {
    /// Start at `initial`, seeding the cache with the data it was rendered with.
    pub fn new(routes: Arc<RouteTable>, initial: Location, initial_data: Option<Value>) -> Self {
        let initial = match initial.key {
            Some(_) => initial,
            None => initial.with_fresh_key(),
        };
        let route = match_route(&initial.pathname, &routes);
        let state = NavigationState::new(initial, initial_data.clone());

        let (render_tx, _) = watch::channel(RenderState {
            location: state.current_location.clone(),
            route,
            data: initial_data,
        });
        let (status_tx, _) = watch::channel(FetchStatus::default());

        Self {
            routes,
            fetcher: DataFetcher::new(),
            history: None,
            extensions: Map::new(),
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                render_tx,
                status_tx,
            }),
        }
    }

    pub fn with_fetcher(mut self, fetcher: DataFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Where programmatic navigations are written after they commit.
    pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = Some(history);
        self
    }

    /// Values added to every fetch context.
    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Committed render state. Changes only on commit.
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.shared.render_tx.subscribe()
    }

    /// Fetch progress.
    pub fn status(&self) -> watch::Receiver<FetchStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn snapshot(&self) -> RenderState {
        self.shared.render_tx.borrow().clone()
    }

    pub fn current_location(&self) -> Arc<Location> {
        self.shared.state.lock().current_location.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.shared.state.lock().is_fetching()
    }

    pub fn cached(&self, pathname: &str) -> Option<CacheEntry> {
        self.shared.state.lock().data_by_path.get(pathname).cloned()
    }

    /// Handle a location change observed from history.
    pub fn handle(&self, event: HistoryEvent) -> Transition {
        self.transition(event, false)
    }

    /// Navigate to `href`, pushing it onto history once committed.
    pub fn push(&self, href: &str) -> Transition {
        self.transition(HistoryEvent::push(href), true)
    }

    /// Navigate to `href`, replacing the current history entry once committed.
    pub fn replace(&self, href: &str) -> Transition {
        self.transition(HistoryEvent::replace(href), true)
    }

    /// Consume history events until the channel closes or shutdown fires.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<HistoryEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!("Navigation coordinator starting");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        // Fetches settle on their own tasks.
                        let _ = self.handle(event);
                    }
                    None => {
                        tracing::info!("History channel closed, navigation coordinator exiting");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Navigation coordinator received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn transition(&self, event: HistoryEvent, write_history: bool) -> Transition {
        let HistoryEvent { location, action } = event;
        let route = match_route(&location.pathname, &self.routes);

        let mut state = self.shared.state.lock();
        // Echoes of the committed location leave a pending navigation alone.
        // A pop back to it abandons the pending one instead.
        if action != Action::Pop && state.current_location.same_target(&location) {
            drop(state);
            tracing::trace!(path = %location.pathname, %action, "Already at location");
            return Transition::Unchanged;
        }

        let (generation, abandoned) = state.advance();
        if let Some(abandoned) = &abandoned {
            if action == Action::Pop {
                tracing::info!(
                    abandoned = %abandoned.location.pathname,
                    path = %location.pathname,
                    generation,
                    "History pop interrupted a pending navigation"
                );
            } else {
                tracing::debug!(
                    superseded = %abandoned.location.pathname,
                    path = %location.pathname,
                    generation,
                    "Pending navigation superseded"
                );
            }
        }

        if state.current_location.same_target(&location) {
            drop(state);
            self.clear_status();
            tracing::trace!(path = %location.pathname, %action, "Already at location");
            return Transition::Unchanged;
        }

        let route_match = match route {
            Some(route_match) => route_match,
            None => {
                tracing::debug!(path = %location.pathname, %action, "No route for navigation target");
                let committed = self.commit(&mut state, location, None, None);
                drop(state);
                metrics::record_commit("unmatched");
                self.write_history(write_history, action, &committed);
                return Transition::Committed;
            }
        };

        let view = route_match.view().clone();
        let cached = state.cached(&location.pathname).or_else(|| {
            (!view.has_initial_data() && view.is_ready()).then_some(None)
        });
        if let Some(data) = cached {
            state
                .data_by_path
                .entry(location.pathname.clone())
                .or_insert_with(|| CacheEntry::Loaded(None));
            tracing::debug!(path = %location.pathname, %action, generation, "Committing without fetch");
            let committed = self.commit(&mut state, location, Some(route_match), data);
            drop(state);
            metrics::record_commit("cached");
            self.write_history(write_history, action, &committed);
            return Transition::Committed;
        }

        let pending = PendingNavigation {
            location: location.clone(),
            action,
            generation,
        };
        state.pending = Some(pending.clone());
        drop(state);
        self.shared.status_tx.send_replace(FetchStatus {
            pending: Some(pending),
        });

        tracing::debug!(path = %location.pathname, %action, generation, "Fetching data for navigation");
        let this = self.clone();
        Transition::Fetching(tokio::spawn(async move {
            this.complete(location, action, route_match, generation, write_history)
                .await
        }))
    }

    async fn complete(
        self,
        location: Location,
        action: Action,
        route_match: MatchResult,
        generation: u64,
        write_history: bool,
    ) -> Settled {
        let view = route_match.view().clone();
        let ctx = FetchContext::client(location.clone()).with_extensions(self.extensions.clone());
        let result = self
            .fetcher
            .fetch_initial_data(&view, Some(&route_match), ctx)
            .await;

        if !view.is_ready() {
            if let Err(e) = view.load().await {
                tracing::warn!(view = %view.name(), error = %e, "View could not be loaded for navigation");
            }
        }

        let pathname = location.pathname.clone();
        let mut state = self.shared.state.lock();
        let current = state.is_current(generation);

        let (data, cause) = match result {
            Ok(data) if !current => {
                // Fill the cache, never clobber data a newer commit wrote.
                let filled = state.data_by_path.get(&pathname).is_some_and(CacheEntry::is_hit);
                if filled {
                    tracing::debug!(path = %pathname, generation, "Newer data already cached, dropping stale result");
                } else {
                    tracing::debug!(path = %pathname, generation, "Navigation superseded, keeping data in cache");
                    state.data_by_path.insert(pathname, CacheEntry::Loaded(data));
                }
                return Settled::Superseded;
            }
            Ok(data) => {
                state
                    .data_by_path
                    .insert(pathname.clone(), CacheEntry::Loaded(data.clone()));
                (data, "fetched")
            }
            Err(_) if !current => {
                tracing::debug!(path = %pathname, generation, "Dropping failure of superseded navigation");
                return Settled::Superseded;
            }
            Err(_) => {
                state.data_by_path.insert(pathname.clone(), CacheEntry::Failed);
                (None, "failed")
            }
        };

        let committed = self.commit(&mut state, location, Some(route_match), data);
        drop(state);
        metrics::record_commit(cause);
        self.write_history(write_history, action, &committed);
        Settled::Committed
    }

    fn commit(
        &self,
        state: &mut NavigationState,
        location: Location,
        route: Option<MatchResult>,
        data: Option<Value>,
    ) -> Arc<Location> {
        let location = match location.key {
            Some(_) => location,
            None => location.with_fresh_key(),
        };
        let location = Arc::new(location);
        state.current_location = location.clone();
        state.pending = None;

        self.shared.render_tx.send_replace(RenderState {
            location: location.clone(),
            route,
            data,
        });
        self.clear_status();
        location
    }

    fn clear_status(&self) {
        self.shared.status_tx.send_if_modified(|status| {
            let was_fetching = status.pending.is_some();
            status.pending = None;
            was_fetching
        });
    }

    fn write_history(&self, enabled: bool, action: Action, location: &Location) {
        let Some(history) = self.history.as_ref().filter(|_| enabled) else {
            return;
        };
        match action {
            Action::Push => history.push(location),
            Action::Replace => history.replace(location),
            Action::Pop => {}
        }
    }
}
