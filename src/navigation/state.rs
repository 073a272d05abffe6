//! Navigation state.
//!
//! # Responsibilities
//! - Hold the committed location and the per-path data cache
//! - Track the one pending navigation and its generation
//! - Describe what the view layer renders and what it may show while fetching
//!
//! # Design Decisions
//! - The cache only accumulates; entries are never evicted
//! - A failed entry is a miss, so the path is fetched again next time
//! - Generations increase on every observed navigation; only the newest may commit

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::navigation::history::Action;
use crate::routing::location::Location;
use crate::routing::matcher::MatchResult;
use crate::view::PageProps;

/// Cached initial data for one pathname.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// Data was fetched; `None` when the view produced none.
    Loaded(Option<Value>),
    /// The fetch failed. The view rendered without data.
    Failed,
}

impl CacheEntry {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheEntry::Loaded(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            CacheEntry::Loaded(data) => data.as_ref(),
            CacheEntry::Failed => None,
        }
    }
}

/// The navigation waiting on its data.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingNavigation {
    pub location: Location,
    pub action: Action,
    pub generation: u64,
}

/// Coordinator bookkeeping.
#[derive(Debug)]
pub struct NavigationState {
    pub current_location: Arc<Location>,
    pub data_by_path: HashMap<String, CacheEntry>,
    pub pending: Option<PendingNavigation>,
    pub generation: u64,
}

impl NavigationState {
    /// State seeded with the first rendered location and its data.
    pub fn new(initial: Location, initial_data: Option<Value>) -> Self {
        let mut data_by_path = HashMap::new();
        data_by_path.insert(initial.pathname.clone(), CacheEntry::Loaded(initial_data));
        Self {
            current_location: Arc::new(initial),
            data_by_path,
            pending: None,
            generation: 0,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a new generation, abandoning whatever was pending.
    pub fn advance(&mut self) -> (u64, Option<PendingNavigation>) {
        self.generation += 1;
        (self.generation, self.pending.take())
    }

    /// Whether `generation` is still the navigation allowed to commit.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Cache hit for `pathname`, if any.
    pub fn cached(&self, pathname: &str) -> Option<Option<Value>> {
        match self.data_by_path.get(pathname) {
            Some(CacheEntry::Loaded(data)) => Some(data.clone()),
            _ => None,
        }
    }
}

/// What the view layer renders.
///
/// Published only on commit. Each commit carries a new `location` allocation,
/// so `Arc::ptr_eq` tells a re-render apart from a no-op.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub location: Arc<Location>,
    pub route: Option<MatchResult>,
    pub data: Option<Value>,
}

impl RenderState {
    pub fn props(&self) -> PageProps {
        PageProps {
            data: self.data.clone(),
            params: self
                .route
                .as_ref()
                .map(|m| m.params.clone())
                .unwrap_or_default(),
            query: self.location.query(),
            location: (*self.location).clone(),
        }
    }

    /// Markup of the matched view, when its component is available.
    pub fn render(&self) -> Option<String> {
        let route = self.route.as_ref()?;
        let component = route.view().component()?;
        Some(component.render(&self.props()))
    }

    /// Whether `other` is a different commit.
    pub fn changed_from(&self, other: &RenderState) -> bool {
        !Arc::ptr_eq(&self.location, &other.location)
    }
}

/// Fetch progress, published separately from [`RenderState`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchStatus {
    pub pending: Option<PendingNavigation>,
}

impl FetchStatus {
    pub fn is_fetching(&self) -> bool {
        self.pending.is_some()
    }

    pub fn target(&self) -> Option<&Location> {
        self.pending.as_ref().map(|p| &p.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initial_location_is_cached() {
        let state = NavigationState::new(Location::parse("/a"), Some(json!({"n": 1})));
        assert_eq!(state.cached("/a"), Some(Some(json!({"n": 1}))));
        assert!(state.cached("/b").is_none());
        assert!(!state.is_fetching());
    }

    #[test]
    fn test_failed_entry_is_a_miss() {
        let mut state = NavigationState::new(Location::parse("/"), None);
        state.data_by_path.insert("/b".into(), CacheEntry::Failed);
        assert!(state.cached("/b").is_none());
        assert!(!CacheEntry::Failed.is_hit());
        assert!(CacheEntry::Loaded(None).is_hit());
    }

    #[test]
    fn test_advance_supersedes_pending() {
        let mut state = NavigationState::new(Location::parse("/"), None);
        let (first, _) = state.advance();
        state.pending = Some(PendingNavigation {
            location: Location::parse("/a"),
            action: Action::Push,
            generation: first,
        });
        let (second, abandoned) = state.advance();
        assert!(second > first);
        assert_eq!(abandoned.unwrap().location.pathname, "/a");
        assert!(!state.is_current(first));
        assert!(state.is_current(second));
    }
}
