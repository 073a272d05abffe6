//! History events and the history sink.
//!
//! # Responsibilities
//! - Describe one navigation observed from the history stack
//! - Abstract over whatever owns the real history (browser, test double)

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::routing::location::Location;

/// How a navigation reached the history stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Push,
    Replace,
    Pop,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Push => "PUSH",
            Action::Replace => "REPLACE",
            Action::Pop => "POP",
        };
        f.write_str(label)
    }
}

/// A location change observed from history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    pub location: Location,
    pub action: Action,
}

impl HistoryEvent {
    pub fn new(location: Location, action: Action) -> Self {
        Self { location, action }
    }

    pub fn push(href: &str) -> Self {
        Self::new(Location::parse(href), Action::Push)
    }

    pub fn replace(href: &str) -> Self {
        Self::new(Location::parse(href), Action::Replace)
    }

    pub fn pop(href: &str) -> Self {
        Self::new(Location::parse(href), Action::Pop)
    }
}

/// Receives locations the coordinator committed through programmatic
/// navigation.
///
/// The sink usually echoes the location back as a [`HistoryEvent`]; the
/// coordinator ignores events for the location it already shows.
pub trait HistorySink: Send + Sync {
    fn push(&self, location: &Location);
    fn replace(&self, location: &Location);
}

/// In-memory history stack.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<(Action, Location)>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write, oldest first.
    pub fn entries(&self) -> Vec<(Action, Location)> {
        self.entries.lock().clone()
    }

    pub fn last(&self) -> Option<(Action, Location)> {
        self.entries.lock().last().cloned()
    }
}

impl HistorySink for MemoryHistory {
    fn push(&self, location: &Location) {
        self.entries.lock().push((Action::Push, location.clone()));
    }

    fn replace(&self, location: &Location) {
        self.entries.lock().push((Action::Replace, location.clone()));
    }
}
