//! Client navigation subsystem.
//!
//! # Data Flow
//! ```text
//! History event (push / replace / pop) or programmatic push/replace
//!     → coordinator.rs (match target, check cache)
//!         hit  → commit now
//!         miss → Fetching: data fetcher on its own task
//!                → generation still current? commit : keep data, discard
//!     → state.rs (committed location, data cache, pending navigation)
//!     → watch channels: RenderState (commits only), FetchStatus
//!     → history.rs sink (programmatic navigations, after commit)
//! ```
//!
//! # Design Decisions
//! - Framework independent: the view layer subscribes, it does not drive
//! - Cooperative staleness check instead of cancelling fetches

pub mod coordinator;
pub mod history;
pub mod state;

pub use coordinator::{NavigationCoordinator, Settled, Transition};
pub use history::{Action, HistoryEvent, HistorySink, MemoryHistory};
pub use state::{CacheEntry, FetchStatus, NavigationState, PendingNavigation, RenderState};
