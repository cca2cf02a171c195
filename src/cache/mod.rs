//! Locally mirrored children of one coordination-service path.
//!
//! ```text
//!   UNSTARTED --start(mode)--> STARTED --close()--> CLOSED
//!       |                                             ^
//!       +-------------------close()-------------------+
//! ```
//!
//! While STARTED, a dedicated task on the supplied runtime keeps the mirror in sync and
//! hands [`CacheEvent`]s to the registered [`PathListener`] one at a time, so events of one
//! cache are observed in the order the coordination service produced them. Different caches
//! run concurrently.

mod path_cache;
pub use path_cache::*;


use async_trait::async_trait;
use bytes::Bytes;

use crate::ChildData;

/// How the initial children are surfaced when a cache starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Load initial children into the mirror without emitting events
    SilentBuild,
    /// Emit one [`CacheEvent::Added`] per initial child
    PostInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Unstarted,
    Started,
    Closed,
}

/// Child change delivered to listeners.
///
/// Carries the child's mirrored (decompressed) payload: for `Removed` that is the last
/// payload seen before the node disappeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Added(ChildData),
    Removed(ChildData),
}

impl CacheEvent {
    pub fn path(&self) -> &str {
        &self.child().path
    }

    pub fn data(&self) -> &Bytes {
        &self.child().data
    }

    pub fn child(&self) -> &ChildData {
        match self {
            CacheEvent::Added(child) | CacheEvent::Removed(child) => child,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, CacheEvent::Added(_))
    }
}

/// Receiver of cache events. Implementations must not fail and must not block for long:
/// they run on the shared dispatch pool.
#[async_trait]
pub trait PathListener: Send + Sync + 'static {
    async fn on_event(
        &self,
        event: CacheEvent,
    );
}
