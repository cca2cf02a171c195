//! Seam to the external coordination service (a ZooKeeper-style hierarchical watch store).
//!
//! Everything above this module only talks to [`CoordinationService`]. The bundled
//! [`MemCoordinator`] keeps the whole tree in process and is what tests and embedded
//! deployments run against.

mod mem_coordinator;
pub use mem_coordinator::*;


use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::CoordinationError;

/// Kind of change reported for one child of a watched path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEventKind {
    Added,
    Updated,
    Removed,
}

/// One child change, addressed by the child's full path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEvent {
    pub kind: PathEventKind,
    pub path: String,
}

impl PathEvent {
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            kind: PathEventKind::Added,
            path: path.into(),
        }
    }

    pub fn updated(path: impl Into<String>) -> Self {
        Self {
            kind: PathEventKind::Updated,
            path: path.into(),
        }
    }

    pub fn removed(path: impl Into<String>) -> Self {
        Self {
            kind: PathEventKind::Removed,
            path: path.into(),
        }
    }
}

/// Child node snapshot: full path plus raw (possibly compressed) payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildData {
    pub path: String,
    pub data: Bytes,
}

/// An open children watch.
///
/// Holds the children present when the watch was registered and the stream of later
/// changes. Dropping it releases the watch on the service side.
pub struct ChildrenWatch {
    pub initial: Vec<ChildData>,
    pub events: mpsc::UnboundedReceiver<PathEvent>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ChildrenWatch {
    pub fn new(
        initial: Vec<ChildData>,
        events: mpsc::UnboundedReceiver<PathEvent>,
    ) -> Self {
        Self {
            initial,
            events,
            release: None,
        }
    }

    /// Attaches a callback run exactly once when the watch is dropped
    pub fn on_release<F>(
        mut self,
        release: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }
}

impl Debug for ChildrenWatch {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ChildrenWatch")
            .field("initial", &self.initial.len())
            .finish_non_exhaustive()
    }
}

impl Drop for ChildrenWatch {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Client side of the coordination service
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CoordinationService: Send + Sync + 'static {
    /// Opens the session
    async fn connect(
        &self,
        hosts: &str,
        session_timeout: Duration,
    ) -> std::result::Result<(), CoordinationError>;

    async fn get_data(
        &self,
        path: &str,
    ) -> std::result::Result<Bytes, CoordinationError>;

    /// Child names (not full paths)
    async fn get_children(
        &self,
        path: &str,
    ) -> std::result::Result<Vec<String>, CoordinationError>;

    /// Creates or overwrites a node, creating missing parents
    async fn set_data(
        &self,
        path: &str,
        data: Bytes,
    ) -> std::result::Result<(), CoordinationError>;

    /// Deletes a node and everything below it
    async fn delete(
        &self,
        path: &str,
    ) -> std::result::Result<(), CoordinationError>;

    async fn watch_children(
        &self,
        path: &str,
    ) -> std::result::Result<ChildrenWatch, CoordinationError>;
}
