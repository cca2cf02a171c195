//! In-process coordination service.
//!
//! Nodes live in one ordered map guarded by a read/write lock; watchers are grouped by the
//! parent path they observe. Node mutations notify watchers while still holding the write
//! lock, and watch registration snapshots the children under the read lock, so a watcher
//! never misses or double-counts a change that races with its registration.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;

use super::ChildData;
use super::ChildrenWatch;
use super::CoordinationService;
use super::PathEvent;
use crate::utils::path::parent_path;
use crate::CoordinationError;

#[derive(Debug)]
struct WatchSlot {
    id: u64,
    sender: mpsc::UnboundedSender<PathEvent>,
}

#[derive(Debug, Default)]
struct MemInner {
    nodes: RwLock<BTreeMap<String, Bytes>>,

    /// parent path -> watchers of its children
    watchers: DashMap<String, Vec<WatchSlot>>,

    next_watch_id: AtomicU64,

    connect_attempts: AtomicUsize,
    pending_connect_failures: AtomicUsize,

    failing_reads: RwLock<Vec<String>>,
    failing_lists: RwLock<Vec<String>>,
}

/// In-memory [`CoordinationService`]
#[derive(Debug, Clone, Default)]
pub struct MemCoordinator {
    inner: Arc<MemInner>,
}

impl MemCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls to `connect` fail with connection loss
    pub fn fail_next_connects(
        &self,
        n: usize,
    ) {
        self.inner.pending_connect_failures.store(n, Ordering::SeqCst);
    }

    /// Makes `get_data` fail for every path starting with `prefix`
    pub fn fail_reads_under(
        &self,
        prefix: impl Into<String>,
    ) {
        self.inner.failing_reads.write().push(prefix.into());
    }

    /// Makes `get_children` and `watch_children` fail for every path starting with `prefix`
    pub fn fail_lists_under(
        &self,
        prefix: impl Into<String>,
    ) {
        self.inner.failing_lists.write().push(prefix.into());
    }

    pub fn clear_failures(&self) {
        self.inner.failing_reads.write().clear();
        self.inner.failing_lists.write().clear();
        self.inner.pending_connect_failures.store(0, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> usize {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of children watches currently registered
    pub fn active_watch_count(&self) -> usize {
        self.inner.watchers.iter().map(|e| e.value().len()).sum()
    }

    /// Number of children watches registered on `path`
    pub fn watch_count(
        &self,
        path: &str,
    ) -> usize {
        self.inner.watchers.get(path).map(|w| w.len()).unwrap_or(0)
    }

    pub fn exists(
        &self,
        path: &str,
    ) -> bool {
        self.inner.nodes.read().contains_key(path)
    }

    fn is_failing(
        list: &RwLock<Vec<String>>,
        path: &str,
    ) -> bool {
        list.read().iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Direct children of `path` in key order
    fn children_of<'a>(
        nodes: &'a BTreeMap<String, Bytes>,
        path: &str,
    ) -> impl Iterator<Item = (&'a String, &'a Bytes)> + 'a {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path.trim_end_matches('/'))
        };
        let prefix_len = prefix.len();
        nodes
            .range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .filter(move |(k, _)| {
                let rest = &k[prefix_len..];
                !rest.is_empty() && !rest.contains('/')
            })
    }

    fn path_exists(
        nodes: &BTreeMap<String, Bytes>,
        path: &str,
    ) -> bool {
        path == "/" || nodes.contains_key(path)
    }

    fn notify(
        &self,
        event: PathEvent,
    ) {
        let parent = parent_path(&event.path).to_string();
        if let Some(mut slots) = self.inner.watchers.get_mut(&parent) {
            // receivers dropped without release are pruned here
            slots.retain(|slot| slot.sender.send(event.clone()).is_ok());
        }
    }

    fn unregister(
        inner: &MemInner,
        path: &str,
        id: u64,
    ) {
        inner.watchers.remove_if_mut(path, |_path, slots| {
            slots.retain(|slot| slot.id != id);
            slots.is_empty()
        });
        trace!(watch_id = id, path, "children watch released");
    }
}

#[async_trait]
impl CoordinationService for MemCoordinator {
    async fn connect(
        &self,
        hosts: &str,
        _session_timeout: Duration,
    ) -> std::result::Result<(), CoordinationError> {
        self.inner.connect_attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .inner
            .pending_connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(CoordinationError::ConnectionLoss(format!("cannot reach {hosts}")));
        }
        debug!(hosts, "in-memory coordination session opened");
        Ok(())
    }

    async fn get_data(
        &self,
        path: &str,
    ) -> std::result::Result<Bytes, CoordinationError> {
        if Self::is_failing(&self.inner.failing_reads, path) {
            return Err(CoordinationError::ConnectionLoss(format!("read of {path} failed")));
        }
        self.inner
            .nodes
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| CoordinationError::NoNode(path.to_string()))
    }

    async fn get_children(
        &self,
        path: &str,
    ) -> std::result::Result<Vec<String>, CoordinationError> {
        if Self::is_failing(&self.inner.failing_lists, path) {
            return Err(CoordinationError::ConnectionLoss(format!("listing of {path} failed")));
        }
        let nodes = self.inner.nodes.read();
        if !Self::path_exists(&nodes, path) {
            return Err(CoordinationError::NoNode(path.to_string()));
        }
        Ok(Self::children_of(&nodes, path)
            .filter_map(|(k, _)| k.rsplit('/').next().map(str::to_string))
            .collect())
    }

    async fn set_data(
        &self,
        path: &str,
        data: Bytes,
    ) -> std::result::Result<(), CoordinationError> {
        if !path.starts_with('/') || path.len() < 2 {
            return Err(CoordinationError::Other(format!("invalid path {path:?}")));
        }
        let path = path.trim_end_matches('/');

        let mut nodes = self.inner.nodes.write();

        // implicit parents, outermost first
        let mut missing = vec![];
        let mut parent = parent_path(path);
        while parent != "/" && !nodes.contains_key(parent) {
            missing.push(parent.to_string());
            parent = parent_path(parent);
        }
        for p in missing.into_iter().rev() {
            nodes.insert(p.clone(), Bytes::new());
            self.notify(PathEvent::added(p));
        }

        let event = match nodes.insert(path.to_string(), data) {
            Some(_) => PathEvent::updated(path),
            None => PathEvent::added(path),
        };
        self.notify(event);
        Ok(())
    }

    async fn delete(
        &self,
        path: &str,
    ) -> std::result::Result<(), CoordinationError> {
        let path = path.trim_end_matches('/');
        let mut nodes = self.inner.nodes.write();
        if !nodes.contains_key(path) {
            return Err(CoordinationError::NoNode(path.to_string()));
        }

        let prefix = format!("{path}/");
        let mut doomed: Vec<String> = nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        // deepest first, then the node itself
        doomed.sort_by_key(|k| std::cmp::Reverse(k.matches('/').count()));
        doomed.push(path.to_string());

        for p in doomed {
            nodes.remove(&p);
            self.notify(PathEvent::removed(p));
        }
        Ok(())
    }

    async fn watch_children(
        &self,
        path: &str,
    ) -> std::result::Result<ChildrenWatch, CoordinationError> {
        if Self::is_failing(&self.inner.failing_lists, path) {
            return Err(CoordinationError::ConnectionLoss(format!("watch of {path} failed")));
        }
        let path = if path == "/" { "/" } else { path.trim_end_matches('/') };

        let nodes = self.inner.nodes.read();
        let initial: Vec<ChildData> = Self::children_of(&nodes, path)
            .map(|(k, v)| ChildData {
                path: k.clone(),
                data: v.clone(),
            })
            .collect();

        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_watch_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .watchers
            .entry(path.to_string())
            .or_default()
            .push(WatchSlot { id, sender: tx });
        drop(nodes);

        trace!(watch_id = id, path, initial = initial.len(), "children watch registered");

        let inner = self.inner.clone();
        let watched = path.to_string();
        Ok(ChildrenWatch::new(initial, rx).on_release(move || Self::unregister(&inner, &watched, id)))
    }
}
