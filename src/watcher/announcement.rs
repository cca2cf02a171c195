use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SegmentChangeListener;
use super::SegmentWatcher;
use crate::metrics::SEGMENT_CACHES_ACTIVE;
use crate::metrics::WATCH_EVENTS_DROPPED;
use crate::utils::path::last_segment;
use crate::CacheEvent;
use crate::ClusterConnection;
use crate::PathListener;
use crate::StartMode;
use crate::WatchedPathCache;

/// Worker key -> that worker's segments cache.
///
/// Every mutation happens under one lock, and no network call is made while it is held:
/// starting a cache only spawns its task.
pub struct ServerSegmentRegistry {
    connection: ClusterConnection,
    runtime: Handle,
    segment_listener: Arc<dyn SegmentChangeListener>,
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    caches: HashMap<String, WatchedPathCache>,
    /// set by `close_all`; later registrations are refused
    closed: bool,
}

impl Debug for ServerSegmentRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ServerSegmentRegistry")
            .field("workers", &self.workers())
            .finish_non_exhaustive()
    }
}

impl ServerSegmentRegistry {
    pub fn new(
        connection: ClusterConnection,
        runtime: Handle,
        segment_listener: Arc<dyn SegmentChangeListener>,
    ) -> Self {
        Self {
            connection,
            runtime,
            segment_listener,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Creates, wires and starts the segments cache of `worker_key`.
    ///
    /// Returns `false` (and leaves the existing cache untouched) when the worker is
    /// already registered.
    pub fn register(
        &self,
        worker_key: &str,
    ) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            debug!(worker_key, "registry closed, announcement ignored");
            return false;
        }
        if state.caches.contains_key(worker_key) {
            warn!(worker_key, "worker already registered, announcement ignored");
            WATCH_EVENTS_DROPPED.with_label_values(&["announcement"]).inc();
            return false;
        }

        let path = self.connection.segments_path(worker_key);
        let cache = WatchedPathCache::new(self.connection.clone(), path.clone(), self.runtime.clone());
        cache.set_listener(Arc::new(SegmentWatcher::new(
            worker_key,
            self.connection.clone(),
            self.segment_listener.clone(),
        )));
        cache.start(StartMode::SilentBuild);
        state.caches.insert(worker_key.to_string(), cache);
        SEGMENT_CACHES_ACTIVE.inc();

        info!(worker_key, %path, "segment watch registered");
        true
    }

    /// Removes and closes the segments cache of `worker_key`.
    pub fn unregister(
        &self,
        worker_key: &str,
    ) -> bool {
        let removed = self.state.lock().caches.remove(worker_key);
        match removed {
            Some(cache) => {
                cache.close();
                SEGMENT_CACHES_ACTIVE.dec();
                info!(worker_key, "segment watch removed");
                true
            }
            None => {
                warn!(worker_key, "no segment watch registered for worker");
                WATCH_EVENTS_DROPPED.with_label_values(&["announcement"]).inc();
                false
            }
        }
    }

    pub fn contains(
        &self,
        worker_key: &str,
    ) -> bool {
        self.state.lock().caches.contains_key(worker_key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().caches.is_empty()
    }

    /// Registered worker keys, sorted
    pub fn workers(&self) -> Vec<String> {
        let mut workers: Vec<String> = self.state.lock().caches.keys().cloned().collect();
        workers.sort();
        workers
    }

    /// Closes every registered cache and refuses later registrations; returns how many
    /// caches were closed
    pub fn close_all(&self) -> usize {
        let drained: Vec<(String, WatchedPathCache)> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.caches.drain().collect()
        };
        let closed = drained.len();
        for (worker_key, cache) in drained {
            cache.close();
            SEGMENT_CACHES_ACTIVE.dec();
            debug!(%worker_key, "segment watch closed");
        }
        closed
    }
}

/// Listener of the announcements cache: keeps [`ServerSegmentRegistry`] in step with the
/// set of announced workers
#[derive(Debug)]
pub struct AnnouncementWatcher {
    connection: ClusterConnection,
    registry: Arc<ServerSegmentRegistry>,
}

impl AnnouncementWatcher {
    pub fn new(
        connection: ClusterConnection,
        registry: Arc<ServerSegmentRegistry>,
    ) -> Self {
        Self { connection, registry }
    }

    async fn on_added(
        &self,
        path: &str,
    ) {
        let Some(worker_key) = last_segment(path) else {
            warn!(path, "announcement path has no worker key, ignored");
            return;
        };
        // the announcement must still be readable; fetched before taking the registry lock
        if self.connection.get_data(path).await.is_none() {
            warn!(worker_key, path, "announcement data absent, worker not registered");
            WATCH_EVENTS_DROPPED.with_label_values(&["announcement"]).inc();
            return;
        }
        self.registry.register(worker_key);
    }

    fn on_removed(
        &self,
        path: &str,
    ) {
        match last_segment(path) {
            Some(worker_key) => {
                self.registry.unregister(worker_key);
            }
            None => debug!(path, "announcement removal without worker key"),
        }
    }
}

#[async_trait]
impl PathListener for AnnouncementWatcher {
    async fn on_event(
        &self,
        event: CacheEvent,
    ) {
        match &event {
            CacheEvent::Added(child) => self.on_added(&child.path).await,
            CacheEvent::Removed(child) => self.on_removed(&child.path),
        }
    }
}
