use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::CacheEvent;
use super::CacheState;
use super::PathListener;
use super::StartMode;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::ChildData;
use crate::ChildrenWatch;
use crate::ClusterConnection;
use crate::Error;
use crate::PathEvent;
use crate::PathEventKind;
use crate::Result;

struct CacheInner {
    path: String,
    connection: ClusterConnection,
    state: Mutex<CacheState>,
    listener: ArcSwapOption<Arc<dyn PathListener>>,
    mirror: RwLock<BTreeMap<String, Bytes>>,
    cancel: CancellationToken,
}

/// Continuously updated mirror of one path's children.
///
/// Dropping the cache closes it.
pub struct WatchedPathCache {
    inner: Arc<CacheInner>,
    runtime: Handle,
}

impl Debug for WatchedPathCache {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatchedPathCache")
            .field("path", &self.inner.path)
            .field("state", &*self.inner.state.lock())
            .finish()
    }
}

impl WatchedPathCache {
    pub fn new(
        connection: ClusterConnection,
        path: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                path: path.into(),
                connection,
                state: Mutex::new(CacheState::Unstarted),
                listener: ArcSwapOption::empty(),
                mirror: RwLock::new(BTreeMap::new()),
                cancel: CancellationToken::new(),
            }),
            runtime,
        }
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn state(&self) -> CacheState {
        *self.inner.state.lock()
    }

    /// Full paths of the children currently mirrored
    pub fn current_children(&self) -> Vec<String> {
        self.inner.mirror.read().keys().cloned().collect()
    }

    /// Mirrored payload of one child
    pub fn current_data(
        &self,
        path: &str,
    ) -> Option<Bytes> {
        self.inner.mirror.read().get(path).cloned()
    }

    pub fn set_listener(
        &self,
        listener: Arc<dyn PathListener>,
    ) {
        self.inner.listener.store(Some(Arc::new(listener)));
    }

    pub fn clear_listener(&self) {
        self.inner.listener.store(None);
    }

    /// Starts watching. Never blocks: the watch is opened by the background task.
    ///
    /// Returns `false` if the cache was already started or closed.
    pub fn start(
        &self,
        mode: StartMode,
    ) -> bool {
        let mut state = self.inner.state.lock();
        if *state != CacheState::Unstarted {
            warn!(path = %self.inner.path, state = ?*state, "cache start ignored");
            return false;
        }
        *state = CacheState::Started;

        let inner = self.inner.clone();
        self.runtime.spawn(async move {
            run(inner, mode).await;
        });
        debug!(path = %self.inner.path, ?mode, "cache started");
        true
    }

    /// Detaches the listener and releases the watch.
    ///
    /// A callback already running is not interrupted. Returns `true` only for the call that
    /// actually closed the cache.
    pub fn close(&self) -> bool {
        let mut state = self.inner.state.lock();
        if *state == CacheState::Closed {
            return false;
        }
        *state = CacheState::Closed;
        self.inner.listener.store(None);
        self.inner.cancel.cancel();
        self.inner.mirror.write().clear();
        debug!(path = %self.inner.path, "cache closed");
        true
    }
}

impl Drop for WatchedPathCache {
    fn drop(&mut self) {
        self.close();
    }
}

async fn open_watch(inner: &CacheInner) -> Result<ChildrenWatch> {
    let connection = &inner.connection;
    let path = inner.path.as_str();
    task_with_timeout_and_exponential_backoff(
        || async move { connection.watch_children(path).await.map_err(Error::from) },
        connection.retry_policy(),
    )
    .await
}

async fn run(
    inner: Arc<CacheInner>,
    mode: StartMode,
) {
    let mut watch = tokio::select! {
        _ = inner.cancel.cancelled() => return,
        opened = open_watch(&inner) => match opened {
            Ok(watch) => watch,
            Err(e) => {
                error!(path = %inner.path, "failed to open children watch: {:?}", e);
                return;
            }
        },
    };

    let initial: Vec<ChildData> = std::mem::take(&mut watch.initial)
        .into_iter()
        .map(|child| ChildData {
            data: inner.connection.decompress(child.data),
            path: child.path,
        })
        .collect();
    {
        let mut mirror = inner.mirror.write();
        if inner.cancel.is_cancelled() {
            return;
        }
        mirror.extend(initial.iter().map(|c| (c.path.clone(), c.data.clone())));
    }
    trace!(path = %inner.path, children = initial.len(), "cache initialized");

    if mode == StartMode::PostInitialized {
        for child in initial {
            if inner.cancel.is_cancelled() {
                return;
            }
            dispatch(&inner, CacheEvent::Added(child)).await;
        }
    }

    loop {
        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break,
            event = watch.events.recv() => match event {
                Some(event) => apply(&inner, event).await,
                None => {
                    warn!(path = %inner.path, "children watch stream ended");
                    break;
                }
            },
        }
    }
    // dropping `watch` releases it on the service side
}

async fn apply(
    inner: &CacheInner,
    event: PathEvent,
) {
    let kind = event.kind;
    let forwarded = match kind {
        PathEventKind::Added | PathEventKind::Updated => {
            // fetched outside the mirror lock; an unread child stays unmirrored so the next
            // event for it is forwarded as an addition
            match inner.connection.get_data(&event.path).await {
                Some(data) => {
                    let previous = inner.mirror.write().insert(event.path.clone(), data.clone());
                    match previous {
                        None => Some(CacheEvent::Added(ChildData { path: event.path, data })),
                        Some(_) => None,
                    }
                }
                None => {
                    debug!(path = %event.path, "child data unreadable, left out of mirror");
                    None
                }
            }
        }
        PathEventKind::Removed => {
            let removed = inner.mirror.write().remove(&event.path);
            removed.map(|data| CacheEvent::Removed(ChildData { path: event.path, data }))
        }
    };

    match forwarded {
        Some(event) => dispatch(inner, event).await,
        None => trace!(path = %inner.path, ?kind, "event not forwarded"),
    }
}

async fn dispatch(
    inner: &CacheInner,
    event: CacheEvent,
) {
    let Some(listener) = inner.listener.load_full() else {
        trace!(path = %inner.path, ?event, "no listener attached");
        return;
    };
    listener.on_event(event).await;
}
