use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tracing::trace;
use tracing::warn;

use crate::metrics::WATCH_EVENTS_DROPPED;
use crate::CacheEvent;
use crate::ClusterConnection;
use crate::PathListener;

/// Time-boundary collaborator notified on every segment change.
///
/// Called on the dispatch pool; implementations must return quickly.
#[cfg_attr(test, automock)]
pub trait SegmentChangeListener: Send + Sync + 'static {
    fn on_segment_change(
        &self,
        payload: Bytes,
    );
}

impl<F> SegmentChangeListener for F
where
    F: Fn(Bytes) + Send + Sync + 'static,
{
    fn on_segment_change(
        &self,
        payload: Bytes,
    ) {
        self(payload)
    }
}

/// Listener of one worker's segments cache
pub struct SegmentWatcher {
    worker_key: String,
    connection: ClusterConnection,
    listener: Arc<dyn SegmentChangeListener>,
}

impl SegmentWatcher {
    pub fn new(
        worker_key: impl Into<String>,
        connection: ClusterConnection,
        listener: Arc<dyn SegmentChangeListener>,
    ) -> Self {
        Self {
            worker_key: worker_key.into(),
            connection,
            listener,
        }
    }
}

#[async_trait]
impl PathListener for SegmentWatcher {
    async fn on_event(
        &self,
        event: CacheEvent,
    ) {
        let Some(payload) = self.connection.get_data(event.path()).await else {
            warn!(
                worker_key = %self.worker_key,
                path = event.path(),
                added = event.is_added(),
                "segment data absent, event dropped"
            );
            WATCH_EVENTS_DROPPED.with_label_values(&["segment"]).inc();
            return;
        };
        trace!(worker_key = %self.worker_key, path = event.path(), "segment change forwarded");
        self.listener.on_segment_change(payload);
    }
}
