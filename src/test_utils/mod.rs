//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::BackoffPolicy;
use crate::CacheEvent;
use crate::ClusterConnection;
use crate::CoordinatorConfig;
use crate::MemCoordinator;
use crate::PathListener;
use crate::SegmentChangeListener;
use crate::Settings;

pub(crate) fn fast_retry() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 3,
        timeout_ms: 1000,
        base_delay_ms: 5,
        max_delay_ms: 20,
    }
}

pub(crate) fn test_coordinator_config() -> CoordinatorConfig {
    CoordinatorConfig {
        hosts: "mem:2181".to_string(),
        session_timeout_ms: 1000,
        enable_compression: true,
        root_path: "/druid".to_string(),
    }
}

pub(crate) fn test_settings() -> Settings {
    Settings {
        coordinator: test_coordinator_config(),
        retry: fast_retry(),
        ..Default::default()
    }
}

pub(crate) async fn mem_connection() -> (MemCoordinator, ClusterConnection) {
    let mem = MemCoordinator::new();
    let connection = ClusterConnection::connect(test_coordinator_config(), fast_retry(), Arc::new(mem.clone()))
        .await
        .expect("in-memory connect should succeed");
    (mem, connection)
}

pub(crate) fn node_payload(
    address: &str,
    port: u16,
) -> Bytes {
    Bytes::from(format!(r#"{{"address":"{address}","port":{port}}}"#))
}

/// Polls `condition` until it holds or two seconds pass
pub(crate) async fn eventually<F>(
    description: &str,
    mut condition: F,
) where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {description}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[derive(Default)]
pub(crate) struct RecordingListener {
    pub(crate) events: Mutex<Vec<CacheEvent>>,
}

impl RecordingListener {
    pub(crate) fn snapshot(&self) -> Vec<CacheEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// `+path` for additions and `-path` for removals, in delivery order
    pub(crate) fn summary(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| format!("{}{}", if e.is_added() { '+' } else { '-' }, e.path()))
            .collect()
    }
}

#[async_trait]
impl PathListener for RecordingListener {
    async fn on_event(
        &self,
        event: CacheEvent,
    ) {
        self.events.lock().push(event);
    }
}

#[derive(Default)]
pub(crate) struct RecordingSegmentListener {
    pub(crate) payloads: Mutex<Vec<Bytes>>,
}

impl RecordingSegmentListener {
    pub(crate) fn snapshot(&self) -> Vec<Bytes> {
        self.payloads.lock().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.payloads.lock().len()
    }
}

impl SegmentChangeListener for RecordingSegmentListener {
    fn on_segment_change(
        &self,
        payload: Bytes,
    ) {
        self.payloads.lock().push(payload);
    }
}
