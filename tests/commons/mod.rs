use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use cluster_watch::BackoffPolicy;
use cluster_watch::ClusterConnection;
use cluster_watch::ClusterMonitor;
use cluster_watch::ClusterMonitorBuilder;
use cluster_watch::CoordinatorConfig;
use cluster_watch::MemCoordinator;
use cluster_watch::SegmentChangeListener;
use cluster_watch::Settings;
use parking_lot::Mutex;

pub fn settings() -> Settings {
    Settings {
        coordinator: CoordinatorConfig {
            hosts: "mem:2181".to_string(),
            session_timeout_ms: 1000,
            enable_compression: true,
            root_path: "/druid".to_string(),
        },
        retry: BackoffPolicy {
            max_retries: 3,
            timeout_ms: 1000,
            base_delay_ms: 5,
            max_delay_ms: 20,
        },
        ..Default::default()
    }
}

/// Publisher side of the cluster, writing through its own session the way remote
/// processes would
pub async fn publisher(mem: &MemCoordinator) -> ClusterConnection {
    let settings = settings();
    ClusterConnection::connect(settings.coordinator, settings.retry, Arc::new(mem.clone()))
        .await
        .expect("publisher connect")
}

pub async fn start_monitor(mem: &MemCoordinator) -> (ClusterMonitor, Arc<SegmentRecorder>) {
    let recorder = Arc::new(SegmentRecorder::default());
    let monitor = ClusterMonitorBuilder::new(settings(), Arc::new(mem.clone()))
        .segment_listener(recorder.clone())
        .build()
        .await
        .expect("monitor build");
    (monitor, recorder)
}

pub fn instance(
    address: &str,
    port: u16,
) -> Bytes {
    Bytes::from(format!(
        r#"{{"name":"broker","id":"{address}-{port}","address":"{address}","port":{port}}}"#
    ))
}

pub async fn eventually<F>(
    description: &str,
    mut condition: F,
) where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {description}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[derive(Default)]
pub struct SegmentRecorder {
    payloads: Mutex<Vec<Bytes>>,
}

impl SegmentRecorder {
    pub fn payloads(&self) -> Vec<Bytes> {
        self.payloads.lock().clone()
    }
}

impl SegmentChangeListener for SegmentRecorder {
    fn on_segment_change(
        &self,
        payload: Bytes,
    ) {
        self.payloads.lock().push(payload);
    }
}
