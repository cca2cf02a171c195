use std::sync::Arc;

use bytes::Bytes;

use super::*;
use crate::test_utils::eventually;
use crate::test_utils::node_payload;
use crate::test_utils::test_settings;
use crate::test_utils::RecordingSegmentListener;
use crate::CoordinationService;
use crate::DecodeError;
use crate::Error;
use crate::MemCoordinator;
use crate::NodeDescriptor;

async fn monitor_over(mem: &MemCoordinator) -> (ClusterMonitor, Arc<RecordingSegmentListener>) {
    let recorder = Arc::new(RecordingSegmentListener::default());
    let monitor = ClusterMonitorBuilder::new(test_settings(), Arc::new(mem.clone()))
        .segment_listener(recorder.clone())
        .build()
        .await
        .expect("monitor should build");
    (monitor, recorder)
}

#[tokio::test]
async fn test_build_rejects_invalid_settings() {
    let mut settings = test_settings();
    settings.coordinator.root_path = "druid".into();

    let result = ClusterMonitorBuilder::new(settings, Arc::new(MemCoordinator::new()))
        .build()
        .await;
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn test_build_retries_connect() {
    let mem = MemCoordinator::new();
    mem.fail_next_connects(2);

    let (monitor, _) = monitor_over(&mem).await;
    assert_eq!(mem.connect_attempts(), 3);
    assert!(!monitor.is_shutdown());
}

#[tokio::test]
async fn test_build_gives_up_after_retry_budget() {
    let mem = MemCoordinator::new();
    mem.fail_next_connects(10);

    let result = ClusterMonitorBuilder::new(test_settings(), Arc::new(mem.clone()))
        .build()
        .await;
    assert!(matches!(result, Err(Error::RetryExhausted(_))));
}

#[tokio::test]
async fn test_preexisting_brokers_are_loaded() {
    let mem = MemCoordinator::new();
    mem.set_data("/druid/discovery/broker/i1", node_payload("h1", 8082)).await.unwrap();
    mem.set_data("/druid/discovery/broker/i2", node_payload("h2", 8082)).await.unwrap();

    let (monitor, _) = monitor_over(&mem).await;
    eventually("brokers loaded", || monitor.brokers().len() == 2).await;
    assert_eq!(monitor.get_broker().await.unwrap(), "h1:8082");
    assert_eq!(monitor.get_broker().await.unwrap(), "h2:8082");
    assert_eq!(monitor.get_broker().await.unwrap(), "h1:8082");
}

#[tokio::test]
async fn test_worker_lifecycle_is_tracked() {
    let mem = MemCoordinator::new();
    let (monitor, recorder) = monitor_over(&mem).await;
    eventually("announcements watched", || mem.watch_count("/druid/announcements") == 1).await;

    mem.set_data("/druid/announcements/host1:8083", Bytes::from_static(b"{}"))
        .await
        .unwrap();
    eventually("worker registered", || monitor.registered_workers() == vec!["host1:8083"]).await;
    eventually("segments watched", || {
        mem.watch_count("/druid/segments/host1:8083") == 1
    })
    .await;

    mem.set_data("/druid/segments/host1:8083/seg1", Bytes::from_static(b"s1"))
        .await
        .unwrap();
    eventually("segment forwarded", || recorder.len() == 1).await;

    mem.delete("/druid/announcements/host1:8083").await.unwrap();
    eventually("worker unregistered", || monitor.registered_workers().is_empty()).await;
}

#[tokio::test]
async fn test_custom_decoder_is_used_for_brokers() {
    let mem = MemCoordinator::new();
    mem.set_data("/druid/discovery/broker/i1", Bytes::from_static(b"h7:9000"))
        .await
        .unwrap();

    let decoder = |payload: &[u8]| -> std::result::Result<NodeDescriptor, DecodeError> {
        let text = std::str::from_utf8(payload).map_err(|_| DecodeError::MissingField("address"))?;
        let (host, port) = text.split_once(':').ok_or(DecodeError::MissingField("port"))?;
        let port = port.parse().map_err(|_| DecodeError::MissingField("port"))?;
        Ok(NodeDescriptor::new(host, port))
    };
    let monitor = ClusterMonitorBuilder::new(test_settings(), Arc::new(mem.clone()))
        .decoder(Arc::new(decoder))
        .build()
        .await
        .unwrap();

    assert_eq!(monitor.get_service("broker").await.unwrap(), "h7:9000");
    eventually("broker loaded", || monitor.brokers() == vec!["h7:9000"]).await;
}

#[tokio::test]
async fn test_shutdown_releases_all_watches_once() {
    let mem = MemCoordinator::new();
    let (monitor, _) = monitor_over(&mem).await;
    eventually("announcements watched", || mem.watch_count("/druid/announcements") == 1).await;

    for worker in ["a:1", "b:1"] {
        mem.set_data(&format!("/druid/announcements/{worker}"), Bytes::from_static(b"{}"))
            .await
            .unwrap();
    }
    eventually("workers registered", || monitor.registered_workers().len() == 2).await;
    // announcements + brokers + two segment caches
    eventually("all watches open", || mem.active_watch_count() == 4).await;

    monitor.shutdown();
    monitor.shutdown();
    assert!(monitor.is_shutdown());
    assert!(monitor.registered_workers().is_empty());
    eventually("all watches released", || mem.active_watch_count() == 0).await;

    mem.set_data("/druid/announcements/c:1", Bytes::from_static(b"{}")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(monitor.registered_workers().is_empty());
}

#[tokio::test]
async fn test_lookup_errors_surface_through_monitor() {
    let mem = MemCoordinator::new();
    let (monitor, _) = monitor_over(&mem).await;

    assert!(matches!(monitor.get_service("historical").await, Err(Error::Lookup { .. })));
    assert!(matches!(monitor.get_broker().await, Err(Error::Lookup { .. })));
}
