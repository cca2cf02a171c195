use std::sync::Arc;

use bytes::Bytes;

use super::*;
use crate::test_utils::mem_connection;
use crate::test_utils::RecordingSegmentListener;
use crate::CacheEvent;
use crate::ChildData;
use crate::CoordinationService;
use crate::PathListener;

const SEGMENT: &str = "/druid/segments/host1:8083/seg1";

fn added(path: &str) -> CacheEvent {
    CacheEvent::Added(ChildData {
        path: path.to_string(),
        data: Bytes::new(),
    })
}

#[tokio::test]
async fn test_segment_payload_is_forwarded_decompressed() {
    let (_mem, conn) = mem_connection().await;
    conn.publish(SEGMENT, Bytes::from_static(b"{\"interval\":\"2024\"}")).await.unwrap();

    let recorder = Arc::new(RecordingSegmentListener::default());
    let watcher = SegmentWatcher::new("host1:8083", conn, recorder.clone());
    watcher.on_event(added(SEGMENT)).await;

    assert_eq!(recorder.snapshot(), vec![Bytes::from_static(b"{\"interval\":\"2024\"}")]);
}

#[tokio::test]
async fn test_removed_segment_is_refetched() {
    let (mem, conn) = mem_connection().await;
    mem.set_data(SEGMENT, Bytes::from_static(b"v2")).await.unwrap();

    let recorder = Arc::new(RecordingSegmentListener::default());
    let watcher = SegmentWatcher::new("host1:8083", conn, recorder.clone());
    watcher
        .on_event(CacheEvent::Removed(ChildData {
            path: SEGMENT.to_string(),
            data: Bytes::from_static(b"v1"),
        }))
        .await;

    // current node data wins over the payload carried by the event
    assert_eq!(recorder.snapshot(), vec![Bytes::from_static(b"v2")]);
}

#[tokio::test]
async fn test_failed_read_produces_no_notification() {
    let (mem, conn) = mem_connection().await;
    mem.set_data(SEGMENT, Bytes::from_static(b"v1")).await.unwrap();
    mem.fail_reads_under("/druid/segments");

    let mut listener = MockSegmentChangeListener::new();
    listener.expect_on_segment_change().never();

    let watcher = SegmentWatcher::new("host1:8083", conn, Arc::new(listener));
    watcher.on_event(added(SEGMENT)).await;
}

#[tokio::test]
async fn test_vanished_segment_produces_no_notification() {
    let (_mem, conn) = mem_connection().await;

    let mut listener = MockSegmentChangeListener::new();
    listener.expect_on_segment_change().never();

    let watcher = SegmentWatcher::new("host1:8083", conn, Arc::new(listener));
    watcher
        .on_event(CacheEvent::Removed(ChildData {
            path: SEGMENT.to_string(),
            data: Bytes::from_static(b"last"),
        }))
        .await;
}

#[tokio::test]
async fn test_mock_listener_receives_each_change_once() {
    let (mem, conn) = mem_connection().await;
    mem.set_data(SEGMENT, Bytes::from_static(b"v1")).await.unwrap();

    let mut listener = MockSegmentChangeListener::new();
    listener
        .expect_on_segment_change()
        .withf(|payload| payload.as_ref() == b"v1")
        .times(1)
        .return_const(());

    let watcher = SegmentWatcher::new("host1:8083", conn, Arc::new(listener));
    watcher.on_event(added(SEGMENT)).await;
}
