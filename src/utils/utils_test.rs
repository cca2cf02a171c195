use bytes::Bytes;

use crate::utils::compress::compress;
use crate::utils::compress::decompress;
use crate::utils::path::join_path;
use crate::utils::path::last_segment;
use crate::utils::path::parent_path;

#[test]
fn test_decompress_passes_plain_payload_through() {
    let raw = Bytes::from_static(br#"{"address":"10.0.0.1","port":8082}"#);
    assert_eq!(decompress(raw.clone()), raw);
}

#[test]
fn test_decompress_passes_corrupt_gzip_through() {
    // valid gzip header followed by a reserved deflate block type
    let corrupt = Bytes::from_static(&[0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff, 0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(decompress(corrupt.clone()), corrupt);
}

#[test]
fn test_compress_then_decompress_restores_payload() {
    let raw = Bytes::from(vec![b'x'; 4096]);
    let compressed = compress(raw.clone(), true).unwrap();
    assert_ne!(compressed, raw);
    assert!(compressed.len() < raw.len());
    assert_eq!(decompress(compressed), raw);
}

#[test]
fn test_compress_disabled_is_identity() {
    let raw = Bytes::from_static(b"plain");
    assert_eq!(compress(raw.clone(), false).unwrap(), raw);
}

#[test]
fn test_decompress_empty_payload() {
    assert_eq!(decompress(Bytes::new()), Bytes::new());
}

#[test]
fn test_join_path() {
    assert_eq!(join_path("/druid", "announcements"), "/druid/announcements");
    assert_eq!(join_path("/druid/", "/segments"), "/druid/segments");
    assert_eq!(join_path("/", "druid"), "/druid");
    assert_eq!(join_path("", "druid"), "/druid");
}

#[test]
fn test_last_segment() {
    assert_eq!(last_segment("/druid/announcements/host1:8083"), Some("host1:8083"));
    assert_eq!(last_segment("/druid/announcements/"), Some("announcements"));
    assert_eq!(last_segment("worker"), Some("worker"));
    assert_eq!(last_segment("/"), None);
    assert_eq!(last_segment(""), None);
}

#[test]
fn test_parent_path() {
    assert_eq!(parent_path("/druid/segments/w1"), "/druid/segments");
    assert_eq!(parent_path("/druid"), "/");
    assert_eq!(parent_path("/"), "/");
}
