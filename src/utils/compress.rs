//! Gzip framing for coordination-service node payloads.
//!
//! Nodes written by older or differently configured writers may be plain; reads therefore
//! accept both forms and never fail because of framing.

use std::io::Read;
use std::io::Write;

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::trace;

/// Gzips `data` when `enabled`, otherwise hands it back untouched
pub fn compress(
    data: Bytes,
    enabled: bool,
) -> std::io::Result<Bytes> {
    if !enabled {
        return Ok(data);
    }
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 16), Compression::default());
    encoder.write_all(&data)?;
    Ok(Bytes::from(encoder.finish()?))
}

/// Attempts gzip decompression; any decode failure yields the original bytes
pub fn decompress(data: Bytes) -> Bytes {
    let mut decoder = GzDecoder::new(&data[..]);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Bytes::from(out),
        Err(e) => {
            trace!("payload is not gzip ({}), passing through {} bytes", e, data.len());
            data
        }
    }
}
