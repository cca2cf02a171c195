//! Prometheus instruments for watch lifecycle and lookups.
//!
//! Instruments are created lazily and attached to a registry on demand through
//! [`register_custom_metrics`]; exposing them is left to the embedding process.

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;


lazy_static! {
    pub static ref SEGMENT_CACHES_ACTIVE: IntGauge = IntGauge::new(
        "segment_caches_active",
        "Per-worker segment caches currently registered"
    )
    .expect("metric can not be created");

    pub static ref BROKERS_ACTIVE: IntGauge =
        IntGauge::new("brokers_active", "Brokers currently in the round-robin roster")
            .expect("metric can not be created");

    pub static ref WATCH_EVENTS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_events_dropped_total", "Watch events dropped because node data was absent or undecodable"),
        &["role"]
    )
    .expect("metric can not be created");

    pub static ref LOOKUP_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("lookup_failures_total", "Service lookups that failed or resolved nothing"),
        &["service"]
    )
    .expect("metric can not be created");
}

/// Attaches every instrument of this crate to `registry`
pub fn register_custom_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(SEGMENT_CACHES_ACTIVE.clone()))?;
    registry.register(Box::new(BROKERS_ACTIVE.clone()))?;
    registry.register(Box::new(WATCH_EVENTS_DROPPED.clone()))?;
    registry.register(Box::new(LOOKUP_FAILURES.clone()))?;
    Ok(())
}

/// Text exposition of everything registered in `registry`
pub fn encode_metrics(registry: &Registry) -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        error!("could not encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("metrics could not be from_utf8'd: {}", e);
        String::new()
    })
}
