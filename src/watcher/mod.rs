//! Role-specific listeners attached to [`crate::WatchedPathCache`]s.
//!
//! - announcements: one nested segment cache per live worker ([`ServerSegmentRegistry`])
//! - segments: payload forwarding to the time-boundary collaborator
//! - brokers: the round-robin [`BrokerRoster`]
//!
//! Handlers never return errors: anomalies are logged and the event is dropped, the next
//! watch event re-synchronizes.

mod announcement;
mod broker;
mod segment;
pub use announcement::*;
pub use broker::*;
pub use segment::*;

#[cfg(test)]
mod segment_test;
