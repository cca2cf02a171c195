//! Wiring of the connection, the long-lived caches and the lookup path into one handle.
//!
//! ```ignore
//! let monitor = ClusterMonitorBuilder::new(settings, Arc::new(MemCoordinator::new()))
//!     .segment_listener(Arc::new(timeline))
//!     .build()
//!     .await?;
//! let broker = monitor.get_broker().await?;
//! monitor.shutdown();
//! ```

mod builder;
mod cluster_monitor;
pub use builder::*;
pub use cluster_monitor::*;

#[cfg(test)]
mod monitor_test;
