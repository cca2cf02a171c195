//! Cluster membership watch-cache.
//!
//! Keeps an in-process view of a data cluster published in a ZooKeeper-style coordination
//! service:
//! - which workers are announced, with one live segments watch per worker
//! - which brokers are up, handed out round-robin
//! - on-demand lookup of any named service
//!
//! The coordination service is reached through [`CoordinationService`]; [`MemCoordinator`]
//! is the bundled in-process implementation. [`ClusterMonitorBuilder`] wires everything up.

mod cache;
mod config;
mod connection;
mod constants;
mod coordination;
mod discovery;
mod errors;
pub mod metrics;
mod monitor;
pub mod utils;
mod watcher;

pub use cache::*;
pub use config::*;
pub use connection::*;
pub use constants::*;
pub use coordination::*;
pub use discovery::*;
pub use errors::*;
pub use monitor::*;
pub use watcher::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
