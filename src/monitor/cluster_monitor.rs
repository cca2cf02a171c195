use std::fmt::Debug;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::info;

use crate::BrokerSelector;
use crate::ClusterConnection;
use crate::Result;
use crate::ServerSegmentRegistry;
use crate::ServiceLookup;
use crate::Settings;
use crate::WatchedPathCache;

/// Live view of the cluster: announced workers, their segments and the broker roster
pub struct ClusterMonitor {
    settings: Settings,
    connection: ClusterConnection,
    announcements: WatchedPathCache,
    brokers: WatchedPathCache,
    registry: Arc<ServerSegmentRegistry>,
    lookup: ServiceLookup,
    selector: BrokerSelector,
    is_shutdown: AtomicBool,
}

impl Debug for ClusterMonitor {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClusterMonitor")
            .field("announcements", &self.announcements)
            .field("brokers", &self.brokers)
            .field("is_shutdown", &self.is_shutdown.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl ClusterMonitor {
    pub(super) fn new(
        settings: Settings,
        connection: ClusterConnection,
        announcements: WatchedPathCache,
        brokers: WatchedPathCache,
        registry: Arc<ServerSegmentRegistry>,
        lookup: ServiceLookup,
        selector: BrokerSelector,
    ) -> Self {
        Self {
            settings,
            connection,
            announcements,
            brokers,
            registry,
            lookup,
            selector,
            is_shutdown: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connection(&self) -> &ClusterConnection {
        &self.connection
    }

    /// First resolvable instance of `name`
    pub async fn get_service(
        &self,
        name: &str,
    ) -> Result<String> {
        self.lookup.get_service(name).await
    }

    /// Every resolvable instance of `name`, in listing order
    pub async fn get_services(
        &self,
        name: &str,
    ) -> Result<Vec<String>> {
        self.lookup.get_services(name).await
    }

    /// Next broker in round-robin order
    pub async fn get_broker(&self) -> Result<String> {
        self.selector.get_broker().await
    }

    /// Workers that currently own a segments watch
    pub fn registered_workers(&self) -> Vec<String> {
        self.registry.workers()
    }

    /// Current broker rotation, head first
    pub fn brokers(&self) -> Vec<String> {
        self.selector.roster().snapshot()
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::Acquire)
    }

    /// Closes the announcements and brokers caches and every per-worker cache.
    ///
    /// Only the first call does anything.
    pub fn shutdown(&self) {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        // stop the source of registrations before draining the registry
        self.announcements.close();
        self.brokers.close();
        let workers = self.registry.close_all();
        info!(workers, "cluster monitor shut down");
    }
}

impl Drop for ClusterMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
