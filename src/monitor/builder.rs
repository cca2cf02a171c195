use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tracing::debug;
use tracing::info;
use tracing::trace;

use super::ClusterMonitor;
use crate::AnnouncementWatcher;
use crate::BrokerRoster;
use crate::BrokerSelector;
use crate::BrokerWatcher;
use crate::ClusterConnection;
use crate::CoordinationService;
use crate::Error;
use crate::JsonNodeDecoder;
use crate::NodeDecoder;
use crate::Result;
use crate::SegmentChangeListener;
use crate::ServerSegmentRegistry;
use crate::ServiceLookup;
use crate::Settings;
use crate::StartMode;
use crate::WatchedPathCache;

/// Fluent assembly of a [`ClusterMonitor`].
///
/// Unset components fall back to defaults: [`JsonNodeDecoder`], a segment listener that
/// only traces, and the runtime `build` is awaited on.
pub struct ClusterMonitorBuilder {
    settings: Settings,
    service: Arc<dyn CoordinationService>,
    segment_listener: Option<Arc<dyn SegmentChangeListener>>,
    decoder: Option<Arc<dyn NodeDecoder>>,
    runtime: Option<Handle>,
}

impl ClusterMonitorBuilder {
    pub fn new(
        settings: Settings,
        service: Arc<dyn CoordinationService>,
    ) -> Self {
        Self {
            settings,
            service,
            segment_listener: None,
            decoder: None,
            runtime: None,
        }
    }

    /// Sets the collaborator notified on every segment change
    pub fn segment_listener(
        mut self,
        listener: Arc<dyn SegmentChangeListener>,
    ) -> Self {
        self.segment_listener = Some(listener);
        self
    }

    /// Sets the decoder for discovery payloads
    pub fn decoder(
        mut self,
        decoder: Arc<dyn NodeDecoder>,
    ) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Sets the runtime that runs cache tasks and listener callbacks
    pub fn runtime(
        mut self,
        runtime: Handle,
    ) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validates settings, opens the session and starts the announcements (silent build)
    /// and brokers (post-initialized) caches.
    ///
    /// # Errors
    /// Invalid settings, or a session that could not be opened within the retry policy.
    pub async fn build(self) -> Result<ClusterMonitor> {
        let settings = self.settings.validate()?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| Error::Fatal(format!("no tokio runtime available: {e}")))?,
        };

        let connection = ClusterConnection::connect(settings.coordinator.clone(), settings.retry, self.service).await?;

        let decoder: Arc<dyn NodeDecoder> = match self.decoder {
            Some(decoder) => decoder,
            None => Arc::new(JsonNodeDecoder),
        };
        let segment_listener: Arc<dyn SegmentChangeListener> = match self.segment_listener {
            Some(listener) => listener,
            None => Arc::new(|payload: Bytes| trace!(bytes = payload.len(), "segment change without listener")),
        };

        let registry = Arc::new(ServerSegmentRegistry::new(
            connection.clone(),
            runtime.clone(),
            segment_listener,
        ));
        let announcements = WatchedPathCache::new(connection.clone(), connection.announcements_path(), runtime.clone());
        announcements.set_listener(Arc::new(AnnouncementWatcher::new(connection.clone(), registry.clone())));

        let lookup = ServiceLookup::new(connection.clone(), settings.discovery.clone(), decoder.clone());
        let roster = Arc::new(BrokerRoster::new());
        let brokers_path = lookup.service_path(&settings.discovery.broker_service);
        let brokers = WatchedPathCache::new(connection.clone(), brokers_path.clone(), runtime);
        brokers.set_listener(Arc::new(BrokerWatcher::new(roster.clone(), decoder)));
        let selector = BrokerSelector::new(roster, lookup.clone(), settings.discovery.broker_service.clone());

        announcements.start(StartMode::SilentBuild);
        debug!(path = %announcements.path(), "announcements watch started");
        brokers.start(StartMode::PostInitialized);
        debug!(path = %brokers_path, "brokers watch started");

        info!(hosts = %settings.coordinator.hosts, root = %settings.coordinator.root_path, "cluster monitor ready");
        Ok(ClusterMonitor::new(
            settings,
            connection,
            announcements,
            brokers,
            registry,
            lookup,
            selector,
        ))
    }
}
