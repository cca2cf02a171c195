use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::metrics::BROKERS_ACTIVE;
use crate::metrics::WATCH_EVENTS_DROPPED;
use crate::CacheEvent;
use crate::Error;
use crate::NodeDecoder;
use crate::PathListener;
use crate::Result;
use crate::ServiceLookup;

/// Duplicate-free `host:port` list consumed round-robin.
///
/// Position only encodes rotation, not priority.
#[derive(Debug, Default)]
pub struct BrokerRoster {
    brokers: Mutex<VecDeque<String>>,
}

impl BrokerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `broker` unless already present
    pub fn add(
        &self,
        broker: String,
    ) -> bool {
        let mut brokers = self.brokers.lock();
        if brokers.contains(&broker) {
            return false;
        }
        brokers.push_back(broker);
        BROKERS_ACTIVE.set(brokers.len() as i64);
        true
    }

    /// Removes `broker`, keeping the relative order of the others
    pub fn remove(
        &self,
        broker: &str,
    ) -> bool {
        let mut brokers = self.brokers.lock();
        match brokers.iter().position(|b| b == broker) {
            Some(idx) => {
                brokers.remove(idx);
                BROKERS_ACTIVE.set(brokers.len() as i64);
                true
            }
            None => false,
        }
    }

    /// Appends every entry not yet present, in order
    pub fn extend_absent(
        &self,
        candidates: impl IntoIterator<Item = String>,
    ) -> usize {
        let mut brokers = self.brokers.lock();
        let mut added = 0;
        for candidate in candidates {
            if !brokers.contains(&candidate) {
                brokers.push_back(candidate);
                added += 1;
            }
        }
        BROKERS_ACTIVE.set(brokers.len() as i64);
        added
    }

    /// Takes the head and moves it to the tail
    pub fn next(&self) -> Option<String> {
        let mut brokers = self.brokers.lock();
        let head = brokers.pop_front()?;
        brokers.push_back(head.clone());
        Some(head)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.brokers.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.brokers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.brokers.lock().is_empty()
    }
}

/// Listener of the broker discovery cache
pub struct BrokerWatcher {
    roster: Arc<BrokerRoster>,
    decoder: Arc<dyn NodeDecoder>,
}

impl BrokerWatcher {
    pub fn new(
        roster: Arc<BrokerRoster>,
        decoder: Arc<dyn NodeDecoder>,
    ) -> Self {
        Self { roster, decoder }
    }
}

#[async_trait]
impl PathListener for BrokerWatcher {
    async fn on_event(
        &self,
        event: CacheEvent,
    ) {
        let broker = match self.decoder.decode(event.data()) {
            Ok(node) => node.host_and_port(),
            Err(e) => {
                warn!(path = event.path(), "undecodable broker payload, event dropped: {}", e);
                WATCH_EVENTS_DROPPED.with_label_values(&["broker"]).inc();
                return;
            }
        };

        match event {
            CacheEvent::Added(_) => {
                if self.roster.add(broker.clone()) {
                    info!(%broker, "broker added to roster");
                } else {
                    warn!(%broker, "broker already in roster, ignored");
                }
            }
            CacheEvent::Removed(_) => {
                if self.roster.remove(&broker) {
                    info!(%broker, "broker removed from roster");
                } else {
                    warn!(%broker, "broker not in roster, nothing removed");
                }
            }
        }
    }
}

/// Round-robin broker selection with cold-start bootstrap through [`ServiceLookup`]
#[derive(Debug, Clone)]
pub struct BrokerSelector {
    roster: Arc<BrokerRoster>,
    lookup: ServiceLookup,
    service_name: String,
}

impl BrokerSelector {
    pub fn new(
        roster: Arc<BrokerRoster>,
        lookup: ServiceLookup,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            roster,
            lookup,
            service_name: service_name.into(),
        }
    }

    pub fn roster(&self) -> &Arc<BrokerRoster> {
        &self.roster
    }

    /// Next broker in rotation.
    ///
    /// An empty roster is bootstrapped with a directory listing first. The roster lock is
    /// not held while listing.
    ///
    /// # Errors
    /// Lookup failures of the bootstrap, or [`Error::ServiceNotFound`] when nothing resolves.
    pub async fn get_broker(&self) -> Result<String> {
        if let Some(broker) = self.roster.next() {
            return Ok(broker);
        }

        debug!(service = %self.service_name, "broker roster empty, bootstrapping");
        let found = self.lookup.get_services(&self.service_name).await?;
        let added = self.roster.extend_absent(found);
        debug!(service = %self.service_name, added, "broker roster bootstrapped");

        self.roster.next().ok_or_else(|| Error::ServiceNotFound {
            name: self.service_name.clone(),
            path: self.lookup.service_path(&self.service_name),
        })
    }
}
