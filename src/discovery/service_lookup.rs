use std::fmt::Debug;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::metrics::LOOKUP_FAILURES;
use crate::utils::path::join_path;
use crate::ClusterConnection;
use crate::DiscoveryConfig;
use crate::Error;
use crate::NodeDecoder;
use crate::Result;

/// Blocking-style directory listing plus decode for any named service
#[derive(Clone)]
pub struct ServiceLookup {
    connection: ClusterConnection,
    discovery: DiscoveryConfig,
    decoder: Arc<dyn NodeDecoder>,
}

impl Debug for ServiceLookup {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ServiceLookup")
            .field("discovery", &self.discovery)
            .finish_non_exhaustive()
    }
}

impl ServiceLookup {
    pub fn new(
        connection: ClusterConnection,
        discovery: DiscoveryConfig,
        decoder: Arc<dyn NodeDecoder>,
    ) -> Self {
        Self {
            connection,
            discovery,
            decoder,
        }
    }

    /// Path listed for `name`, after prefix qualification
    pub fn service_path(
        &self,
        name: &str,
    ) -> String {
        self.connection.discovery_path(&self.discovery.qualify(name))
    }

    /// `address:port` of every resolvable instance of `name`, in listing order.
    ///
    /// Instances whose data cannot be read or decoded are skipped.
    ///
    /// # Errors
    /// - [`Error::Lookup`] when the directory listing fails
    /// - [`Error::ServiceNotFound`] when no instance resolves
    pub async fn get_services(
        &self,
        name: &str,
    ) -> Result<Vec<String>> {
        let path = self.service_path(name);

        let children = match self.connection.get_children(&path).await {
            Ok(children) => children,
            Err(source) => {
                error!(service = name, %path, "service listing failed: {}", source);
                LOOKUP_FAILURES.with_label_values(&[name]).inc();
                return Err(Error::Lookup {
                    name: name.to_string(),
                    path,
                    source,
                });
            }
        };

        // instance reads run concurrently; join_all keeps listing order
        let fetches = children.iter().map(|child| {
            let child_path = join_path(&path, child);
            async move {
                let data = self.connection.get_data(&child_path).await;
                (child_path, data)
            }
        });

        let mut services = Vec::with_capacity(children.len());
        for (child_path, data) in join_all(fetches).await {
            let Some(data) = data else {
                debug!(service = name, path = %child_path, "instance data absent, skipped");
                continue;
            };
            match self.decoder.decode(&data) {
                Ok(node) => services.push(node.host_and_port()),
                Err(e) => warn!(service = name, path = %child_path, "undecodable instance skipped: {}", e),
            }
        }

        if services.is_empty() {
            LOOKUP_FAILURES.with_label_values(&[name]).inc();
            return Err(Error::ServiceNotFound {
                name: name.to_string(),
                path,
            });
        }
        Ok(services)
    }

    /// First instance of `name`; same failure modes as [`ServiceLookup::get_services`]
    pub async fn get_service(
        &self,
        name: &str,
    ) -> Result<String> {
        let mut services = self.get_services(name).await?;
        Ok(services.swap_remove(0))
    }
}
