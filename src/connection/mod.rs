//! The single coordination-service session shared by every watch.
//!
//! Reads come in two flavours with different failure contracts:
//! - [`ClusterConnection::get_data`] is fail-soft: any failure is logged and reported as
//!   `None`, callers treat that as "ignore this event".
//! - [`ClusterConnection::get_children`] is fail-loud: failures are returned to the caller.


use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::utils::compress;
use crate::utils::path::join_path;
use crate::BackoffPolicy;
use crate::ChildrenWatch;
use crate::CoordinationError;
use crate::CoordinationService;
use crate::CoordinatorConfig;
use crate::Error;
use crate::Result;
use crate::ANNOUNCEMENTS_PATH;
use crate::DISCOVERY_PATH;
use crate::SEGMENTS_PATH;

#[derive(Clone)]
pub struct ClusterConnection {
    service: Arc<dyn CoordinationService>,
    config: CoordinatorConfig,
    retry: BackoffPolicy,
}

impl Debug for ClusterConnection {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClusterConnection")
            .field("hosts", &self.config.hosts)
            .field("root_path", &self.config.root_path)
            .field("enable_compression", &self.config.enable_compression)
            .finish()
    }
}

impl ClusterConnection {
    /// Opens the session under bounded exponential backoff.
    pub async fn connect(
        config: CoordinatorConfig,
        retry: BackoffPolicy,
        service: Arc<dyn CoordinationService>,
    ) -> Result<Self> {
        let session_timeout = config.session_timeout();
        let hosts = config.hosts.clone();

        task_with_timeout_and_exponential_backoff(
            || {
                let service = service.clone();
                let hosts = hosts.clone();
                async move {
                    service
                        .connect(&hosts, session_timeout)
                        .await
                        .map_err(Error::from)
                }
            },
            retry,
        )
        .await?;

        info!(hosts = %config.hosts, root = %config.root_path, "coordination session established");
        Ok(Self {
            service,
            config,
            retry,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> BackoffPolicy {
        self.retry
    }

    /// Gzips `data` when compression is enabled
    pub fn compress(
        &self,
        data: Bytes,
    ) -> Result<Bytes> {
        compress::compress(data, self.config.enable_compression)
            .map_err(|e| Error::Fatal(format!("gzip encoding failed: {e}")))
    }

    /// Gzip decompression falling back to the original bytes
    pub fn decompress(
        &self,
        data: Bytes,
    ) -> Bytes {
        compress::decompress(data)
    }

    /// Fetches and decompresses node data; `None` on any failure.
    pub async fn get_data(
        &self,
        path: &str,
    ) -> Option<Bytes> {
        match self.service.get_data(path).await {
            Ok(raw) => Some(self.decompress(raw)),
            Err(e) => {
                warn!(path, "failed to fetch node data: {}", e);
                None
            }
        }
    }

    /// Lists child names of `path`
    pub async fn get_children(
        &self,
        path: &str,
    ) -> std::result::Result<Vec<String>, CoordinationError> {
        self.service.get_children(path).await
    }

    pub async fn watch_children(
        &self,
        path: &str,
    ) -> std::result::Result<ChildrenWatch, CoordinationError> {
        self.service.watch_children(path).await
    }

    /// Writes a node, compressing the payload when enabled
    pub async fn publish(
        &self,
        path: &str,
        data: Bytes,
    ) -> Result<()> {
        let payload = self.compress(data)?;
        debug!(path, bytes = payload.len(), "publishing node");
        self.service.set_data(path, payload).await?;
        Ok(())
    }

    pub async fn unpublish(
        &self,
        path: &str,
    ) -> Result<()> {
        self.service.delete(path).await?;
        Ok(())
    }

    pub fn announcements_path(&self) -> String {
        join_path(&self.config.root_path, ANNOUNCEMENTS_PATH)
    }

    pub fn segments_root(&self) -> String {
        join_path(&self.config.root_path, SEGMENTS_PATH)
    }

    pub fn segments_path(
        &self,
        worker_key: &str,
    ) -> String {
        join_path(&self.segments_root(), worker_key)
    }

    pub fn discovery_path(
        &self,
        qualified_name: &str,
    ) -> String {
        join_path(&join_path(&self.config.root_path, DISCOVERY_PATH), qualified_name)
    }
}
