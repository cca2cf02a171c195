use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Coordination-service session settings and the root of the path layout
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoordinatorConfig {
    /// Comma separated `host:port` list
    #[serde(default = "default_hosts")]
    pub hosts: String,

    /// Session timeout (unit: milliseconds)
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// Gzip node payloads on write. Reads always accept both forms.
    #[serde(default = "default_enable_compression")]
    pub enable_compression: bool,

    /// Root under which `announcements`, `segments` and `discovery` live
    #[serde(default = "default_root_path")]
    pub root_path: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            session_timeout_ms: default_session_timeout_ms(),
            enable_compression: default_enable_compression(),
            root_path: default_root_path(),
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hosts.split(',').all(|h| h.trim().is_empty()) {
            return Err(Error::InvalidConfig("coordinator.hosts cannot be empty".into()));
        }

        if self.session_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "coordinator.session_timeout_ms must be greater than 0".into(),
            ));
        }

        if !self.root_path.starts_with('/') {
            return Err(Error::InvalidConfig(format!(
                "coordinator.root_path must be absolute, got {:?}",
                self.root_path
            )));
        }

        Ok(())
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

fn default_hosts() -> String {
    "127.0.0.1:2181".to_string()
}
fn default_session_timeout_ms() -> u64 {
    30_000
}
fn default_enable_compression() -> bool {
    true
}
fn default_root_path() -> String {
    "/druid".to_string()
}
