use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Named-service lookup settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Optional prefix; `broker` becomes `{prefix}:broker`
    #[serde(default)]
    pub service_prefix: Option<String>,

    /// Service name the broker roster is bootstrapped from
    #[serde(default = "default_broker_service")]
    pub broker_service: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_prefix: None,
            broker_service: default_broker_service(),
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.broker_service.trim().is_empty() {
            return Err(Error::InvalidConfig("discovery.broker_service cannot be empty".into()));
        }
        Ok(())
    }

    /// Qualifies a service name so that it maps onto a single path segment
    pub fn qualify(
        &self,
        name: &str,
    ) -> String {
        let qualified = match self.service_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{name}"),
            _ => name.to_string(),
        };
        qualified.replace('/', ":")
    }
}

fn default_broker_service() -> String {
    "broker".to_string()
}
