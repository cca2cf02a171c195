use std::fmt;

use serde::Deserialize;

use crate::DecodeError;

/// Network location of a discovered node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeDescriptor {
    pub address: String,
    pub port: u16,
}

impl NodeDescriptor {
    pub fn new(
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// `address:port`
    pub fn host_and_port(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Turns a decompressed node payload into a [`NodeDescriptor`].
///
/// Any `Fn(&[u8]) -> Result<NodeDescriptor, DecodeError>` closure is a decoder.
pub trait NodeDecoder: Send + Sync + 'static {
    fn decode(
        &self,
        payload: &[u8],
    ) -> std::result::Result<NodeDescriptor, DecodeError>;
}

impl<F> NodeDecoder for F
where
    F: Fn(&[u8]) -> std::result::Result<NodeDescriptor, DecodeError> + Send + Sync + 'static,
{
    fn decode(
        &self,
        payload: &[u8],
    ) -> std::result::Result<NodeDescriptor, DecodeError> {
        self(payload)
    }
}

/// Decodes service-instance JSON such as
/// `{"name":"broker","address":"10.0.0.7","port":8082}`; other fields are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNodeDecoder;

#[derive(Deserialize)]
struct ServiceInstance {
    address: Option<String>,
    port: Option<u16>,
}

impl NodeDecoder for JsonNodeDecoder {
    fn decode(
        &self,
        payload: &[u8],
    ) -> std::result::Result<NodeDescriptor, DecodeError> {
        let instance: ServiceInstance = serde_json::from_slice(payload)?;
        let address = instance
            .address
            .filter(|a| !a.is_empty())
            .ok_or(DecodeError::MissingField("address"))?;
        let port = instance.port.ok_or(DecodeError::MissingField("port"))?;
        Ok(NodeDescriptor { address, port })
    }
}
