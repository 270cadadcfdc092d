// Shared transport configuration for building tonic channels.
//
// Every device connection goes through `TransportConfig::build_channel`,
// so port, timeout and user agent live in one place.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::client::SweetClient;
use crate::device::{Connector, DeviceRpc};
use crate::error::Error;

/// Port the dispenser's RPC service listens on.
pub const DEFAULT_PORT: u16 = 9000;

const USER_AGENT: &str = concat!("sweet/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building device channels.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub port: u16,
    /// Per-request timeout. `None` keeps the transport default (no deadline).
    pub timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: None,
        }
    }
}

impl TransportConfig {
    /// Channel URI for a device host. IPv6 literals are bracketed.
    pub fn endpoint_uri(&self, host: &str) -> String {
        match host.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("http://[{v6}]:{}", self.port),
            _ => format!("http://{host}:{}", self.port),
        }
    }

    /// Build a lazily-connecting plaintext channel to `host`.
    ///
    /// No I/O happens here; the first call on the channel dials the device.
    pub fn build_channel(&self, host: &str) -> Result<Channel, Error> {
        let uri = self.endpoint_uri(host);
        let invalid = |reason: String| Error::InvalidAddress {
            address: host.to_owned(),
            reason,
        };

        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| invalid(e.to_string()))?
            .user_agent(USER_AGENT)
            .map_err(|e| invalid(e.to_string()))?;

        if let Some(timeout) = self.timeout {
            endpoint = endpoint.timeout(timeout).connect_timeout(timeout);
        }

        debug!(%uri, "built device channel");
        Ok(endpoint.connect_lazy())
    }
}

/// [`Connector`] producing gRPC clients over plaintext HTTP/2.
#[derive(Debug, Clone, Default)]
pub struct GrpcConnector {
    config: TransportConfig,
}

impl GrpcConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl Connector for GrpcConnector {
    fn connect(&self, host: &str) -> Result<Arc<dyn DeviceRpc>, Error> {
        let channel = self.config.build_channel(host)?;
        Ok(Arc::new(SweetClient::new(channel)))
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    #[test]
    fn ipv4_host_uses_fixed_port() {
        let config = TransportConfig::default();
        assert_eq!(config.endpoint_uri("192.168.4.1"), "http://192.168.4.1:9000");
    }

    #[test]
    fn ipv6_host_is_bracketed() {
        let config = TransportConfig::default();
        assert_eq!(config.endpoint_uri("fe80::1"), "http://[fe80::1]:9000");
    }

    #[test]
    fn hostname_is_kept_verbatim() {
        let config = TransportConfig {
            port: 9100,
            timeout: None,
        };
        assert_eq!(config.endpoint_uri("candy.local"), "http://candy.local:9100");
    }

    #[tokio::test]
    async fn build_channel_rejects_garbage_host() {
        let config = TransportConfig::default();
        let result = config.build_channel("not a host");
        assert!(
            matches!(result, Err(Error::InvalidAddress { .. })),
            "expected InvalidAddress, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn connector_is_lazy() {
        // Nothing listens on the TEST-NET address; building must still succeed.
        let connector = GrpcConnector::default();
        assert_ok!(connector.connect("192.0.2.1"));
    }
}
