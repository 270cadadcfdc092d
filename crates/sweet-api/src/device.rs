// Device-facing RPC seam.
//
// `DeviceRpc` is the call surface the core drives; `Connector` builds one
// bound to a device address. The gRPC implementation lives in `client`,
// tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Error;
use crate::proto;

/// Device information as returned by `GetInfo`.
///
/// Strings are passed through verbatim: an empty `version`, `commit` or
/// `remote_node_uri` means the device did not report a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub version: String,
    pub commit: String,
    pub dispense_on_touch: bool,
    pub buzz_on_dispense: bool,
    pub remote_node_uri: String,
}

impl From<proto::GetInfoResponse> for DeviceInfo {
    fn from(res: proto::GetInfoResponse) -> Self {
        Self {
            name: res.name,
            version: res.version,
            commit: res.commit,
            dispense_on_touch: res.dispense_on_touch,
            buzz_on_dispense: res.buzz_on_dispense,
            remote_node_uri: res.remote_node.map(|node| node.uri).unwrap_or_default(),
        }
    }
}

/// A single event from the dispense subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispenseEvent {
    /// `true` while the motor is running.
    pub dispense: bool,
}

impl From<proto::Dispense> for DispenseEvent {
    fn from(msg: proto::Dispense) -> Self {
        Self {
            dispense: msg.dispense,
        }
    }
}

/// Server stream of dispense events. Ends on device close or error.
pub type DispenseStream = BoxStream<'static, Result<DispenseEvent, Error>>;

/// RPC surface of a candy dispenser.
#[async_trait]
pub trait DeviceRpc: Send + Sync {
    async fn get_info(&self) -> Result<DeviceInfo, Error>;

    /// Open the long-lived dispense subscription.
    async fn subscribe_dispenses(&self) -> Result<DispenseStream, Error>;

    async fn set_dispense_on_touch(&self, enable: bool) -> Result<(), Error>;

    async fn set_buzz_on_dispense(&self, enable: bool) -> Result<(), Error>;

    async fn set_name(&self, name: &str) -> Result<(), Error>;

    /// Start (`true`) or stop (`false`) the motor manually.
    async fn toggle_dispenser(&self, dispense: bool) -> Result<(), Error>;

    async fn reboot(&self) -> Result<(), Error>;

    async fn disconnect_from_remote_node(&self) -> Result<(), Error>;
}

/// Builds a [`DeviceRpc`] bound to a device host.
///
/// Construction must not perform I/O; the first call establishes the
/// connection.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str) -> Result<Arc<dyn DeviceRpc>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_without_remote_node_maps_to_empty_uri() {
        let res = proto::GetInfoResponse {
            name: "Candy".into(),
            version: "0.4.1".into(),
            commit: String::new(),
            dispense_on_touch: true,
            buzz_on_dispense: false,
            remote_node: None,
        };

        let info = DeviceInfo::from(res);
        assert_eq!(info.name, "Candy");
        assert_eq!(info.version, "0.4.1");
        assert!(info.commit.is_empty());
        assert!(info.remote_node_uri.is_empty());
        assert!(info.dispense_on_touch);
    }

    #[test]
    fn info_carries_remote_node_uri() {
        let res = proto::GetInfoResponse {
            remote_node: Some(proto::RemoteNode {
                uri: "lnd.example:10009".into(),
            }),
            ..Default::default()
        };

        assert_eq!(DeviceInfo::from(res).remote_node_uri, "lnd.example:10009");
    }
}
