// sweet-api: Async Rust client for the sweetrpc candy dispenser service

pub mod client;
pub mod device;
pub mod error;
pub mod proto;
pub mod transport;

pub use client::SweetClient;
pub use device::{Connector, DeviceInfo, DeviceRpc, DispenseEvent, DispenseStream};
pub use error::Error;
pub use transport::{DEFAULT_PORT, GrpcConnector, TransportConfig};
