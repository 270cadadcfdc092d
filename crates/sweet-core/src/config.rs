// ── Runtime session configuration ──
//
// These types describe *how* a session talks to its dispenser. They never
// touch disk; the CLI (or any host app) builds a `SessionConfig` and hands
// it in.

use std::time::Duration;

use sweet_api::{DEFAULT_PORT, TransportConfig};

/// Configuration for one device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Device RPC port.
    pub port: u16,
    /// Per-request timeout. `None` keeps the transport default.
    pub request_timeout: Option<Duration>,
    /// Compare the device version against the latest release. Off by
    /// default, in which case `update_available` is always `false`.
    pub update_check_enabled: bool,
    /// Treat the end of the dispense subscription as connectivity loss:
    /// publish `unreachable` and emit a `StreamTerminated` notice.
    pub report_stream_termination: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            request_timeout: None,
            update_check_enabled: false,
            report_stream_termination: true,
        }
    }
}

impl SessionConfig {
    /// Transport settings derived from this config.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            port: self.port,
            timeout: self.request_timeout,
        }
    }
}
