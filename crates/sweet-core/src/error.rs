// ── Core error types ──
//
// Session-scoped errors. None of these is fatal to the process; every
// variant is recoverable by tearing the session down and retrying.
// The `From<sweet_api::Error>` impl translates transport failures into
// domain variants.

use thiserror::Error;

use crate::model::DeviceId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Device {device} has no known network address")]
    NoAddress { device: DeviceId },

    #[error("Cannot reach dispenser at {address}: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("Dispense subscription ended: {reason}")]
    StreamTerminated { reason: String },

    #[error("Not connected to a dispenser")]
    NotConnected,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("{command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Device record store error: {message}")]
    Store { message: String },

    #[error("Release lookup failed: {message}")]
    Release { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wrap a transport error for a named command.
    pub(crate) fn command(command: impl Into<String>, err: &sweet_api::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: err.to_string(),
        }
    }

    /// `true` if retrying the connection may resolve the error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NoAddress { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sweet_api::Error> for CoreError {
    fn from(err: sweet_api::Error) -> Self {
        match err {
            sweet_api::Error::InvalidAddress { address, reason } => {
                CoreError::Unreachable { address, reason }
            }
            sweet_api::Error::Transport(e) => CoreError::Unreachable {
                address: String::new(),
                reason: e.to_string(),
            },
            sweet_api::Error::StreamClosed => CoreError::StreamTerminated {
                reason: "closed by device".into(),
            },
            err @ sweet_api::Error::Rpc(_) => CoreError::Unreachable {
                address: String::new(),
                reason: err.to_string(),
            },
        }
    }
}
