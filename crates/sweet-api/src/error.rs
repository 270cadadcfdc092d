use thiserror::Error;

/// Top-level error type for the `sweet-api` crate.
///
/// Covers every failure mode of the RPC surface: address handling,
/// channel setup, call status, and stream lifecycle.
/// `sweet-core` maps these into session-scoped diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Addressing ──────────────────────────────────────────────────
    /// The device address could not be turned into a channel endpoint.
    #[error("Invalid device address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP/2 channel error (connection refused, DNS failure, etc.)
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    // ── Calls ───────────────────────────────────────────────────────
    /// The device answered a call with a non-OK status.
    #[error("RPC failed: {0}")]
    Rpc(Box<tonic::Status>),

    // ── Streams ─────────────────────────────────────────────────────
    /// A server stream ended without a terminal status.
    #[error("Stream closed by device")]
    StreamClosed,
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Self::Rpc(Box::new(status))
    }
}

impl Error {
    /// The gRPC status code, when the failure came from a call.
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            Self::Rpc(status) => Some(status.code()),
            _ => None,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::StreamClosed => true,
            Self::Rpc(status) => matches!(
                status.code(),
                tonic::Code::Unavailable | tonic::Code::DeadlineExceeded | tonic::Code::Aborted
            ),
            Self::InvalidAddress { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_status_is_transient() {
        let err = Error::from(tonic::Status::unavailable("device rebooting"));
        assert!(err.is_transient());
        assert_eq!(err.code(), Some(tonic::Code::Unavailable));
    }

    #[test]
    fn invalid_argument_is_not_transient() {
        let err = Error::from(tonic::Status::invalid_argument("name too long"));
        assert!(!err.is_transient());
    }

    #[test]
    fn invalid_address_has_no_code() {
        let err = Error::InvalidAddress {
            address: "::bad".into(),
            reason: "invalid uri".into(),
        };
        assert_eq!(err.code(), None);
        assert!(!err.is_transient());
    }
}
