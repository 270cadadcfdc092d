//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sweet_config::ConfigError;
use sweet_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Pairing ──────────────────────────────────────────────────────
    #[error("No device selected")]
    #[diagnostic(
        code(sweet::no_device),
        help(
            "Pair a dispenser with: sweet pair <id> <address>\n\
             Or pick one with --device. Config: {path}"
        )
    )]
    NoDevice { path: String },

    #[error("Device '{id}' is not paired")]
    #[diagnostic(
        code(sweet::unknown_device),
        help("Run: sweet list to see paired devices")
    )]
    UnknownDevice { id: String },

    #[error("Device '{id}' has no known address")]
    #[diagnostic(
        code(sweet::repair_required),
        help("Pair it again with: sweet pair {id} <address>")
    )]
    RepairRequired { id: String },

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach dispenser at {address}")]
    #[diagnostic(
        code(sweet::unreachable),
        help(
            "Check that the dispenser is powered on and on the same network.\n\
             Reason: {reason}"
        )
    )]
    Unreachable { address: String, reason: String },

    #[error("Lost connection to the dispenser: {reason}")]
    #[diagnostic(code(sweet::connection_lost), help("Retry with: sweet watch"))]
    ConnectionLost { reason: String },

    #[error("Not connected to a dispenser")]
    #[diagnostic(code(sweet::not_connected))]
    NotConnected,

    #[error("Timed out after {seconds}s waiting for the dispenser")]
    #[diagnostic(
        code(sweet::timeout),
        help("Increase the timeout with --timeout or check the device.")
    )]
    Timeout { seconds: u64 },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("{command} was rejected: {reason}")]
    #[diagnostic(code(sweet::command_failed))]
    CommandFailed { command: String, reason: String },

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sweet::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(sweet::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(sweet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(sweet::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(sweet::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoDevice { .. } | Self::UnknownDevice { .. } | Self::RepairRequired { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Unreachable { .. } | Self::ConnectionLost { .. } | Self::NotConnected => {
                exit_code::CONNECTION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoAddress { device } => CliError::RepairRequired {
                id: device.to_string(),
            },
            CoreError::Unreachable { address, reason } => {
                CliError::Unreachable { address, reason }
            }
            CoreError::StreamTerminated { reason } => CliError::ConnectionLost { reason },
            CoreError::NotConnected => CliError::NotConnected,
            CoreError::CommandFailed { command, reason } => {
                CliError::CommandFailed { command, reason }
            }
            CoreError::Store { message } | CoreError::Release { message } => {
                CliError::Config { message }
            }
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoDevice => CliError::NoDevice {
                path: sweet_config::config_path().display().to_string(),
            },
            ConfigError::UnknownDevice { id } => CliError::UnknownDevice { id },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
