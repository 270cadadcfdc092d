//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use sweet_api::GrpcConnector;
use sweet_config::{Config, ConfigError, FileDeviceStore};
use sweet_core::{ConnectionState, CoreError, Session, SessionNotice, main_context};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Upper bound on waiting for the initial `GetInfo` round trip when no
/// request timeout is configured.
const CONNECT_WAIT: Duration = Duration::from_secs(10);

/// Config file selected by `--config`, or the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(sweet_config::config_path)
}

/// Output format from `--output`, falling back to `defaults.output`.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&config.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

// ── Session setup ────────────────────────────────────────────────────

/// A session bound to the device chosen on the command line.
pub struct DeviceContext {
    pub session: Session,
    pub format: OutputFormat,
    connect_wait: Duration,
}

/// Resolve the device, build its session, and spawn the main loop.
/// Does not connect.
pub fn open_session(global: &GlobalOpts) -> Result<DeviceContext, CliError> {
    let path = config_path(global);
    let store = Arc::new(FileDeviceStore::open(path.clone())?);
    let config = store.config();

    let (id, profile) = config
        .resolve_device(global.device.as_deref())
        .map_err(|e| match e {
            ConfigError::NoDevice => CliError::NoDevice {
                path: path.display().to_string(),
            },
            other => other.into(),
        })?;

    let mut record = profile.to_record(id);
    if let Some(ref address) = global.address {
        record.address = Some(address.clone());
    }

    let mut session_config = config.session_config(profile);
    if let Some(secs) = global.timeout {
        session_config.request_timeout = Some(Duration::from_secs(secs));
    }
    let connect_wait = session_config.request_timeout.unwrap_or(CONNECT_WAIT);

    let (main, main_loop) = main_context();
    tokio::spawn(main_loop.run());

    let connector = Arc::new(GrpcConnector::new(session_config.transport()));
    debug!(device = id, address = ?record.address, "opening session");
    let session = Session::builder(record, main, connector)
        .config(session_config)
        .store(store)
        .build();

    Ok(DeviceContext {
        session,
        format: output_format(global, &config),
        connect_wait,
    })
}

impl DeviceContext {
    /// Start the session and wait until it is connected.
    pub async fn connect(&self) -> Result<(), CliError> {
        let mut notices = self.session.notices();
        self.session.start()?;

        let mut connection = self.session.state().connection().stream();
        let settled = tokio::time::timeout(
            self.connect_wait,
            connection.wait_for(|s| *s != ConnectionState::Connecting),
        )
        .await
        .map_err(|_| CliError::Timeout {
            seconds: self.connect_wait.as_secs(),
        })?;

        if settled == Some(ConnectionState::Connected) {
            return Ok(());
        }

        // The notice is sent by the same main-loop job that published the
        // state; flushing guarantees it is in the channel.
        self.session.flush().await;
        Err(CliError::Unreachable {
            address: self.session.address().unwrap_or_default().to_owned(),
            reason: unreachable_reason(&mut notices),
        })
    }

    /// Wait for a command to be acknowledged and its state applied.
    pub async fn acknowledge(
        &self,
        handle: Option<JoinHandle<Result<(), CoreError>>>,
    ) -> Result<(), CliError> {
        let handle = handle.ok_or(CliError::NotConnected)?;
        handle
            .await
            .map_err(|e| CliError::Internal(format!("command task failed: {e}")))??;
        self.session.flush().await;
        Ok(())
    }

    /// Send a command whose outcome the device may not report, such as a
    /// reboot that drops the link. Waits briefly so the request leaves
    /// before the process exits; failures are logged, not returned.
    pub async fn fire_and_forget(
        &self,
        handle: Option<JoinHandle<Result<(), CoreError>>>,
    ) -> Result<(), CliError> {
        settle(handle, FIRE_AND_FORGET_GRACE).await
    }

    /// Drop the connection and let queued writes land.
    pub async fn close(&self) {
        self.session.teardown();
        self.session.flush().await;
    }
}

/// Latest `Unreachable` reason queued on `notices`.
fn unreachable_reason(notices: &mut broadcast::Receiver<SessionNotice>) -> String {
    let mut reason = String::from("connection failed");
    while let Ok(notice) = notices.try_recv() {
        if let SessionNotice::Unreachable { reason: r } = notice {
            reason = r;
        }
    }
    reason
}

const FIRE_AND_FORGET_GRACE: Duration = Duration::from_secs(2);

async fn settle(
    handle: Option<JoinHandle<Result<(), CoreError>>>,
    grace: Duration,
) -> Result<(), CliError> {
    let handle = handle.ok_or(CliError::NotConnected)?;
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => debug!(error = %e, "no acknowledgement, ignoring"),
        Ok(Err(e)) => debug!(error = %e, "command task ended abnormally"),
        Err(_) => debug!(?grace, "no acknowledgement within grace period"),
    }
    Ok(())
}

// ── Reconnect backoff ────────────────────────────────────────────────

const BACKOFF_INITIAL: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Exponential backoff: 1s, 2s, 4s ... capped at 30s.
pub fn backoff(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    BACKOFF_INITIAL.saturating_mul(factor).min(BACKOFF_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_reason_takes_latest() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(SessionNotice::Unreachable {
            reason: "timed out".into(),
        })
        .ok();
        tx.send(SessionNotice::CommandFailed {
            command: "SetName".into(),
            reason: "busy".into(),
        })
        .ok();
        tx.send(SessionNotice::Unreachable {
            reason: "connection refused".into(),
        })
        .ok();

        assert_eq!(unreachable_reason(&mut rx), "connection refused");
        assert_eq!(unreachable_reason(&mut rx), "connection failed");
    }

    #[tokio::test]
    async fn fire_and_forget_ignores_command_failure() {
        let handle = tokio::spawn(async {
            Err::<(), _>(CoreError::CommandFailed {
                command: "Reboot".into(),
                reason: "connection reset".into(),
            })
        });
        assert!(settle(Some(handle), Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn fire_and_forget_gives_up_after_grace() {
        let handle = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok::<(), CoreError>(())
        });
        assert!(settle(Some(handle), Duration::from_millis(10)).await.is_ok());
    }

    #[tokio::test]
    async fn fire_and_forget_needs_connection() {
        assert!(matches!(
            settle(None, Duration::from_millis(10)).await,
            Err(CliError::NotConnected)
        ));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff(0), Duration::from_secs(1));
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(4), Duration::from_secs(16));
        assert_eq!(backoff(5), Duration::from_secs(30));
        assert_eq!(backoff(u32::MAX), Duration::from_secs(30));
    }
}
