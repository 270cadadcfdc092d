// ── Connection session ──
//
// Lifecycle of one dispenser connection: address guard, transport setup,
// the initial `GetInfo` round trip, the dispense subscription, and command
// dispatch. Network work runs on spawned tasks; every result is marshalled
// back through the main context before it touches a cell.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use sweet_api::{Connector, DeviceInfo, DeviceRpc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, route_command};
use crate::config::SessionConfig;
use crate::context::MainContext;
use crate::dispense::{StreamEnd, spawn_dispense_loop};
use crate::error::CoreError;
use crate::model::{ConnectionState, DeviceId, DeviceRecord};
use crate::release::ReleaseSource;
use crate::store::{DeviceRecordStore, DeviceState, SettingsWriter};

const NOTICE_CHANNEL_SIZE: usize = 64;

// ── SessionNotice ────────────────────────────────────────────────

/// One-shot signals for the host UI. Cell state is the source of truth;
/// notices only say "something happened that a user may want to see".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The device has no known address and must be paired again.
    RepairRequired { device: DeviceId },
    /// Connecting failed. Offer a retry.
    Unreachable { reason: String },
    /// The dispense subscription ended while connected.
    StreamTerminated { reason: String },
    /// A control command was rejected or could not be delivered.
    CommandFailed { command: String, reason: String },
}

// ── Session ──────────────────────────────────────────────────────

/// Handle to a device session.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Does NOT connect on
/// construction; call [`start()`](Self::start).
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    device: DeviceId,
    address: Option<String>,
    state: Arc<DeviceState>,
    main: MainContext,
    connector: Arc<dyn Connector>,
    releases: Option<Arc<dyn ReleaseSource>>,
    notices: broadcast::Sender<SessionNotice>,
    writer: Option<SettingsWriter>,
    /// Live transport handle. Present only between a successful connect
    /// and the next teardown (or stream termination).
    client: ArcSwapOption<LiveClient>,
    /// Bumped on every connect and teardown; results tagged with an older
    /// value are discarded.
    generation: AtomicU64,
    /// Token for the current connection's background tasks.
    cancel: Mutex<CancellationToken>,
}

struct LiveClient {
    rpc: Arc<dyn DeviceRpc>,
    generation: u64,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.cancel.get_mut().cancel();
    }
}

/// Assembles a [`Session`] from its collaborators.
pub struct SessionBuilder {
    record: DeviceRecord,
    config: SessionConfig,
    main: MainContext,
    connector: Arc<dyn Connector>,
    store: Option<Arc<dyn DeviceRecordStore>>,
    releases: Option<Arc<dyn ReleaseSource>>,
}

impl SessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Write settings changes through to `store`. Writes run on a
    /// background task; [`Session::flush`] waits for them. With a store set,
    /// [`build`](Self::build) must run inside a Tokio runtime.
    pub fn store(mut self, store: Arc<dyn DeviceRecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fetch the latest release on every start.
    pub fn releases(mut self, releases: Arc<dyn ReleaseSource>) -> Self {
        self.releases = Some(releases);
        self
    }

    pub fn build(self) -> Session {
        let DeviceRecord {
            id,
            address,
            settings,
        } = self.record;

        let state = DeviceState::new(&settings, self.config.update_check_enabled);
        let writer = self.store.map(|store| {
            let writer = SettingsWriter::spawn(id.clone(), store);
            let queue = writer.clone();
            state.on_settings_changed(move |settings| queue.save(settings.clone()));
            writer
        });

        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);

        Session {
            inner: Arc::new(SessionInner {
                config: self.config,
                device: id,
                address: address.filter(|a| !a.trim().is_empty()),
                state,
                main: self.main,
                connector: self.connector,
                releases: self.releases,
                notices,
                writer,
                client: ArcSwapOption::const_empty(),
                generation: AtomicU64::new(0),
                cancel: Mutex::new(CancellationToken::new()),
            }),
        }
    }
}

impl Session {
    /// Start building a session for `record`. Cell mutations are posted to
    /// `main`; `connector` builds the transport.
    pub fn builder(
        record: DeviceRecord,
        main: MainContext,
        connector: Arc<dyn Connector>,
    ) -> SessionBuilder {
        SessionBuilder {
            record,
            config: SessionConfig::default(),
            main,
            connector,
            store: None,
            releases: None,
        }
    }

    /// Load `device` from `store` and build a session that persists back
    /// into it.
    pub fn open(
        device: &DeviceId,
        store: Arc<dyn DeviceRecordStore>,
        main: MainContext,
        connector: Arc<dyn Connector>,
    ) -> Result<SessionBuilder, CoreError> {
        let record = store.load(device)?.ok_or_else(|| CoreError::Store {
            message: format!("no record for device {device}"),
        })?;
        Ok(Self::builder(record, main, connector).store(store))
    }

    pub fn device(&self) -> &DeviceId {
        &self.inner.device
    }

    pub fn address(&self) -> Option<&str> {
        self.inner.address.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The aggregated device state.
    pub fn state(&self) -> &Arc<DeviceState> {
        &self.inner.state
    }

    /// Subscribe to UI notices emitted after this call.
    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.inner.notices.subscribe()
    }

    /// `true` while a live transport handle is held.
    pub fn is_connected(&self) -> bool {
        self.inner.client.load().is_some()
    }

    /// Wait until every state update queued so far has been applied and
    /// the resulting settings snapshots have been written.
    pub async fn flush(&self) -> bool {
        let applied = self.inner.main.flush().await;
        match &self.inner.writer {
            Some(writer) => applied && writer.flush().await,
            None => applied,
        }
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Full startup: connect, then look up the latest release.
    pub fn start(&self) -> Result<(), CoreError> {
        self.connect()?;
        self.spawn_release_lookup();
        Ok(())
    }

    /// Begin connecting to the device.
    ///
    /// Returns once the attempt is underway; progress is published on the
    /// connection cell. Fails immediately with [`CoreError::NoAddress`]
    /// (and a [`SessionNotice::RepairRequired`]) when the device has no
    /// known address.
    pub fn connect(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        let Some(address) = inner.address.clone() else {
            warn!(device = %inner.device, "no known address, re-pairing required");
            let device = inner.device.clone();
            self.post_notice(SessionNotice::RepairRequired {
                device: device.clone(),
            });
            return Err(CoreError::NoAddress { device });
        };

        let (generation, cancel) = self.begin_generation();
        self.post_connection(ConnectionState::Connecting);
        info!(device = %inner.device, %address, generation, "connecting");

        let rpc = match inner.connector.connect(&address) {
            Ok(rpc) => rpc,
            Err(e) => {
                let reason = e.to_string();
                let session = self.clone();
                let notice_reason = reason.clone();
                inner.main.dispatch(move || {
                    session.fail_connect(generation, notice_reason);
                });
                return Err(CoreError::Unreachable { address, reason });
            }
        };

        let session = self.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                result = rpc.get_info() => result,
            };
            let main = session.inner.main.clone();
            main.dispatch(move || session.finish_connect(generation, rpc, result));
        });

        Ok(())
    }

    /// Drop the current connection and start over from scratch.
    pub fn retry_connection(&self) -> Result<(), CoreError> {
        self.teardown();
        self.start()
    }

    /// Release the transport handle and stop this connection's tasks.
    ///
    /// In-flight results from the superseded connection are discarded.
    /// Dispensing drops to false and, unless a new connect has started in
    /// the meantime, the connection is published as `Unreachable`.
    pub fn teardown(&self) {
        let (generation, _) = self.begin_generation();
        let session = self.clone();
        self.inner.main.dispatch(move || {
            let state = &session.inner.state;
            state.dispensing().set_distinct(false);
            if session.is_current(generation) {
                state.connection().set_distinct(ConnectionState::Unreachable);
            }
        });
        debug!(device = %self.inner.device, generation, "session torn down");
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Issue `cmd` against the live connection.
    ///
    /// Returns `None` (and does nothing) when there is no live connection.
    /// The matching cell is updated on the main context only after the
    /// device acknowledges, and only if the connection the command went out
    /// on is still current; an acknowledgement that arrives after a
    /// teardown or reconnect is reported as `Ok` but leaves state alone.
    /// Failures leave state untouched and emit a
    /// [`SessionNotice::CommandFailed`].
    pub fn execute(&self, cmd: Command) -> Option<JoinHandle<Result<(), CoreError>>> {
        let Some(live) = self.inner.client.load_full() else {
            debug!(command = %cmd, "no live connection, command ignored");
            return None;
        };

        let weak = Arc::downgrade(&self.inner);
        Some(tokio::spawn(async move {
            let result = route_command(live.rpc.as_ref(), &cmd).await;
            let generation = live.generation;

            match result {
                Ok(()) => {
                    debug!(command = %cmd, generation, "command acknowledged");
                    with_session(&weak, move |session| {
                        if session.is_current(generation) {
                            cmd.apply(session.state());
                        } else {
                            debug!(command = %cmd, generation, "stale acknowledgement, state unchanged");
                        }
                    });
                    Ok(())
                }
                Err(e) => {
                    warn!(command = %cmd, error = %e, transient = e.is_transient(), "command failed");
                    let err = CoreError::command(cmd.name(), &e);
                    let notice = SessionNotice::CommandFailed {
                        command: cmd.name().to_owned(),
                        reason: e.to_string(),
                    };
                    with_session(&weak, move |session| {
                        let _ = session.inner.notices.send(notice);
                    });
                    Err(err)
                }
            }
        }))
    }

    pub fn set_dispense_on_touch(&self, enable: bool) -> Option<JoinHandle<Result<(), CoreError>>> {
        self.execute(Command::SetDispenseOnTouch(enable))
    }

    pub fn set_buzz_on_dispense(&self, enable: bool) -> Option<JoinHandle<Result<(), CoreError>>> {
        self.execute(Command::SetBuzzOnDispense(enable))
    }

    pub fn set_name(&self, name: impl Into<String>) -> Option<JoinHandle<Result<(), CoreError>>> {
        self.execute(Command::SetName(name.into()))
    }

    /// Start or stop the motor. Fire-and-forget.
    pub fn toggle_dispenser(&self, dispense: bool) {
        drop(self.execute(Command::ToggleDispenser(dispense)));
    }

    /// Reboot the device. Fire-and-forget; no state changes.
    pub fn reboot(&self) {
        drop(self.execute(Command::Reboot));
    }

    pub fn disconnect_remote_node(&self) -> Option<JoinHandle<Result<(), CoreError>>> {
        self.execute(Command::DisconnectRemoteNode)
    }

    /// Record a remote node link established out of band.
    pub fn complete_remote_node_connection(&self, uri: impl Into<String>) {
        let uri = uri.into();
        let state = Arc::clone(&self.inner.state);
        self.inner.main.dispatch(move || {
            state.remote_node().set(Some(uri));
        });
    }

    /// Run the motor for `hold`, then stop it. Both edges must be
    /// acknowledged.
    pub async fn dispense_for(&self, hold: Duration) -> Result<(), CoreError> {
        await_command(self.execute(Command::ToggleDispenser(true))).await?;
        tokio::time::sleep(hold).await;
        await_command(self.execute(Command::ToggleDispenser(false))).await
    }

    // ── Private helpers ──────────────────────────────────────────

    /// Invalidate the previous connection and hand out a fresh generation
    /// and cancellation token.
    fn begin_generation(&self) -> (u64, CancellationToken) {
        let inner = &self.inner;
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        inner.client.store(None);

        let mut cancel = inner.cancel.lock();
        cancel.cancel();
        *cancel = CancellationToken::new();
        (generation, cancel.clone())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    fn post_connection(&self, connection: ConnectionState) {
        let state = Arc::clone(&self.inner.state);
        self.inner.main.dispatch(move || {
            state.connection().set_distinct(connection);
        });
    }

    fn post_notice(&self, notice: SessionNotice) {
        let notices = self.inner.notices.clone();
        self.inner.main.dispatch(move || {
            let _ = notices.send(notice);
        });
    }

    /// Main-context continuation of `connect`.
    fn finish_connect(
        &self,
        generation: u64,
        rpc: Arc<dyn DeviceRpc>,
        result: Result<DeviceInfo, sweet_api::Error>,
    ) {
        if !self.is_current(generation) {
            debug!(generation, "discarding stale connect result");
            return;
        }

        let info = match result {
            Ok(info) => info,
            Err(e) => {
                debug!(code = ?e.code(), transient = e.is_transient(), "GetInfo failed");
                self.fail_connect(generation, e.to_string());
                return;
            }
        };

        let inner = &self.inner;
        inner.state.apply_info(&info);
        inner.client.store(Some(Arc::new(LiveClient {
            rpc: Arc::clone(&rpc),
            generation,
        })));
        self.start_dispense_stream(generation, rpc);
        inner.state.connection().set_distinct(ConnectionState::Connected);
        info!(
            device = %inner.device,
            name = %info.name,
            version = %inner.state.version().get(),
            "connected"
        );
    }

    /// Main-context failure path of `connect`.
    fn fail_connect(&self, generation: u64, reason: String) {
        if !self.is_current(generation) {
            return;
        }
        warn!(device = %self.inner.device, %reason, "dispenser unreachable");
        self.inner
            .state
            .connection()
            .set_distinct(ConnectionState::Unreachable);
        let _ = self.inner.notices.send(SessionNotice::Unreachable { reason });
    }

    fn start_dispense_stream(&self, generation: u64, rpc: Arc<dyn DeviceRpc>) {
        let cancel = self.inner.cancel.lock().clone();
        let on_event = {
            let weak = Arc::downgrade(&self.inner);
            move |dispense: bool| {
                with_session(&weak, move |session| {
                    if session.is_current(generation) {
                        session.inner.state.dispensing().set(dispense);
                    }
                });
            }
        };
        let on_end = {
            let weak = Arc::downgrade(&self.inner);
            move |end: StreamEnd| {
                with_session(&weak, move |session| session.end_stream(generation, &end));
            }
        };
        spawn_dispense_loop(rpc, cancel, on_event, on_end);
    }

    /// Main-context handling of a dispense subscription that ended on its own.
    fn end_stream(&self, generation: u64, end: &StreamEnd) {
        if !self.is_current(generation) {
            return;
        }
        let reason = end.reason();
        if !self.inner.config.report_stream_termination {
            info!(device = %self.inner.device, %reason, "dispense stream ended");
            return;
        }

        warn!(device = %self.inner.device, %reason, "dispense stream ended, connection lost");
        let inner = &self.inner;
        inner.client.store(None);
        inner.cancel.lock().cancel();
        inner.state.dispensing().set_distinct(false);
        inner
            .state
            .connection()
            .set_distinct(ConnectionState::Unreachable);
        let _ = inner.notices.send(SessionNotice::StreamTerminated { reason });
    }

    fn spawn_release_lookup(&self) {
        let Some(releases) = self.inner.releases.clone() else {
            return;
        };
        let state = Arc::clone(&self.inner.state);
        let main = self.inner.main.clone();

        tokio::spawn(async move {
            match releases.latest_release().await {
                Ok(release) => {
                    debug!(version = ?release.as_ref().map(|r| &r.version), "latest release");
                    main.dispatch(move || state.latest_release().set(release));
                }
                Err(e) => warn!(error = %e, "release lookup failed"),
            }
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.inner.device)
            .field("address", &self.inner.address)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Post `f` to the main context if the session is still alive.
fn with_session(weak: &Weak<SessionInner>, f: impl FnOnce(&Session) + Send + 'static) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let session = Session { inner };
    let main = session.inner.main.clone();
    main.dispatch(move || f(&session));
}

async fn await_command(handle: Option<JoinHandle<Result<(), CoreError>>>) -> Result<(), CoreError> {
    let handle = handle.ok_or(CoreError::NotConnected)?;
    handle
        .await
        .map_err(|e| CoreError::Internal(format!("command task failed: {e}")))?
}
