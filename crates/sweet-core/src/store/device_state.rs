// ── Device state aggregator ──
//
// Reactive cells for one dispenser. The five persisted attributes, the
// session-driven connection and dispensing flags, the remote-node link and
// the latest release each live in their own `Observable`. Display state and
// update availability are derived cells kept current by internal observers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use sweet_api::DeviceInfo;

use super::observable::Observable;
use crate::model::{ConnectionState, DeviceSettings, DisplayState, Release};
use crate::version;

type SettingsCallback = Arc<dyn Fn(&DeviceSettings) + Send + Sync>;

/// Live view of a single dispenser.
///
/// All setters notify synchronously on the calling thread. The session only
/// mutates cells from its main context, so consumers never observe a cell
/// being written concurrently.
pub struct DeviceState {
    name: Observable<String>,
    version: Observable<String>,
    commit: Observable<String>,
    dispense_on_touch: Observable<bool>,
    buzz_on_dispense: Observable<bool>,

    connection: Observable<ConnectionState>,
    dispensing: Observable<bool>,
    remote_node: Observable<Option<String>>,
    latest_release: Observable<Option<Release>>,

    display: Observable<DisplayState>,
    update_available: Observable<bool>,

    update_check_enabled: bool,
    settings_changed: Mutex<Option<SettingsCallback>>,
    batching: AtomicBool,
}

impl DeviceState {
    /// Build the aggregator seeded from persisted settings. Seeding does not
    /// trigger the settings callback.
    pub fn new(settings: &DeviceSettings, update_check_enabled: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let state = Self {
                name: Observable::new(settings.name.clone()),
                version: Observable::new(settings.version.clone()),
                commit: Observable::new(settings.commit.clone()),
                dispense_on_touch: Observable::new(settings.dispense_on_touch),
                buzz_on_dispense: Observable::new(settings.buzz_on_dispense),
                connection: Observable::new(ConnectionState::Connecting),
                dispensing: Observable::new(false),
                remote_node: Observable::new(None),
                latest_release: Observable::new(None),
                display: Observable::new(DisplayState::Connecting),
                update_available: Observable::new(false),
                update_check_enabled,
                settings_changed: Mutex::new(None),
                batching: AtomicBool::new(false),
            };
            state.link(weak);
            state
        })
    }

    // ── Cell accessors ───────────────────────────────────────────────

    pub fn name(&self) -> &Observable<String> {
        &self.name
    }

    pub fn version(&self) -> &Observable<String> {
        &self.version
    }

    pub fn commit(&self) -> &Observable<String> {
        &self.commit
    }

    pub fn dispense_on_touch(&self) -> &Observable<bool> {
        &self.dispense_on_touch
    }

    pub fn buzz_on_dispense(&self) -> &Observable<bool> {
        &self.buzz_on_dispense
    }

    pub fn connection(&self) -> &Observable<ConnectionState> {
        &self.connection
    }

    pub fn dispensing(&self) -> &Observable<bool> {
        &self.dispensing
    }

    /// URI of the remote node the dispenser is linked to, if any.
    pub fn remote_node(&self) -> &Observable<Option<String>> {
        &self.remote_node
    }

    pub fn latest_release(&self) -> &Observable<Option<Release>> {
        &self.latest_release
    }

    /// Derived; written only by internal observers.
    pub fn display(&self) -> &Observable<DisplayState> {
        &self.display
    }

    /// Derived; always `false` while the update check is disabled.
    pub fn update_available(&self) -> &Observable<bool> {
        &self.update_available
    }

    // ── Snapshots and bulk updates ───────────────────────────────────

    /// Joint snapshot of the five persisted attributes.
    pub fn settings(&self) -> DeviceSettings {
        DeviceSettings {
            name: self.name.get(),
            version: self.version.get(),
            commit: self.commit.get(),
            dispense_on_touch: self.dispense_on_touch.get(),
            buzz_on_dispense: self.buzz_on_dispense.get(),
        }
    }

    /// Register the write-through callback for settings changes.
    ///
    /// Invoked with the full snapshot after any of the five persisted cells
    /// is set. A second registration replaces the first.
    pub fn on_settings_changed(&self, callback: impl Fn(&DeviceSettings) + Send + Sync + 'static) {
        *self.settings_changed.lock() = Some(Arc::new(callback));
    }

    /// Publish a `GetInfo` response.
    ///
    /// Name and both flags are always overwritten. Empty version or commit
    /// strings mean "unknown" and keep the prior value. The remote-node link
    /// is only replaced when the device reports a non-empty URI. The settings
    /// callback fires once for the whole batch.
    pub fn apply_info(&self, info: &DeviceInfo) {
        self.batching.store(true, Ordering::SeqCst);

        self.name.set(info.name.clone());
        if !info.version.is_empty() {
            self.version.set(info.version.clone());
        }
        if !info.commit.is_empty() {
            self.commit.set(info.commit.clone());
        }
        self.dispense_on_touch.set(info.dispense_on_touch);
        self.buzz_on_dispense.set(info.buzz_on_dispense);

        self.batching.store(false, Ordering::SeqCst);
        self.persist();

        if !info.remote_node_uri.is_empty() {
            self.remote_node.set(Some(info.remote_node_uri.clone()));
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn link(&self, weak: &Weak<Self>) {
        let recompute_display = {
            let weak = weak.clone();
            move || {
                if let Some(state) = weak.upgrade() {
                    state.refresh_display();
                }
            }
        };
        let on_connection = recompute_display.clone();
        self.connection.observe(move |_| on_connection()).detach();
        self.dispensing.observe(move |_| recompute_display()).detach();

        let recompute_update = {
            let weak = weak.clone();
            move || {
                if let Some(state) = weak.upgrade() {
                    state.refresh_update_available();
                }
            }
        };
        let on_version = recompute_update.clone();
        self.version.observe(move |_| on_version()).detach();
        self.latest_release
            .observe(move |_| recompute_update())
            .detach();

        let persist = {
            let weak = weak.clone();
            move || {
                if let Some(state) = weak.upgrade() {
                    state.persist();
                }
            }
        };
        let p = persist.clone();
        self.name.observe(move |_| p()).detach();
        let p = persist.clone();
        self.version.observe(move |_| p()).detach();
        let p = persist.clone();
        self.commit.observe(move |_| p()).detach();
        let p = persist.clone();
        self.dispense_on_touch.observe(move |_| p()).detach();
        self.buzz_on_dispense.observe(move |_| persist()).detach();
    }

    fn refresh_display(&self) {
        let display = DisplayState::derive(self.connection.get(), self.dispensing.get());
        self.display.set_distinct(display);
    }

    fn refresh_update_available(&self) {
        let release = self.latest_release.get();
        let available = version::update_available(
            &self.version.get(),
            release.as_ref(),
            self.update_check_enabled,
        );
        self.update_available.set_distinct(available);
    }

    fn persist(&self) {
        if self.batching.load(Ordering::SeqCst) {
            return;
        }
        let callback = self.settings_changed.lock().clone();
        if let Some(callback) = callback {
            callback(&self.settings());
        }
    }
}

impl std::fmt::Debug for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceState")
            .field("settings", &self.settings())
            .field("connection", &self.connection.get())
            .field("dispensing", &self.dispensing.get())
            .field("remote_node", &self.remote_node.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn seeded() -> Arc<DeviceState> {
        DeviceState::new(
            &DeviceSettings {
                name: "Desk".into(),
                version: "1.2.0".into(),
                commit: "abc123".into(),
                dispense_on_touch: true,
                buzz_on_dispense: false,
            },
            false,
        )
    }

    fn capture_writes(state: &DeviceState) -> Arc<Mutex<Vec<DeviceSettings>>> {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&writes);
        state.on_settings_changed(move |s| sink.lock().push(s.clone()));
        writes
    }

    #[test]
    fn display_follows_connection_and_dispensing() {
        let state = seeded();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = state.display().subscribe(move |d| sink.lock().push(*d));

        state.connection().set(ConnectionState::Connected);
        state.dispensing().set(true);
        state.connection().set(ConnectionState::Unreachable);
        state.dispensing().set(false);

        assert_eq!(
            *seen.lock(),
            vec![
                DisplayState::Connecting,
                DisplayState::Connected,
                DisplayState::Dispensing,
                DisplayState::Unreachable,
            ]
        );
    }

    #[test]
    fn each_settings_cell_writes_full_snapshot() {
        let state = seeded();
        let writes = capture_writes(&state);

        state.name().set("Bob".into());
        state.buzz_on_dispense().set(true);

        let writes = writes.lock();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].name, "Bob");
        assert_eq!(writes[0].commit, "abc123");
        assert!(!writes[0].buzz_on_dispense);
        assert!(writes[1].buzz_on_dispense);
    }

    #[test]
    fn non_persisted_cells_do_not_write() {
        let state = seeded();
        let writes = capture_writes(&state);

        state.connection().set(ConnectionState::Connected);
        state.dispensing().set(true);
        state.remote_node().set(Some("node://a".into()));

        assert!(writes.lock().is_empty());
    }

    #[test]
    fn apply_info_keeps_version_when_empty() {
        let state = seeded();
        let writes = capture_writes(&state);

        state.apply_info(&DeviceInfo {
            name: "Hall".into(),
            version: String::new(),
            commit: String::new(),
            dispense_on_touch: false,
            buzz_on_dispense: true,
            remote_node_uri: String::new(),
        });

        assert_eq!(state.version().get(), "1.2.0");
        assert_eq!(state.commit().get(), "abc123");
        assert_eq!(state.name().get(), "Hall");
        assert!(!state.dispense_on_touch().get());
        assert_eq!(state.remote_node().get(), None);
        assert_eq!(writes.lock().len(), 1, "batched into one write");
    }

    #[test]
    fn apply_info_overwrites_non_empty_fields() {
        let state = seeded();

        state.apply_info(&DeviceInfo {
            name: "Hall".into(),
            version: "1.3.0".into(),
            commit: "def456".into(),
            dispense_on_touch: true,
            buzz_on_dispense: true,
            remote_node_uri: "03ab@node.example:9735".into(),
        });

        assert_eq!(state.version().get(), "1.3.0");
        assert_eq!(state.commit().get(), "def456");
        assert_eq!(
            state.remote_node().get().as_deref(),
            Some("03ab@node.example:9735")
        );
    }

    #[test]
    fn update_available_gated_off() {
        let state = seeded();
        state.latest_release().set(Some(Release::new("9.0.0")));
        assert!(!state.update_available().get());
    }

    #[test]
    fn update_available_tracks_release_and_version() {
        let state = DeviceState::new(&DeviceSettings::default(), true);

        state.latest_release().set(Some(Release::new("1.10.0")));
        assert!(state.update_available().get());

        state.version().set("1.10.0".into());
        assert!(!state.update_available().get());
    }

    #[test]
    fn seeding_does_not_persist() {
        let state = seeded();
        let writes = capture_writes(&state);
        assert!(writes.lock().is_empty());
        assert_eq!(state.settings().name, "Desk");
    }
}
