//! Configuration and pairing registry for sweet dispenser tools.
//!
//! TOML device profiles, layered loading (defaults, file, environment),
//! and translation to `sweet_core` session types. The file doubles as the
//! device record store: [`FileDeviceStore`] writes settings changes back
//! into the matching `[devices.<id>]` table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use sweet_core::{
    CoreError, DeviceId, DeviceRecord, DeviceRecordStore, DeviceSettings, SessionConfig,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no device selected; pass --device or pair one first")]
    NoDevice,

    #[error("device '{id}' is not paired")]
    UnknownDevice { id: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Device used when none is given on the command line.
    pub default_device: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Paired devices, keyed by id.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceProfile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds. Unset means no deadline.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Compare device firmware against the latest release.
    #[serde(default)]
    pub update_check: bool,

    /// Treat the end of the dispense subscription as connection loss.
    #[serde(default = "default_true")]
    pub report_stream_termination: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            port: default_port(),
            timeout: None,
            update_check: false,
            report_stream_termination: true,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_port() -> u16 {
    SessionConfig::default().port
}
fn default_true() -> bool {
    true
}
fn default_version() -> String {
    DeviceSettings::default().version
}

/// A paired dispenser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceProfile {
    /// IP address or hostname. Missing means the device must be re-paired.
    pub address: Option<String>,

    /// Override the default RPC port.
    pub port: Option<u16>,

    #[serde(default)]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub commit: String,

    #[serde(default)]
    pub dispense_on_touch: bool,

    #[serde(default)]
    pub buzz_on_dispense: bool,
}

impl DeviceProfile {
    pub fn new(address: Option<String>) -> Self {
        let settings = DeviceSettings::default();
        Self {
            address,
            port: None,
            name: settings.name,
            version: settings.version,
            commit: settings.commit,
            dispense_on_touch: settings.dispense_on_touch,
            buzz_on_dispense: settings.buzz_on_dispense,
        }
    }

    pub fn settings(&self) -> DeviceSettings {
        DeviceSettings {
            name: self.name.clone(),
            version: self.version.clone(),
            commit: self.commit.clone(),
            dispense_on_touch: self.dispense_on_touch,
            buzz_on_dispense: self.buzz_on_dispense,
        }
    }

    pub fn apply_settings(&mut self, settings: &DeviceSettings) {
        self.name.clone_from(&settings.name);
        self.version.clone_from(&settings.version);
        self.commit.clone_from(&settings.commit);
        self.dispense_on_touch = settings.dispense_on_touch;
        self.buzz_on_dispense = settings.buzz_on_dispense;
    }

    pub fn to_record(&self, id: &str) -> DeviceRecord {
        DeviceRecord {
            id: DeviceId::new(id),
            address: self.address.clone(),
            settings: self.settings(),
        }
    }
}

// ── Pairing registry ────────────────────────────────────────────────

impl Config {
    /// Add or re-address a device. The first paired device becomes the
    /// default.
    pub fn pair(&mut self, id: &str, address: &str) -> Result<&mut DeviceProfile, ConfigError> {
        validate_id(id)?;
        let address = address.trim();
        if address.is_empty() {
            return Err(ConfigError::Validation {
                field: "address".into(),
                reason: "must not be empty".into(),
            });
        }

        if self.default_device.is_none() {
            self.default_device = Some(id.to_owned());
        }
        let profile = self
            .devices
            .entry(id.to_owned())
            .or_insert_with(|| DeviceProfile::new(None));
        profile.address = Some(address.to_owned());
        Ok(profile)
    }

    /// Forget a device. Clears the default if it pointed there.
    pub fn unpair(&mut self, id: &str) -> Result<DeviceProfile, ConfigError> {
        let profile = self
            .devices
            .remove(id)
            .ok_or_else(|| ConfigError::UnknownDevice { id: id.to_owned() })?;
        if self.default_device.as_deref() == Some(id) {
            self.default_device = self.devices.keys().next().cloned();
        }
        Ok(profile)
    }

    /// Pick the device to operate on: explicit id, then the default.
    pub fn resolve_device<'a>(
        &'a self,
        explicit: Option<&'a str>,
    ) -> Result<(&'a str, &'a DeviceProfile), ConfigError> {
        let id = explicit
            .or(self.default_device.as_deref())
            .ok_or(ConfigError::NoDevice)?;
        let profile = self
            .devices
            .get(id)
            .ok_or_else(|| ConfigError::UnknownDevice { id: id.to_owned() })?;
        Ok((id, profile))
    }

    /// Session settings for `profile`, layered over `[defaults]`.
    pub fn session_config(&self, profile: &DeviceProfile) -> SessionConfig {
        SessionConfig {
            port: profile.port.unwrap_or(self.defaults.port),
            request_timeout: self.defaults.timeout.map(Duration::from_secs),
            update_check_enabled: self.defaults.update_check,
            report_stream_termination: self.defaults.report_stream_termination,
        }
    }
}

fn validate_id(id: &str) -> Result<(), ConfigError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: "device id".into(),
            reason: format!("'{id}' may only contain letters, digits, '-' and '_'"),
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "sweet", "sweet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sweet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, `path`, and `SWEET_*` environment
/// variables (nested keys separated by `__`, e.g. `SWEET_DEFAULTS__PORT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SWEET_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), devices = config.devices.len(), "loaded config");
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── File-backed record store ────────────────────────────────────────

/// [`DeviceRecordStore`] over the TOML config file.
///
/// Holds the loaded config in memory and rewrites the whole file on every
/// settings change.
#[derive(Debug)]
pub struct FileDeviceStore {
    path: PathBuf,
    config: Mutex<Config>,
}

impl FileDeviceStore {
    pub fn new(path: PathBuf, config: Config) -> Self {
        Self {
            path,
            config: Mutex::new(config),
        }
    }

    /// Load `path` and wrap it.
    pub fn open(path: PathBuf) -> Result<Self, ConfigError> {
        let config = load_config_from(&path)?;
        Ok(Self::new(path, config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the in-memory config.
    pub fn config(&self) -> Config {
        self.config.lock().clone()
    }
}

impl DeviceRecordStore for FileDeviceStore {
    fn load(&self, id: &DeviceId) -> Result<Option<DeviceRecord>, CoreError> {
        let config = self.config.lock();
        Ok(config
            .devices
            .get(id.as_str())
            .map(|profile| profile.to_record(id.as_str())))
    }

    fn save_settings(&self, id: &DeviceId, settings: &DeviceSettings) -> Result<(), CoreError> {
        let mut config = self.config.lock();
        let Some(profile) = config.devices.get_mut(id.as_str()) else {
            return Err(CoreError::Store {
                message: format!("device '{id}' is not paired"),
            });
        };
        if profile.settings() == *settings {
            return Ok(());
        }
        profile.apply_settings(settings);

        save_config_to(&config, &self.path).map_err(|e| CoreError::Store {
            message: e.to_string(),
        })?;
        debug!(device = %id, "persisted device settings");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn first_pair_becomes_default() {
        let mut config = Config::default();
        config.pair("kitchen", "10.0.0.5").unwrap();
        config.pair("desk", "10.0.0.6").unwrap();

        assert_eq!(config.default_device.as_deref(), Some("kitchen"));
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn pair_again_updates_address_only() {
        let mut config = Config::default();
        config.pair("kitchen", "10.0.0.5").unwrap().name = "Kitchen".into();
        config.pair("kitchen", "10.0.0.9").unwrap();

        let profile = &config.devices["kitchen"];
        assert_eq!(profile.address.as_deref(), Some("10.0.0.9"));
        assert_eq!(profile.name, "Kitchen");
    }

    #[test]
    fn pair_rejects_bad_input() {
        let mut config = Config::default();
        assert!(matches!(
            config.pair("kitchen sink", "10.0.0.5"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(matches!(
            config.pair("kitchen", "  "),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn unpair_moves_default() {
        let mut config = Config::default();
        config.pair("a", "10.0.0.1").unwrap();
        config.pair("b", "10.0.0.2").unwrap();

        config.unpair("a").unwrap();
        assert_eq!(config.default_device.as_deref(), Some("b"));

        config.unpair("b").unwrap();
        assert_eq!(config.default_device, None);
        assert!(matches!(
            config.unpair("b"),
            Err(ConfigError::UnknownDevice { .. })
        ));
    }

    #[test]
    fn resolve_prefers_explicit_device() {
        let mut config = Config::default();
        config.pair("a", "10.0.0.1").unwrap();
        config.pair("b", "10.0.0.2").unwrap();

        assert_eq!(config.resolve_device(None).unwrap().0, "a");
        assert_eq!(config.resolve_device(Some("b")).unwrap().0, "b");
        assert!(matches!(
            config.resolve_device(Some("c")),
            Err(ConfigError::UnknownDevice { .. })
        ));
        assert!(matches!(
            Config::default().resolve_device(None),
            Err(ConfigError::NoDevice)
        ));
    }

    #[test]
    fn session_config_layers_profile_over_defaults() {
        let mut config = Config::default();
        config.defaults.timeout = Some(5);
        config.defaults.update_check = true;
        let profile = config.pair("a", "10.0.0.1").unwrap();
        profile.port = Some(9100);
        let profile = profile.clone();

        let session = config.session_config(&profile);
        assert_eq!(session.port, 9100);
        assert_eq!(session.request_timeout, Some(Duration::from_secs(5)));
        assert!(session.update_check_enabled);
        assert!(session.report_stream_termination);
    }

    #[test]
    fn defaults_use_device_port() {
        assert_eq!(Defaults::default().port, 9000);
        assert_eq!(DeviceProfile::new(None).version, "0.0.0");
    }
}
