#![allow(clippy::unwrap_used)]
// File round-trip tests for the config loader and `FileDeviceStore`.

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use sweet_config::{Config, FileDeviceStore, load_config_from, save_config_to};
use sweet_core::{DeviceId, DeviceRecordStore, DeviceSettings};

// ── Helpers ─────────────────────────────────────────────────────────

fn paired_config() -> Config {
    let mut config = Config::default();
    config.pair("kitchen", "192.168.1.40").unwrap();
    config
}

// ── Loading tests ───────────────────────────────────────────────────

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.default_device, None);
    assert_eq!(config.defaults.port, 9000);
    assert!(!config.defaults.update_check);
    assert!(config.devices.is_empty());
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_device = "desk"

[defaults]
timeout = 4

[devices.desk]
address = "10.1.1.8"
name = "Desk"
"#,
    )
    .unwrap();

    let config = load_config_from(&path).unwrap();
    let (id, profile) = config.resolve_device(None).unwrap();

    assert_eq!(id, "desk");
    assert_eq!(profile.name, "Desk");
    assert_eq!(profile.version, "0.0.0");
    assert_eq!(config.defaults.timeout, Some(4));
    assert!(config.defaults.report_stream_termination);
}

#[test]
fn test_save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = paired_config();

    save_config_to(&config, &path).unwrap();
    let loaded = load_config_from(&path).unwrap();

    assert_eq!(loaded, config);
}

// ── Record store tests ──────────────────────────────────────────────

#[test]
fn test_store_loads_paired_record() {
    let dir = TempDir::new().unwrap();
    let store = FileDeviceStore::new(dir.path().join("config.toml"), paired_config());

    let record = store.load(&DeviceId::from("kitchen")).unwrap().unwrap();
    assert_eq!(record.address.as_deref(), Some("192.168.1.40"));
    assert_eq!(record.settings, DeviceSettings::default());

    assert!(store.load(&DeviceId::from("garage")).unwrap().is_none());
}

#[test]
fn test_store_writes_settings_to_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    let store = FileDeviceStore::new(path.clone(), paired_config());
    let settings = DeviceSettings {
        name: "Bob".into(),
        version: "1.4.0".into(),
        commit: "a1b2c3".into(),
        dispense_on_touch: true,
        buzz_on_dispense: true,
    };

    store
        .save_settings(&DeviceId::from("kitchen"), &settings)
        .unwrap();

    let reopened = FileDeviceStore::open(path).unwrap();
    let record = reopened.load(&DeviceId::from("kitchen")).unwrap().unwrap();
    assert_eq!(record.settings, settings);
    assert_eq!(record.address.as_deref(), Some("192.168.1.40"));
}

#[test]
fn test_store_rejects_unpaired_device() {
    let dir = TempDir::new().unwrap();
    let store = FileDeviceStore::new(dir.path().join("config.toml"), Config::default());

    let result = store.save_settings(&DeviceId::from("ghost"), &DeviceSettings::default());
    assert!(result.is_err());
    assert!(!store.path().exists());
}
