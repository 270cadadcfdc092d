// ── Device identity and persisted settings ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a paired dispenser, as assigned by the pairing registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Joint snapshot of the five persisted device attributes.
///
/// Always written as a whole; partial updates never reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub name: String,
    pub version: String,
    pub commit: String,
    pub dispense_on_touch: bool,
    pub buzz_on_dispense: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: "0.0.0".into(),
            commit: String::new(),
            dispense_on_touch: false,
            buzz_on_dispense: false,
        }
    }
}

/// A paired dispenser as known to the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub id: DeviceId,
    /// Last known IP address or hostname. `None` forces re-pairing.
    pub address: Option<String>,
    pub settings: DeviceSettings,
}

impl DeviceRecord {
    pub fn new(id: impl Into<DeviceId>, address: Option<String>) -> Self {
        Self {
            id: id.into(),
            address,
            settings: DeviceSettings::default(),
        }
    }
}
