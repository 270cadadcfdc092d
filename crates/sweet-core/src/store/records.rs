// ── Device record persistence seam ──

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::CoreError;
use crate::model::{DeviceId, DeviceRecord, DeviceSettings};

/// Persistent registry of paired dispensers.
///
/// The session writes the full settings snapshot whenever any persisted
/// attribute changes. Writes run on the blocking pool, one at a time and
/// in order, so implementations may do synchronous I/O.
pub trait DeviceRecordStore: Send + Sync {
    fn load(&self, id: &DeviceId) -> Result<Option<DeviceRecord>, CoreError>;

    fn save_settings(&self, id: &DeviceId, settings: &DeviceSettings) -> Result<(), CoreError>;
}

/// In-process store. Useful for hosts that persist elsewhere, and for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<DeviceId, DeviceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: DeviceRecord) {
        self.records.lock().insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DeviceRecordStore for MemoryStore {
    fn load(&self, id: &DeviceId) -> Result<Option<DeviceRecord>, CoreError> {
        Ok(self.records.lock().get(id).cloned())
    }

    fn save_settings(&self, id: &DeviceId, settings: &DeviceSettings) -> Result<(), CoreError> {
        let mut records = self.records.lock();
        let record = records
            .entry(id.clone())
            .or_insert_with(|| DeviceRecord::new(id.clone(), None));
        record.settings = settings.clone();
        Ok(())
    }
}
