// ── Reactive state storage ──
//
// Observable cells, the per-device aggregator built from them, and the
// persistence seam the aggregator writes through.

pub(crate) mod device_state;
pub(crate) mod observable;
pub(crate) mod records;
pub(crate) mod writer;

pub use device_state::DeviceState;
pub use observable::{Observable, Subscription};
pub use records::{DeviceRecordStore, MemoryStore};
pub(crate) use writer::SettingsWriter;
