// ── Domain model ──
//
// Canonical types shared by the session, the state aggregator, and
// consumers. Nothing here talks to the network.

pub mod device;
pub mod release;
pub mod state;

pub use device::{DeviceId, DeviceRecord, DeviceSettings};
pub use release::Release;
pub use state::{ConnectionState, DisplayState};
