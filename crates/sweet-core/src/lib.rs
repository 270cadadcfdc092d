//! Connection and live-state synchronization for sweet candy dispensers.
//!
//! This crate sits between `sweet-api` (the RPC transport) and whatever
//! presents a dispenser to a user (the `sweet` CLI, or a GUI host):
//!
//! - **[`Session`]**: Owns one device connection: address guard, transport
//!   setup, the initial `GetInfo` round trip, the dispense subscription and
//!   command dispatch. Connection results from superseded attempts are
//!   discarded by generation.
//!
//! - **[`DeviceState`]**: Reactive cells for every device attribute, plus
//!   the derived [`DisplayState`] and update availability. Settings changes
//!   are written through to a [`DeviceRecordStore`].
//!
//! - **[`MainContext`]**: The single mutation context. Background tasks
//!   post closures here instead of touching cells directly.
//!
//! - **[`Command`]**: Typed control requests. Cells change only after the
//!   device acknowledges.

pub mod command;
pub mod config;
pub mod context;
mod dispense;
pub mod error;
pub mod model;
pub mod release;
pub mod session;
pub mod store;
pub mod stream;
pub mod version;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::SessionConfig;
pub use context::{MainContext, MainLoop, main_context};
pub use error::CoreError;
pub use model::{ConnectionState, DeviceId, DeviceRecord, DeviceSettings, DisplayState, Release};
pub use release::{ReleaseSource, StaticRelease};
pub use session::{Session, SessionBuilder, SessionNotice};
pub use store::{DeviceRecordStore, DeviceState, MemoryStore, Observable, Subscription};
pub use stream::CellStream;
pub use version::{is_version_higher_or_equal, is_version_higher_than};
