// ── Connection and display states ──

use serde::Serialize;
use strum::Display;

/// Connectivity of the session, driven only by the session itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Unreachable,
}

/// What a consumer shows: connectivity merged with dispensing activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DisplayState {
    Connecting,
    Connected,
    Unreachable,
    Dispensing,
}

impl DisplayState {
    /// Merge connectivity and activity. Dispensing wins over any
    /// connection state, including a degraded one.
    pub fn derive(connection: ConnectionState, dispensing: bool) -> Self {
        if dispensing {
            return Self::Dispensing;
        }
        match connection {
            ConnectionState::Connected => Self::Connected,
            ConnectionState::Connecting => Self::Connecting,
            ConnectionState::Unreachable => Self::Unreachable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ConnectionState; 3] = [
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Unreachable,
    ];

    #[test]
    fn dispensing_overrides_every_connection_state() {
        for connection in ALL {
            assert_eq!(
                DisplayState::derive(connection, true),
                DisplayState::Dispensing,
                "{connection} while dispensing"
            );
        }
    }

    #[test]
    fn idle_maps_connection_state_through() {
        assert_eq!(
            DisplayState::derive(ConnectionState::Connected, false),
            DisplayState::Connected
        );
        assert_eq!(
            DisplayState::derive(ConnectionState::Connecting, false),
            DisplayState::Connecting
        );
        assert_eq!(
            DisplayState::derive(ConnectionState::Unreachable, false),
            DisplayState::Unreachable
        );
    }

    #[test]
    fn states_render_lowercase() {
        assert_eq!(ConnectionState::Unreachable.to_string(), "unreachable");
        assert_eq!(DisplayState::Dispensing.to_string(), "dispensing");
    }
}
