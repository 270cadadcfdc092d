// ── Command dispatcher ──
//
// Typed control requests for a connected dispenser. Each command maps to
// exactly one unary RPC; the confirmed value is pushed into the state
// aggregator only after the device acknowledges it.

use sweet_api::DeviceRpc;

use crate::store::DeviceState;

/// A control request issued through [`Session::execute`](crate::Session::execute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetDispenseOnTouch(bool),
    SetBuzzOnDispense(bool),
    SetName(String),
    /// Manual motor control for press-and-hold. Fire-and-forget: the
    /// dispensing cell is driven by the event stream, not by this command.
    ToggleDispenser(bool),
    Reboot,
    DisconnectRemoteNode,
}

impl Command {
    /// RPC method name, used in logs and failure notices.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetDispenseOnTouch(_) => "SetDispenseOnTouch",
            Self::SetBuzzOnDispense(_) => "SetBuzzOnDispense",
            Self::SetName(_) => "SetName",
            Self::ToggleDispenser(_) => "ToggleDispenser",
            Self::Reboot => "Reboot",
            Self::DisconnectRemoteNode => "DisconnectFromRemoteNode",
        }
    }

    /// Push the acknowledged value into the aggregator. Must run on the
    /// main context.
    pub(crate) fn apply(&self, state: &DeviceState) {
        match self {
            Self::SetDispenseOnTouch(enable) => state.dispense_on_touch().set(*enable),
            Self::SetBuzzOnDispense(enable) => state.buzz_on_dispense().set(*enable),
            Self::SetName(name) => state.name().set(name.clone()),
            Self::DisconnectRemoteNode => state.remote_node().set(None),
            Self::ToggleDispenser(_) | Self::Reboot => {}
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Command routing ──────────────────────────────────────────────

/// Issue the RPC for `cmd`. Runs off the main context.
pub(crate) async fn route_command(
    rpc: &dyn DeviceRpc,
    cmd: &Command,
) -> Result<(), sweet_api::Error> {
    match cmd {
        Command::SetDispenseOnTouch(enable) => rpc.set_dispense_on_touch(*enable).await,
        Command::SetBuzzOnDispense(enable) => rpc.set_buzz_on_dispense(*enable).await,
        Command::SetName(name) => rpc.set_name(name).await,
        Command::ToggleDispenser(dispense) => rpc.toggle_dispenser(*dispense).await,
        Command::Reboot => rpc.reboot().await,
        Command::DisconnectRemoteNode => rpc.disconnect_from_remote_node().await,
    }
}

#[cfg(test)]
mod tests {
    use crate::model::DeviceSettings;

    use super::*;

    #[test]
    fn apply_updates_matching_cell() {
        let state = DeviceState::new(&DeviceSettings::default(), false);
        state.remote_node().set(Some("node".into()));

        Command::SetName("Bob".into()).apply(&state);
        Command::SetBuzzOnDispense(true).apply(&state);
        Command::DisconnectRemoteNode.apply(&state);

        assert_eq!(state.name().get(), "Bob");
        assert!(state.buzz_on_dispense().get());
        assert_eq!(state.remote_node().get(), None);
    }

    #[test]
    fn fire_and_forget_commands_leave_state_alone() {
        let state = DeviceState::new(&DeviceSettings::default(), false);
        let before = state.settings();

        Command::ToggleDispenser(true).apply(&state);
        Command::Reboot.apply(&state);

        assert!(!state.dispensing().get());
        assert_eq!(state.settings(), before);
    }

    #[test]
    fn display_uses_rpc_name() {
        assert_eq!(Command::DisconnectRemoteNode.to_string(), "DisconnectFromRemoteNode");
        assert_eq!(Command::SetName(String::new()).to_string(), "SetName");
    }
}
