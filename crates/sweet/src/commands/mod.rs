//! Command dispatch: bridges CLI args -> session operations -> output.

pub mod device;
pub mod pairing;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Pair(args) => pairing::pair(args, global),
        Command::Unpair(args) => pairing::unpair(args, global),
        Command::List => pairing::list(global),
        cmd => device::handle(cmd, global).await,
    }
}
