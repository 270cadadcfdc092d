//! Clap derive structures for the `sweet` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sweet -- control and watch candy dispensers on your network
#[derive(Debug, Parser)]
#[command(
    name = "sweet",
    version,
    about = "Control sweet candy dispensers from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Paired device to operate on (defaults to `default_device`)
    #[arg(long, short = 'd', env = "SWEET_DEVICE", global = true)]
    pub device: Option<String>,

    /// Device address, overriding the paired one
    #[arg(long, short = 'a', env = "SWEET_ADDRESS", global = true)]
    pub address: Option<String>,

    /// Config file path
    #[arg(long, env = "SWEET_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to `defaults.output` from the config)
    #[arg(long, short = 'o', env = "SWEET_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, env = "SWEET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// `on` / `off` switch for boolean device settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn enabled(self) -> bool {
        self == Self::On
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pair a dispenser by address
    Pair(PairArgs),

    /// Forget a paired dispenser
    Unpair(UnpairArgs),

    /// List paired dispensers
    #[command(alias = "ls")]
    List,

    /// Connect and show device information
    Info,

    /// Stream live connection and dispensing state
    Watch(WatchArgs),

    /// Change a device setting
    Set(SetArgs),

    /// Run the motor for a moment
    Dispense(DispenseArgs),

    /// Reboot the dispenser
    Reboot,

    /// Remote node link management
    Node(NodeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Pairing ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PairArgs {
    /// Identifier for the device (letters, digits, '-' and '_')
    pub id: String,

    /// IP address or hostname of the dispenser
    pub address: String,

    /// RPC port, if not the default
    #[arg(long)]
    pub port: Option<u16>,

    /// Make this the default device
    #[arg(long)]
    pub default: bool,
}

#[derive(Debug, Args)]
pub struct UnpairArgs {
    /// Identifier of the device to forget
    pub id: String,
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit on connection loss instead of reconnecting
    #[arg(long)]
    pub no_retry: bool,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    #[command(subcommand)]
    pub setting: SetCommand,
}

#[derive(Debug, Subcommand)]
pub enum SetCommand {
    /// Rename the dispenser
    Name {
        /// New display name
        name: String,
    },

    /// Dispense when the sensor is touched
    DispenseOnTouch {
        #[arg(value_enum)]
        state: Switch,
    },

    /// Buzz while dispensing
    Buzz {
        #[arg(value_enum)]
        state: Switch,
    },
}

#[derive(Debug, Args)]
pub struct DispenseArgs {
    /// How long to run the motor, in milliseconds
    #[arg(long, default_value = "1000")]
    pub hold_ms: u64,
}

#[derive(Debug, Args)]
pub struct NodeArgs {
    #[command(subcommand)]
    pub command: NodeCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// Show the linked remote node
    Show,

    /// Unlink the dispenser from its remote node
    Disconnect,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
