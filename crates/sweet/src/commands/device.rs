//! Device command handlers: info, watch, settings, and control.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use sweet_core::{Command as CoreCommand, CoreError, DisplayState, Session, SessionNotice};

use crate::cli::{
    Command, DispenseArgs, GlobalOpts, NodeArgs, NodeCommand, OutputFormat, SetArgs, SetCommand,
    WatchArgs,
};
use crate::error::CliError;
use crate::output;

use super::util::{self, DeviceContext};

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DeviceView {
    id: String,
    address: Option<String>,
    name: String,
    version: String,
    commit: String,
    dispense_on_touch: bool,
    buzz_on_dispense: bool,
    remote_node: Option<String>,
    state: DisplayState,
    update_available: bool,
}

impl DeviceView {
    fn capture(session: &Session) -> Self {
        let state = session.state();
        let settings = state.settings();
        Self {
            id: session.device().to_string(),
            address: session.address().map(str::to_owned),
            name: settings.name,
            version: settings.version,
            commit: settings.commit,
            dispense_on_touch: settings.dispense_on_touch,
            buzz_on_dispense: settings.buzz_on_dispense,
            remote_node: state.remote_node().get(),
            state: state.display().get(),
            update_available: state.update_available().get(),
        }
    }
}

fn detail(d: &DeviceView) -> String {
    let mut lines = vec![
        format!("ID:                {}", d.id),
        format!("Name:              {}", d.name),
        format!("Address:           {}", d.address.as_deref().unwrap_or("-")),
        format!("State:             {}", d.state),
        format!("Firmware:          {}", d.version),
        format!("Commit:            {}", if d.commit.is_empty() { "-" } else { d.commit.as_str() }),
        format!("Dispense on touch: {}", output::on_off(d.dispense_on_touch)),
        format!("Buzz on dispense:  {}", output::on_off(d.buzz_on_dispense)),
        format!("Remote node:       {}", d.remote_node.as_deref().unwrap_or("-")),
    ];
    if d.update_available {
        lines.push("Update available:  yes".into());
    }
    lines.join("\n")
}

#[derive(Serialize)]
struct StateLine<'a> {
    device: &'a str,
    state: DisplayState,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = util::open_session(global)?;

    if let Command::Watch(args) = cmd {
        return watch(&ctx, &args, global).await;
    }

    ctx.connect().await?;
    let result = run(&ctx, cmd, global).await;
    ctx.close().await;
    result
}

async fn run(ctx: &DeviceContext, cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let session = &ctx.session;

    match cmd {
        Command::Info => {
            let view = DeviceView::capture(session);
            let out = output::render_single(ctx.format, &view, detail, |d| d.name.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        Command::Set(SetArgs { setting }) => set(ctx, setting, global).await,

        Command::Dispense(DispenseArgs { hold_ms }) => {
            session.dispense_for(Duration::from_millis(hold_ms)).await?;
            if !global.quiet {
                eprintln!("Dispensed for {hold_ms}ms");
            }
            Ok(())
        }

        Command::Reboot => {
            let name = session.state().name().get();
            if !util::confirm(&format!("Reboot '{name}'?"), "reboot", global.yes)? {
                return Ok(());
            }
            ctx.fire_and_forget(session.execute(CoreCommand::Reboot))
                .await?;
            if !global.quiet {
                eprintln!("Reboot requested");
            }
            Ok(())
        }

        Command::Node(NodeArgs { command }) => node(ctx, command, global).await,

        // Routed elsewhere before a session is opened
        Command::Watch(_)
        | Command::Pair(_)
        | Command::Unpair(_)
        | Command::List
        | Command::Completions(_) => Err(CliError::Internal(
            "command does not target a device session".into(),
        )),
    }
}

async fn set(ctx: &DeviceContext, setting: SetCommand, global: &GlobalOpts) -> Result<(), CliError> {
    let (command, summary) = match setting {
        SetCommand::Name { name } => {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(CliError::Validation {
                    field: "name".into(),
                    reason: "must not be empty".into(),
                });
            }
            let summary = format!("Name set to '{name}'");
            (CoreCommand::SetName(name), summary)
        }
        SetCommand::DispenseOnTouch { state } => (
            CoreCommand::SetDispenseOnTouch(state.enabled()),
            format!("Dispense on touch {}", output::on_off(state.enabled())),
        ),
        SetCommand::Buzz { state } => (
            CoreCommand::SetBuzzOnDispense(state.enabled()),
            format!("Buzz on dispense {}", output::on_off(state.enabled())),
        ),
    };

    ctx.acknowledge(ctx.session.execute(command)).await?;
    if !global.quiet {
        eprintln!("{summary}");
    }
    Ok(())
}

async fn node(ctx: &DeviceContext, command: NodeCommand, global: &GlobalOpts) -> Result<(), CliError> {
    let session = &ctx.session;
    match command {
        NodeCommand::Show => {
            let uri = session.state().remote_node().get();
            let out = match ctx.format {
                OutputFormat::Json | OutputFormat::JsonCompact => {
                    serde_json::json!({ "remote_node": uri }).to_string()
                }
                OutputFormat::Table | OutputFormat::Plain => {
                    uri.unwrap_or_else(|| "not linked".into())
                }
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }
        NodeCommand::Disconnect => {
            let Some(uri) = session.state().remote_node().get() else {
                if !global.quiet {
                    eprintln!("Not linked to a remote node");
                }
                return Ok(());
            };
            if !util::confirm(
                &format!("Disconnect from {uri}?"),
                "node disconnect",
                global.yes,
            )? {
                return Ok(());
            }
            ctx.acknowledge(session.disconnect_remote_node()).await?;
            if !global.quiet {
                eprintln!("Disconnected from remote node");
            }
            Ok(())
        }
    }
}

// ── Watch ───────────────────────────────────────────────────────────

async fn watch(ctx: &DeviceContext, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = &ctx.session;
    let color = output::should_color(global.color);
    let mut notices = session.notices();
    let mut display = session.state().display().stream();

    restart(session, || session.start())?;
    print_state(ctx, *display.current(), color, global.quiet)?;

    let mut attempt: u32 = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
            state = display.changed() => {
                let Some(state) = state else { break };
                if state == DisplayState::Connected {
                    attempt = 0;
                }
                print_state(ctx, state, color, global.quiet)?;
            }
            notice = notices.recv() => match notice {
                Ok(SessionNotice::Unreachable { reason } | SessionNotice::StreamTerminated { reason }) => {
                    if args.no_retry {
                        ctx.close().await;
                        return Err(CliError::ConnectionLost { reason });
                    }
                    let delay = util::backoff(attempt);
                    attempt = attempt.saturating_add(1);
                    warn!(%reason, ?delay, attempt, "connection lost, retrying");

                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                    restart(session, || session.retry_connection())?;
                }
                Ok(SessionNotice::RepairRequired { device }) => {
                    return Err(CliError::RepairRequired { id: device.to_string() });
                }
                Ok(SessionNotice::CommandFailed { command, reason }) => {
                    warn!(%command, %reason, "command failed");
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "notice receiver lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    ctx.close().await;
    Ok(())
}

/// Run a (re)connect, tolerating failures that the notice stream will
/// report and retry.
fn restart(
    session: &Session,
    start: impl FnOnce() -> Result<(), CoreError>,
) -> Result<(), CliError> {
    match start() {
        Err(e) if !e.is_recoverable() => Err(e.into()),
        Err(e) => {
            debug!(device = %session.device(), error = %e, "connect attempt failed");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn print_state(
    ctx: &DeviceContext,
    state: DisplayState,
    color: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let device = ctx.session.device().as_str();
    let line = match ctx.format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(&StateLine { device, state })?
        }
        OutputFormat::Plain => state.to_string(),
        OutputFormat::Table => {
            let name = ctx.session.state().name().get();
            let label = if name.is_empty() { device.to_owned() } else { name };
            format!("{label}  {}", output::paint_state(state, color))
        }
    };
    output::print_output(&line, quiet);
    Ok(())
}
