//! Pairing registry handlers: pair, unpair, list.

use serde::Serialize;
use tabled::Tabled;

use sweet_config::{Config, DeviceProfile, load_config_from, save_config_to};

use crate::cli::{GlobalOpts, PairArgs, UnpairArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct PairedDevice {
    id: String,
    address: Option<String>,
    name: String,
    version: String,
    default: bool,
}

impl PairedDevice {
    fn new(id: &str, profile: &DeviceProfile, config: &Config) -> Self {
        Self {
            id: id.to_owned(),
            address: profile.address.clone(),
            name: profile.name.clone(),
            version: profile.version.clone(),
            default: config.default_device.as_deref() == Some(id),
        }
    }
}

#[derive(Tabled)]
struct PairedRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Firmware")]
    version: String,
}

impl From<&PairedDevice> for PairedRow {
    fn from(d: &PairedDevice) -> Self {
        Self {
            marker: if d.default { "*" } else { "" },
            id: d.id.clone(),
            name: d.name.clone(),
            address: d.address.clone().unwrap_or_else(|| "-".into()),
            version: d.version.clone(),
        }
    }
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn pair(args: PairArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = util::config_path(global);
    let mut config = load_config_from(&path)?;

    let profile = config.pair(&args.id, &args.address)?;
    if args.port.is_some() {
        profile.port = args.port;
    }
    if args.default {
        config.default_device = Some(args.id.clone());
    }
    save_config_to(&config, &path)?;

    if !global.quiet {
        eprintln!("Paired '{}' at {}", args.id, args.address.trim());
    }
    Ok(())
}

pub fn unpair(args: UnpairArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = util::config_path(global);
    let mut config = load_config_from(&path)?;
    if !config.devices.contains_key(&args.id) {
        return Err(CliError::UnknownDevice { id: args.id });
    }

    if !util::confirm(&format!("Forget '{}'?", args.id), "unpair", global.yes)? {
        return Ok(());
    }
    config.unpair(&args.id)?;
    save_config_to(&config, &path)?;

    if !global.quiet {
        eprintln!("Unpaired '{}'", args.id);
    }
    Ok(())
}

pub fn list(global: &GlobalOpts) -> Result<(), CliError> {
    let path = util::config_path(global);
    let config = load_config_from(&path)?;
    let devices: Vec<PairedDevice> = config
        .devices
        .iter()
        .map(|(id, profile)| PairedDevice::new(id, profile, &config))
        .collect();

    let format = util::output_format(global, &config);
    let out = output::render_list(
        format,
        &devices,
        |d| PairedRow::from(d),
        |d| d.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
