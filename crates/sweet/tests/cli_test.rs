//! Integration tests for the `sweet` CLI binary.
//!
//! These tests cover argument parsing, pairing registry round trips, and
//! error reporting, all without a live dispenser.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `sweet` binary with env isolation.
///
/// Clears all `SWEET_*` env vars and points config directories into
/// `home` so tests never touch the user's real configuration.
fn sweet_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sweet");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("SWEET_DEVICE")
        .env_remove("SWEET_ADDRESS")
        .env_remove("SWEET_CONFIG")
        .env_remove("SWEET_OUTPUT")
        .env_remove("SWEET_TIMEOUT")
        .env_remove("RUST_LOG")
        .write_stdin("");
    cmd
}

/// Command preconfigured with `--config` inside a fresh temp dir.
fn with_config() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    (dir, path)
}

fn configured(dir: &TempDir, path: &Path) -> assert_cmd::Command {
    let mut cmd = sweet_cmd(dir.path());
    cmd.arg("--config").arg(path);
    cmd
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = sweet_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = String::from_utf8_lossy(&output.stderr);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    sweet_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("pair")
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("dispense"))
            .and(predicate::str::contains("reboot")),
    );
}

#[test]
fn test_completions_zsh() {
    let dir = TempDir::new().unwrap();
    sweet_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_invalid_switch_value() {
    let dir = TempDir::new().unwrap();
    sweet_cmd(dir.path())
        .args(["set", "buzz", "maybe"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("possible values"));
}

// ── Pairing registry ────────────────────────────────────────────────

#[test]
fn test_pair_then_list_json() {
    let (dir, path) = with_config();

    configured(&dir, &path)
        .args(["pair", "kitchen", "192.168.1.40"])
        .assert()
        .success();

    configured(&dir, &path)
        .args(["--output", "json", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""id": "kitchen""#)
                .and(predicate::str::contains(r#""address": "192.168.1.40""#))
                .and(predicate::str::contains(r#""default": true"#)),
        );
}

#[test]
fn test_list_plain_prints_ids() {
    let (dir, path) = with_config();
    for (id, address) in [("desk", "10.0.0.2"), ("hall", "10.0.0.3")] {
        configured(&dir, &path)
            .args(["pair", id, address])
            .assert()
            .success();
    }

    configured(&dir, &path)
        .args(["-o", "plain", "list"])
        .assert()
        .success()
        .stdout("desk\nhall\n");
}

#[test]
fn test_pair_rejects_bad_id() {
    let (dir, path) = with_config();
    configured(&dir, &path)
        .args(["pair", "kitchen sink", "10.0.0.2"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("device id"));
}

#[test]
fn test_unpair_requires_confirmation_when_not_interactive() {
    let (dir, path) = with_config();
    configured(&dir, &path)
        .args(["pair", "kitchen", "10.0.0.2"])
        .assert()
        .success();

    configured(&dir, &path)
        .args(["unpair", "kitchen"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_unpair_with_yes() {
    let (dir, path) = with_config();
    configured(&dir, &path)
        .args(["pair", "kitchen", "10.0.0.2"])
        .assert()
        .success();

    configured(&dir, &path)
        .args(["--yes", "unpair", "kitchen"])
        .assert()
        .success();

    configured(&dir, &path)
        .args(["-o", "plain", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().or(predicate::eq("\n")));
}

// ── Device errors ───────────────────────────────────────────────────

#[test]
fn test_info_without_devices() {
    let (dir, path) = with_config();
    configured(&dir, &path)
        .arg("info")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("sweet pair"));
}

#[test]
fn test_info_unknown_device() {
    let (dir, path) = with_config();
    configured(&dir, &path)
        .args(["pair", "kitchen", "10.0.0.2"])
        .assert()
        .success();

    configured(&dir, &path)
        .args(["--device", "garage", "info"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("garage"));
}

#[test]
fn test_device_without_address_needs_repair() {
    let (dir, path) = with_config();
    std::fs::write(
        &path,
        r#"
default_device = "kitchen"

[devices.kitchen]
name = "Kitchen"
"#,
    )
    .unwrap();

    configured(&dir, &path)
        .arg("info")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("sweet pair kitchen"));
}
