use assert_cmd::prelude::*; // Add methods on commands
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio}; // Run programs
use tempfile::{Builder, TempDir};

mod basic;
mod one_off;

const TEST_CONFIG_FILE: &str = "remote-catalog-test.toml";

// In-process metadata service, with a short heartbeat so that mutations don't
// keep the tests waiting.
fn setup_temp_config_dir() -> std::io::Result<TempDir> {
    let temp_dir = Builder::new()
        .prefix("remote-catalog-test-dir")
        .rand_bytes(5)
        .tempdir()?;

    let mut conf_file = File::create(temp_dir.path().join(TEST_CONFIG_FILE))?;
    write!(
        conf_file,
        r#"
[meta]
type = "memory"

[heartbeat]
interval_ms = 50
"#
    )?;

    Ok(temp_dir)
}

fn remote_catalog_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("remote-catalog").expect("remote-catalog bin exists");
    cmd.arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .current_dir(temp_dir.path())
        .env("RUST_LOG", "off");
    cmd
}

fn read_lines(reader: impl std::io::Read) -> std::io::Result<Vec<String>> {
    BufReader::new(reader).lines().collect()
}
