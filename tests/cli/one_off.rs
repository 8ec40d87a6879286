use crate::cli::*;
use rstest::rstest;

#[test]
fn test_one_off_create_database() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = setup_temp_config_dir()?;

    let output = remote_catalog_cmd(&temp_dir)
        .arg("--one-off")
        .arg("\\create-db db1 main")
        .output()?;

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "CREATE DATABASE db1 (id 1, version 1)"
    );

    Ok(())
}

#[test]
fn test_one_off_heartbeat_settings_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = setup_temp_config_dir()?;

    // A multiplier below 1.0 doesn't pass validation
    let output = remote_catalog_cmd(&temp_dir)
        .arg("--one-off")
        .arg("\\l")
        .env("REMOTE_CATALOG__HEARTBEAT__PROPAGATION_MULTIPLIER", "0.5")
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("The propagation multiplier must be at least 1.0"));

    Ok(())
}

#[rstest]
#[case("\\nope", "'\\nope' is not a valid command")]
#[case("\\dn db1", "Database \"db1\" doesn't exist")]
#[case("\\d db1.t", "Invalid name \"db1.t\"")]
fn test_one_off_errors(
    #[case] command: &str,
    #[case] error: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = setup_temp_config_dir()?;

    let output = remote_catalog_cmd(&temp_dir)
        .arg("--one-off")
        .arg(command)
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(error), "{stderr}");

    Ok(())
}

#[test]
fn test_missing_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let output = Command::cargo_bin("remote-catalog")?
        .arg("-c")
        .arg("/nonexistent/remote-catalog.toml")
        .arg("--one-off")
        .arg("\\l")
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error loading the config"));

    Ok(())
}
