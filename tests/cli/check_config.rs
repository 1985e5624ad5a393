//! `waitline check-config` end to end

use serial_test::serial;
use std::io::Write;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

fn waitline(args: &[&str], config_home: &TempDir) -> Output {
    Command::new(env!("CARGO_BIN_EXE_waitline"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_home.path())
        .output()
        .expect("run waitline")
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_without_any_file() {
    let home = TempDir::new().unwrap();
    let output = waitline(&["--no-color", "check-config"], &home);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("built-in defaults"), "{stdout}");
    assert!(stdout.contains("grace_period_secs = 300"));
    assert!(stdout.contains("max_party_size = 20"));
}

#[test]
fn test_explicit_file_values_used() {
    let home = TempDir::new().unwrap();
    let file = config_file("grace_period_secs = 90\nbind = \"127.0.0.1:9100\"\n");
    let path = file.path().to_str().unwrap();

    let output = waitline(&["--no-color", "--config", path, "check-config"], &home);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("grace_period_secs = 90"), "{stdout}");
    assert!(stdout.contains("127.0.0.1:9100"));
}

#[test]
fn test_cli_overrides_file() {
    let home = TempDir::new().unwrap();
    let file = config_file("grace_period_secs = 90\nmax_party_size = 6\n");
    let path = file.path().to_str().unwrap();

    let output = waitline(
        &["--no-color", "-c", path, "check-config", "--grace-secs", "45"],
        &home,
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("grace_period_secs = 45"), "{stdout}");
    assert!(stdout.contains("max_party_size = 6"));
}

#[test]
fn test_invalid_value_fails_with_message() {
    let home = TempDir::new().unwrap();
    let file = config_file("grace_period_secs = 0\n");
    let path = file.path().to_str().unwrap();

    let output = waitline(&["--no-color", "-c", path, "check-config"], &home);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("grace_period_secs must be greater than 0"),
        "{stderr}"
    );
}

#[test]
fn test_missing_explicit_file_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("nope.toml");

    let output = waitline(
        &["--no-color", "-c", missing.to_str().unwrap(), "check-config"],
        &home,
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn test_malformed_toml_fails() {
    let home = TempDir::new().unwrap();
    let file = config_file("bind = [unterminated\n");
    let path = file.path().to_str().unwrap();

    let output = waitline(&["--no-color", "-c", path, "check-config"], &home);
    assert!(!output.status.success());
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn test_default_location_is_discovered() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("Waitline");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("waitline.toml"), "minutes_per_party = 7\n").unwrap();

    let output = waitline(&["--no-color", "check-config"], &home);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("minutes_per_party = 7"), "{stdout}");
    assert!(stdout.contains("waitline.toml"));
}
