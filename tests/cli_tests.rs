use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

mod common;
use common::{binary, combined_output, configured_binary};

/// Integration tests for the sftp-mirror binary
/// These run the built executable without network access

#[test]
fn test_cli_help() {
    let output = binary().arg("--help").output().expect("Failed to execute binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["run", "once", "doctor", "config"] {
        assert!(stdout.contains(command), "help is missing {}", command);
    }
}

#[test]
fn test_cli_version() {
    let output = binary().arg("--version").output().expect("Failed to execute binary");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("sftp-mirror"));
}

#[test]
fn test_missing_configuration_exits_with_one() {
    let home = TempDir::new().unwrap();

    let output = binary()
        .env("HOME", home.path())
        .output()
        .expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(predicate::str::contains("Missing required environment variables").eval(&text));
    assert!(predicate::str::contains("SSH_USERNAME").eval(&text));

    // Nothing ran, so no host key was recorded
    home.child(".ssh").assert(predicate::path::missing());
}

#[test]
fn test_single_missing_value_is_named() {
    let home = TempDir::new().unwrap();

    let output = configured_binary(&["SOURCE_HOSTNAME"])
        .env("HOME", home.path())
        .arg("once")
        .output()
        .expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("SOURCE_HOSTNAME"));
    assert!(!text.contains("SSH_PASSWORD"));
}

#[test]
fn test_invalid_port_exits_with_one() {
    let output = configured_binary(&[])
        .env("SSH_PORT", "not-a-port")
        .arg("config")
        .output()
        .expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("SSH_PORT"));
}

#[test]
fn test_config_command_masks_password() {
    let output = configured_binary(&[])
        .env("UPDATE_INTERVAL", "60")
        .env("LOG_LEVEL", "bogus")
        .arg("config")
        .output()
        .expect("Failed to execute binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("source_hostname: files.example.com"));
    assert!(stdout.contains("update_interval_secs: 60"));
    assert!(stdout.contains("log_level: INFO"));
    assert!(stdout.contains("target_dir: /downloads"));
    assert!(!stdout.contains("hunter2"));
}

#[test]
fn test_doctor_reports_invalid_configuration() {
    let output = binary().arg("doctor").output().expect("Failed to execute binary");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Diagnostics"));
    assert!(stdout.contains("Configuration invalid"));
}

#[test]
fn test_invalid_command() {
    let output = binary()
        .arg("nonexistent-command")
        .output()
        .expect("Failed to execute binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error") || stderr.contains("unrecognized"));
}
