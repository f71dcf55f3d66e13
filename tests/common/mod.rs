//! Common test utilities and helpers for sftp-mirror tests

use std::process::Command;

/// Variables every valid configuration needs
pub const REQUIRED_ENV: [(&str, &str); 5] = [
    ("SSH_USERNAME", "mirror"),
    ("SSH_PASSWORD", "hunter2"),
    ("SOURCE_EXCLUDES", "tmp,cache"),
    ("SOURCE_DIR", "/srv/media"),
    ("SOURCE_HOSTNAME", "files.example.com"),
];

/// The built binary with a scrubbed environment
pub fn binary() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sftp-mirror"));
    command.env_clear();
    if let Some(path) = std::env::var_os("PATH") {
        command.env("PATH", path);
    }
    command
}

/// The built binary with every required variable set, minus `skip`
pub fn configured_binary(skip: &[&str]) -> Command {
    let mut command = binary();
    for (key, value) in REQUIRED_ENV {
        if !skip.contains(&key) {
            command.env(key, value);
        }
    }
    command
}

/// Combined stdout and stderr of a finished command
pub fn combined_output(output: &std::process::Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
