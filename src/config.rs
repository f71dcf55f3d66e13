use anyhow::{anyhow, Context, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Local directory the remote tree is mirrored into
pub const TARGET_DIR: &str = "/downloads";

/// Trusted-hosts store that scanned host keys are appended to
pub const KNOWN_HOSTS_FILE: &str = "~/.ssh/known_hosts";

/// Required keys, in the order they are reported when missing
const REQUIRED_KEYS: [&str; 5] = [
    "SSH_USERNAME",
    "SSH_PASSWORD",
    "SOURCE_EXCLUDES",
    "SOURCE_DIR",
    "SOURCE_HOSTNAME",
];

/// Immutable process-wide settings, loaded once at startup
#[derive(Serialize, Clone)]
pub struct Config {
    /// Username passed to lftp
    pub ssh_username: String,

    /// Password passed to lftp (never serialized in clear text)
    #[serde(serialize_with = "redact")]
    pub ssh_password: String,

    /// Raw comma-separated exclude specification
    pub source_excludes: String,

    /// Remote directory to mirror
    pub source_dir: String,

    /// Remote SFTP host
    pub source_hostname: String,

    /// Remote SFTP port
    pub ssh_port: u16,

    /// Seconds to wait between mirror passes
    pub update_interval_secs: u64,

    /// Verbosity of the log stream
    pub log_level: LogLevel,

    /// Local mirror destination
    pub target_dir: PathBuf,

    /// known_hosts file for host key registration
    pub known_hosts_file: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("ssh_username", &self.ssh_username)
            .field("ssh_password", &"********")
            .field("source_excludes", &self.source_excludes)
            .field("source_dir", &self.source_dir)
            .field("source_hostname", &self.source_hostname)
            .field("ssh_port", &self.ssh_port)
            .field("update_interval_secs", &self.update_interval_secs)
            .field("log_level", &self.log_level)
            .field("target_dir", &self.target_dir)
            .field("known_hosts_file", &self.known_hosts_file)
            .finish()
    }
}

/// Log levels accepted in `LOG_LEVEL`
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Parse a level name case-insensitively, falling back to `Info` for anything unknown
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARNING" => LogLevel::Warning,
            "ERROR" => LogLevel::Error,
            "CRITICAL" => LogLevel::Critical,
            _ => LogLevel::Info,
        }
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has no level above error
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

// Default value functions
fn default_ssh_port() -> u16 {
    22
}
fn default_update_interval() -> u64 {
    300
}

fn redact<S: Serializer>(_: &str, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str("********")
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated the same as absent ones. Every missing required
    /// key is reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!(
                "Missing required environment variables: {}",
                missing.join(", ")
            ));
        }

        let required = |key: &str| get(key).unwrap_or_default();

        let ssh_port = match get("SSH_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid SSH_PORT: {:?}", raw))?,
            None => default_ssh_port(),
        };

        let update_interval_secs = match get("UPDATE_INTERVAL") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid UPDATE_INTERVAL: {:?}", raw))?,
            None => default_update_interval(),
        };

        let known_hosts_file = shellexpand::full(KNOWN_HOSTS_FILE)
            .context("Failed to expand known_hosts path")?
            .into_owned();

        Ok(Self {
            ssh_username: required("SSH_USERNAME"),
            ssh_password: required("SSH_PASSWORD"),
            source_excludes: required("SOURCE_EXCLUDES"),
            source_dir: required("SOURCE_DIR"),
            source_hostname: required("SOURCE_HOSTNAME"),
            ssh_port,
            update_interval_secs,
            log_level: Self::log_level_from_lookup(&lookup),
            target_dir: PathBuf::from(TARGET_DIR),
            known_hosts_file: PathBuf::from(known_hosts_file),
        })
    }

    /// Resolve only the log level, so logging can be initialized before validation
    pub fn log_level_from_lookup<F>(lookup: F) -> LogLevel
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("LOG_LEVEL")
            .map(|value| LogLevel::parse_lenient(&value))
            .unwrap_or_default()
    }

    /// Pause between the end of one mirror pass and the start of the next
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Render the configuration as YAML with secrets masked
    pub fn to_redacted_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration")
    }
}
