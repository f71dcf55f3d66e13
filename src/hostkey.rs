//! Host key registration
//!
//! Scans the remote host with `ssh-keyscan` and appends the result to the
//! known_hosts store so that lftp's SFTP connection is not stopped by a host
//! verification prompt.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::runner::{CommandRunner, Invocation};

/// Key scanning utility
pub const KEYSCAN_PROGRAM: &str = "ssh-keyscan";

/// `ssh-keyscan -p <port> <host>`
pub fn keyscan_invocation(config: &Config) -> Invocation {
    Invocation::new(KEYSCAN_PROGRAM)
        .arg("-p")
        .arg(config.ssh_port.to_string())
        .arg(config.source_hostname.clone())
}

/// Scan the configured host and record its keys in the known_hosts file
pub async fn register_host_key(runner: &dyn CommandRunner, config: &Config) -> Result<()> {
    info!("Acquiring host key from {}...", config.source_hostname);

    let invocation = keyscan_invocation(config);
    let output = runner
        .run(&invocation)
        .await
        .context("Failed to run ssh-keyscan")?;

    if !output.success() {
        error!("Host key scan failed with {}", output.status_description());
        error!("Errors: {}", output.stderr.trim_end());
        return Err(anyhow!(
            "ssh-keyscan for {} failed with {}",
            config.source_hostname,
            output.status_description()
        ));
    }

    append_known_hosts(&config.known_hosts_file, &output.stdout).await?;
    info!(
        "Host key for {} recorded in {}",
        config.source_hostname,
        config.known_hosts_file.display()
    );

    Ok(())
}

/// Append scanned keys, creating the file and its parent directory if needed
async fn append_known_hosts(path: &Path, keys: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open known_hosts file: {}", path.display()))?;

    file.write_all(keys.as_bytes())
        .await
        .with_context(|| format!("Failed to write known_hosts file: {}", path.display()))?;
    if !keys.is_empty() && !keys.ends_with('\n') {
        file.write_all(b"\n")
            .await
            .with_context(|| format!("Failed to write known_hosts file: {}", path.display()))?;
    }
    file.flush()
        .await
        .with_context(|| format!("Failed to flush known_hosts file: {}", path.display()))?;

    debug!("Appended {} bytes to {}", keys.len(), path.display());
    Ok(())
}
