//! Sync loop controller
//!
//! Runs the one-time startup sequence (host key registration, target
//! directory preparation) and then mirrors the remote tree forever, sleeping
//! for the configured interval between passes. A failed pass is logged and the
//! loop carries on.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::excludes::ExcludeList;
use crate::hostkey;
use crate::mirror;
use crate::runner::{CommandOutput, CommandRunner, Invocation};

const SEPARATOR: &str = "---------------------------------------------------------";

/// Result of a single mirror pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// lftp exited with status zero
    Succeeded { duration: Duration },
    /// lftp ran but reported failure
    Failed {
        code: Option<i32>,
        stderr: String,
        duration: Duration,
    },
    /// lftp could not be started
    SpawnFailed { error: String },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Succeeded { .. })
    }
}

/// Running totals, used only for log output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub last_duration: Option<Duration>,
}

impl SyncStats {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.total_syncs += 1;
        match outcome {
            CycleOutcome::Succeeded { duration } => {
                self.successful_syncs += 1;
                self.last_duration = Some(*duration);
            }
            CycleOutcome::Failed { duration, .. } => {
                self.failed_syncs += 1;
                self.last_duration = Some(*duration);
            }
            CycleOutcome::SpawnFailed { .. } => {
                self.failed_syncs += 1;
                self.last_duration = None;
            }
        }
    }
}

/// Mirror daemon state and control
pub struct Daemon {
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    excludes: ExcludeList,
    invocation: Invocation,
    stats: SyncStats,
}

impl Daemon {
    /// Create a daemon, parsing the exclude list and building the mirror command once
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        let excludes = ExcludeList::parse(&config.source_excludes);
        let invocation = mirror::mirror_invocation(&config, &excludes);

        Self {
            config: Arc::new(config),
            runner,
            excludes,
            invocation,
            stats: SyncStats::default(),
        }
    }

    pub fn excludes(&self) -> &ExcludeList {
        &self.excludes
    }

    /// The invocation executed on every pass
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// One-time startup: register the host key and make sure the target exists.
    ///
    /// Any error here is fatal for the process.
    pub async fn prepare(&self) -> Result<()> {
        hostkey::register_host_key(self.runner.as_ref(), &self.config)
            .await
            .context("Host key registration failed")?;

        ensure_target_dir(&self.config.target_dir, &self.config.source_hostname).await?;

        info!("Excludes: {}", self.excludes.fragment());
        Ok(())
    }

    /// Run the mirror loop forever
    pub async fn run(&mut self) -> Result<()> {
        self.run_cycles(None).await
    }

    /// Run the mirror loop, stopping after `max_cycles` passes when given.
    ///
    /// The interval sleep happens between passes, so a bounded run does not
    /// wait after its last pass.
    pub async fn run_cycles(&mut self, max_cycles: Option<u64>) -> Result<()> {
        let interval = self.config.update_interval();
        info!("Mirror loop started with interval: {:?}", interval);

        let mut completed = 0u64;
        loop {
            self.run_cycle().await;
            completed += 1;

            if max_cycles.is_some_and(|max| completed >= max) {
                break;
            }

            info!("{}", SEPARATOR);
            info!("Attempt another update in {} seconds", interval.as_secs());
            tokio::time::sleep(interval).await;
        }

        info!(
            "Mirror loop exiting after {} passes ({} successful, {} failed)",
            self.stats.total_syncs, self.stats.successful_syncs, self.stats.failed_syncs
        );
        Ok(())
    }

    /// Execute one mirror pass and log its outcome. Never fails.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        info!("{}", SEPARATOR);
        debug!("Command to execute \"{}\"", self.invocation);

        let start = Instant::now();
        let outcome = match self.runner.run(&self.invocation).await {
            Ok(output) => Self::classify(output, start.elapsed()),
            Err(e) => {
                error!("Failed to start mirror command: {:?}", e);
                CycleOutcome::SpawnFailed {
                    error: format!("{:#}", e),
                }
            }
        };

        self.stats.record(&outcome);
        debug!(
            "Pass {} finished in {} ({} successful, {} failed)",
            self.stats.total_syncs,
            self.stats
                .last_duration
                .map(|d| format!("{:.2}s", d.as_secs_f64()))
                .unwrap_or_else(|| "n/a".to_string()),
            self.stats.successful_syncs,
            self.stats.failed_syncs
        );
        outcome
    }

    fn classify(output: CommandOutput, duration: Duration) -> CycleOutcome {
        if output.success() {
            info!("Output: {}", output.stdout.trim_end());
            info!("Errors (if any): {}", output.stderr.trim_end());
            info!("Mirror completed in {:.2}s", duration.as_secs_f64());
            CycleOutcome::Succeeded { duration }
        } else {
            error!("Command failed with {}", output.status_description());
            error!("Errors: {}", output.stderr.trim_end());
            CycleOutcome::Failed {
                code: output.code,
                stderr: output.stderr,
                duration,
            }
        }
    }
}

/// Make sure the download directory exists, creating it with its parents if absent
pub async fn ensure_target_dir(target_dir: &Path, source_hostname: &str) -> Result<()> {
    if tokio::fs::metadata(target_dir).await.is_ok_and(|m| m.is_dir()) {
        info!(
            "lftp will be synchronized from {} to this download path [{}]",
            source_hostname,
            target_dir.display()
        );
        return Ok(());
    }

    warn!(
        "Download path [{}] does not exist. Make sure an existing volume is configured, attempting to make the full path.",
        target_dir.display()
    );

    match tokio::fs::create_dir_all(target_dir).await {
        Ok(()) => {
            info!("Target directory set: [{}]", target_dir.display());
            Ok(())
        }
        Err(e) => {
            error!(
                "Failed to create target directory [{}]: {}",
                target_dir.display(),
                e
            );
            Err(e).with_context(|| {
                format!("Failed to create target directory: {}", target_dir.display())
            })
        }
    }
}
