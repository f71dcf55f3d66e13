//! System health checks for sftp-mirror
//!
//! Preflight checks behind the `doctor` command: external tools, configuration
//! and the local paths the agent writes to.

use anyhow::Result;
use std::fmt::Write;
use std::path::Path;

use crate::config::{Config, KNOWN_HOSTS_FILE, TARGET_DIR};
use crate::hostkey::KEYSCAN_PROGRAM;
use crate::mirror::LFTP_PROGRAM;

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// lftp installation status
    pub lftp: CheckResult,
    /// ssh-keyscan installation status
    pub keyscan: CheckResult,
    /// Environment configuration status
    pub config: CheckResult,
    /// Download directory status (warning only, created at startup)
    pub target_dir: CheckResult,
    /// known_hosts status (warning only, created at startup)
    pub known_hosts: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: None,
            is_warning: false,
        }
    }

    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks against a configuration load attempt
    pub fn run(config: &Result<Config>) -> Self {
        let (target_dir, known_hosts) = match config {
            Ok(config) => (
                config.target_dir.clone(),
                config.known_hosts_file.clone(),
            ),
            Err(_) => (
                TARGET_DIR.into(),
                shellexpand::tilde(KNOWN_HOSTS_FILE).into_owned().into(),
            ),
        };

        Self {
            lftp: Self::check_lftp(),
            keyscan: Self::check_keyscan(),
            config: Self::check_config(config),
            target_dir: Self::check_target_dir(&target_dir),
            known_hosts: Self::check_known_hosts(&known_hosts),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.lftp.passed && self.keyscan.passed && self.config.passed
    }

    /// Get list of failed checks (errors only, not warnings)
    pub fn errors(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, result)| result)
            .filter(|r| !r.passed && !r.is_warning)
            .collect()
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, result)| result)
            .filter(|r| r.is_warning)
            .collect()
    }

    /// Render the `doctor` report: one block per check, then an error/warning tally
    pub fn report(&self) -> String {
        let mut out = String::from("🔍 sftp-mirror System Diagnostics\n\n");

        for (name, result) in self.all_checks() {
            let icon = match (result.passed, result.is_warning) {
                (true, true) => "⚠️ ",
                (true, false) => "✅",
                (false, _) => "❌",
            };
            let _ = writeln!(out, "{}:\n  {} {}", name, icon, result.message);
            for line in result.details.iter().flat_map(|details| details.lines()) {
                let _ = writeln!(out, "     {}", line);
            }
            out.push('\n');
        }

        let errors = self.errors().len();
        let warnings = self.warnings().len();
        let _ = match (errors, warnings) {
            (0, 0) => writeln!(out, "✅ All checks passed"),
            (0, w) => writeln!(out, "✅ All required checks passed, {} warning(s)", w),
            (e, w) => writeln!(out, "❌ {} check(s) failed, {} warning(s)", e, w),
        };
        out
    }

    /// Check lftp installation
    fn check_lftp() -> CheckResult {
        match std::process::Command::new(LFTP_PROGRAM).arg("--version").output() {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                let first_line = version.lines().next().unwrap_or_default().trim().to_string();
                CheckResult::ok_with_details("lftp installed", first_line)
            }
            Ok(output) => CheckResult::error_with_details(
                "lftp command failed",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ),
            Err(_) => CheckResult::error_with_details(
                "lftp not found in PATH",
                "Install lftp: apt-get install lftp",
            ),
        }
    }

    /// Check ssh-keyscan installation. It has no version flag, so any exit status counts.
    fn check_keyscan() -> CheckResult {
        match std::process::Command::new(KEYSCAN_PROGRAM).output() {
            Ok(_) => CheckResult::ok("ssh-keyscan installed"),
            Err(_) => CheckResult::error_with_details(
                "ssh-keyscan not found in PATH",
                "Install the OpenSSH client: apt-get install openssh-client",
            ),
        }
    }

    /// Check that the environment configuration is complete
    fn check_config(config: &Result<Config>) -> CheckResult {
        match config {
            Ok(config) => CheckResult::ok_with_details(
                "Configuration valid",
                format!(
                    "{}@{}:{} {} every {}s",
                    config.ssh_username,
                    config.source_hostname,
                    config.ssh_port,
                    config.source_dir,
                    config.update_interval_secs
                ),
            ),
            Err(e) => CheckResult::error_with_details("Configuration invalid", format!("{:#}", e)),
        }
    }

    /// Check download directory exists
    fn check_target_dir(path: &Path) -> CheckResult {
        if path.is_dir() {
            CheckResult::ok_with_details("Download directory exists", path.display().to_string())
        } else {
            CheckResult::warning_with_details(
                "Download directory does not exist",
                format!(
                    "It will be created at startup; mount a volume at {} to keep mirrored files",
                    path.display()
                ),
            )
        }
    }

    /// Check known_hosts file (warning only)
    fn check_known_hosts(path: &Path) -> CheckResult {
        if path.exists() {
            CheckResult::ok_with_details("known_hosts found", path.display().to_string())
        } else {
            CheckResult::warning_with_details(
                "known_hosts not found",
                format!("{} will be created on first host key scan", path.display()),
            )
        }
    }

    /// Get all checks as a slice for iteration
    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 5] {
        [
            ("lftp Installation", &self.lftp),
            ("ssh-keyscan Installation", &self.keyscan),
            ("Configuration", &self.config),
            ("Download Directory", &self.target_dir),
            ("Known Hosts", &self.known_hosts),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn passing() -> HealthCheck {
        HealthCheck {
            lftp: CheckResult::ok("lftp OK"),
            keyscan: CheckResult::ok("keyscan OK"),
            config: CheckResult::ok("Config OK"),
            target_dir: CheckResult::ok("Dir OK"),
            known_hosts: CheckResult::ok("Hosts OK"),
        }
    }

    #[test]
    fn test_check_result_warning_with_details() {
        let result = CheckResult::warning_with_details("Test warning", "Warning details");
        assert!(result.passed);
        assert!(result.is_warning);
        assert_eq!(result.details, Some("Warning details".to_string()));
    }

    #[test]
    fn test_check_result_error_with_details() {
        let result = CheckResult::error_with_details("Test failed", "Error details");
        assert!(!result.passed);
        assert!(!result.is_warning);
        assert_eq!(result.details, Some("Error details".to_string()));
    }

    #[test]
    fn test_check_config_invalid() {
        let result = HealthCheck::check_config(&Err(anyhow!("Missing required environment variables: SSH_PASSWORD")));
        assert!(!result.passed);
        assert!(result.details.unwrap().contains("SSH_PASSWORD"));
    }

    #[test]
    fn test_check_target_dir() {
        let temp_dir = TempDir::new().unwrap();
        let existing = HealthCheck::check_target_dir(temp_dir.path());
        assert!(existing.passed);
        assert!(!existing.is_warning);

        // Missing directory is only a warning, startup creates it
        let missing = HealthCheck::check_target_dir(&temp_dir.path().join("downloads"));
        assert!(missing.passed);
        assert!(missing.is_warning);
    }

    #[test]
    fn test_check_known_hosts_missing() {
        let result = HealthCheck::check_known_hosts(&PathBuf::from("/nonexistent/known_hosts"));
        assert!(result.is_warning);
    }

    #[test]
    fn test_all_passed_with_warnings() {
        let mut health = passing();
        health.target_dir = CheckResult::warning_with_details("Dir missing", "created later");
        assert!(health.all_passed());
        assert_eq!(health.warnings().len(), 1);
        assert!(health.errors().is_empty());
    }

    #[test]
    fn test_all_passed_with_failing_lftp() {
        let mut health = passing();
        health.lftp = CheckResult::error_with_details("lftp missing", "install it");
        assert!(!health.all_passed());
        assert_eq!(health.errors().len(), 1);
    }

    #[test]
    fn test_all_passed_with_invalid_config() {
        let mut health = passing();
        health.config = CheckResult::error_with_details("Configuration invalid", "missing");
        assert!(!health.all_passed());
    }

    #[test]
    fn test_report_tallies_errors_and_warnings() {
        let mut health = passing();
        assert!(health.report().ends_with("✅ All checks passed\n"));

        health.known_hosts = CheckResult::warning_with_details("known_hosts not found", "later");
        let report = health.report();
        assert!(report.contains("⚠️  known_hosts not found"));
        assert!(report.contains("     later"));
        assert!(report.ends_with("✅ All required checks passed, 1 warning(s)\n"));

        health.config = CheckResult::error_with_details("Configuration invalid", "SSH_PASSWORD");
        let report = health.report();
        assert!(report.starts_with("🔍 sftp-mirror System Diagnostics"));
        assert!(report.contains("Configuration:\n  ❌ Configuration invalid\n     SSH_PASSWORD"));
        assert!(report.ends_with("❌ 1 check(s) failed, 1 warning(s)\n"));
    }

    #[test]
    fn test_all_checks_returns_all_five() {
        let health = passing();
        let checks = health.all_checks();
        assert_eq!(checks.len(), 5);
        assert_eq!(checks[0].0, "lftp Installation");
        assert_eq!(checks[2].0, "Configuration");
        assert_eq!(checks[4].0, "Known Hosts");
    }
}
