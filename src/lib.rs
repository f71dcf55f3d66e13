//! sftp-mirror - Periodic SFTP Directory Mirroring Agent
//!
//! sftp-mirror registers a remote host's key, then mirrors a remote directory
//! tree into a local download directory on a fixed interval by driving `lftp`
//! as a subprocess. It is built for unattended operation in a container.
//!
//! ## Modules
//!
//! - [`config`]: Environment configuration loading and validation
//! - [`excludes`]: Exclude list parsing with escaped commas
//! - [`mirror`]: lftp mirror command construction
//! - [`hostkey`]: Host key registration via ssh-keyscan
//! - [`runner`]: Subprocess execution behind a mockable trait
//! - [`daemon`]: Startup sequence and the periodic mirror loop
//! - [`health`]: Preflight diagnostics

pub mod config;
pub mod daemon;
pub mod excludes;
pub mod health;
pub mod hostkey;
pub mod mirror;
pub mod runner;

pub use config::{Config, LogLevel};
pub use daemon::{CycleOutcome, Daemon, SyncStats};
pub use excludes::ExcludeList;
pub use health::HealthCheck;
pub use runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
