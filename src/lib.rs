//! netvault - scheduled configuration backups for network devices.
//!
//! netvault periodically retrieves the running configuration from a fleet
//! of network devices over a remote management session, persists each
//! retrieval as a timestamped text artifact, prunes artifacts past a
//! retention window, and reports aggregate outcomes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        netvault                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  Schedule Engine: cron strategy | polling fallback       │
//! ├──────────────────────────────────────────────────────────┤
//! │  Backup Orchestrator: sequential device loop | failure   │
//! │  isolation | retention sweep | statistics                │
//! ├──────────────────────────────────────────────────────────┤
//! │  Capabilities: device transport | config | report sink   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Devices are polled strictly one at a time; the schedule engine blocks
//! its caller from `start()` until `stop()` or interruption.
//!
//! # Quick Start
//!
//! ```no_run
//! use netvault::config::ConfigStore;
//! use netvault::orchestrator::BackupOrchestrator;
//! use netvault::store::ArtifactStore;
//! use netvault::transport::OpenSshTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> netvault::Result<()> {
//!     let config = ConfigStore::open("config")?;
//!     let devices = config.load_devices()?;
//!
//!     let store = ArtifactStore::open(config.backup_directory()?)?;
//!     let orchestrator =
//!         BackupOrchestrator::new(Arc::new(OpenSshTransport::new()), store, config.retention_days()?);
//!
//!     let result = orchestrator.run_backup(&devices).await;
//!     println!("{} successful, {} failed", result.successful, result.failed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod observability;
pub mod orchestrator;
pub mod report;
pub mod retention;
pub mod schedule;
pub mod store;
pub mod transport;

pub mod cli;

// Re-exports
pub use error::{NetvaultError, Result};
pub use types::{DeviceDescriptor, RunResult};
