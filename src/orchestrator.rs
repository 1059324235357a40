//! Backup orchestration: one sequential pass over the device fleet.
//!
//! The orchestrator owns the per-run pipeline: iterate devices in order,
//! fetch each configuration through the transport capability, write
//! artifacts, and sweep expired artifacts once at the end. Per-device
//! failures are isolated at the device boundary and recorded as messages;
//! nothing a single device does can abort the run or touch its neighbors.
//! Devices are polled strictly one at a time since many network devices
//! reject concurrent management sessions.

use crate::config::ConfigStore;
use crate::error::Result;
use crate::report::ReportSink;
use crate::retention;
use crate::schedule::engine::BackupJob;
use crate::store::ArtifactStore;
use crate::transport::{DeviceTransport, TransportError};
use crate::types::{DeviceDescriptor, RunResult};
use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{error, info, warn};

/// Message recorded when a run is requested with no devices configured.
pub const NO_DEVICES_MESSAGE: &str = "No devices configured for backup";

/// Outcome of a connectivity probe for one device.
#[derive(Debug, Clone)]
pub struct ConnectivityReport {
    /// Device display name.
    pub device: String,
    /// Whether the probe succeeded.
    pub ok: bool,
    /// Operator-facing detail.
    pub message: String,
}

/// Drives backup runs: transport calls, artifact writes, retention sweep.
pub struct BackupOrchestrator {
    transport: Arc<dyn DeviceTransport>,
    store: ArtifactStore,
    retention_days: u64,
}

impl BackupOrchestrator {
    /// Create an orchestrator over an artifact store and a transport.
    pub fn new(
        transport: Arc<dyn DeviceTransport>,
        store: ArtifactStore,
        retention_days: u64,
    ) -> Self {
        Self {
            transport,
            store,
            retention_days,
        }
    }

    /// The artifact store backing this orchestrator.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run one backup pass over `devices`, in the order given.
    ///
    /// Every artifact of the run shares one capture time so a run can be
    /// correlated across devices. The retention sweep runs exactly once
    /// after the loop regardless of per-device outcomes; a sweep failure
    /// is appended as an extra message without touching the counters.
    pub async fn run_backup(&self, devices: &[DeviceDescriptor]) -> RunResult {
        info!("Starting backup run");

        if devices.is_empty() {
            warn!("{}", NO_DEVICES_MESSAGE);
            return RunResult::aborted(NO_DEVICES_MESSAGE);
        }

        let mut result = RunResult::new();
        let captured_at = Local::now();

        for device in devices {
            let name = device.display_name();
            info!(device = %name, ip = %device.ip, "Backing up device");

            match self.transport.fetch_config(device).await {
                Ok(body) if !body.is_empty() => {
                    match self.store.write_artifact(device, captured_at, &body) {
                        Ok(path) => {
                            info!(device = %name, path = %path.display(), "Backup complete");
                            result.record_success();
                        }
                        Err(e) => {
                            let message = format!("Failed to store backup for {}: {}", name, e);
                            error!("{}", message);
                            result.record_failure(message);
                        }
                    }
                }
                Ok(_) => {
                    let message = format!("No configuration received from {}", name);
                    error!("{}", message);
                    result.record_failure(message);
                }
                Err(e) => {
                    let message = transport_failure_message(name, &e);
                    error!("{}", message);
                    result.record_failure(message);
                }
            }
        }

        if let Err(e) = self.cleanup_expired() {
            let message = format!("Error during backup cleanup: {}", e);
            error!("{}", message);
            result.errors.push(message);
        }

        info!(
            successful = result.successful,
            failed = result.failed,
            "Backup run complete"
        );
        result
    }

    /// Delete artifacts older than the retention window.
    ///
    /// Zero deletions is a normal outcome, not an error.
    pub fn cleanup_expired(&self) -> Result<usize> {
        let artifacts = self.store.list_artifacts()?;
        let expired =
            retention::select_for_deletion(&artifacts, self.retention_days, SystemTime::now());
        let count = expired.len();

        for artifact in expired {
            info!(file = %artifact.file_name, "Deleting expired artifact");
            self.store.delete_artifact(&artifact.path)?;
        }

        if count > 0 {
            info!(
                count,
                retention_days = self.retention_days,
                "Removed expired artifacts"
            );
        } else {
            info!("No expired artifacts to remove");
        }
        Ok(count)
    }

    /// Probe connectivity for every device, in order.
    pub async fn test_devices(&self, devices: &[DeviceDescriptor]) -> Vec<ConnectivityReport> {
        let mut reports = Vec::with_capacity(devices.len());

        for device in devices {
            let name = device.display_name().to_string();
            let report = match self.transport.test_connection(device).await {
                Ok(()) => ConnectivityReport {
                    message: format!("Successfully connected to {}", name),
                    device: name,
                    ok: true,
                },
                Err(e) => ConnectivityReport {
                    message: transport_failure_message(&name, &e),
                    device: name,
                    ok: false,
                },
            };
            reports.push(report);
        }

        reports
    }
}

/// Render a per-device transport failure as an operator-facing message.
fn transport_failure_message(device: &str, error: &TransportError) -> String {
    match error {
        TransportError::Timeout => format!("Timeout connecting to {}", device),
        TransportError::AuthenticationFailed => format!("Authentication failed for {}", device),
        TransportError::Protocol(detail) => {
            format!("Protocol error connecting to {}: {}", device, detail)
        }
        TransportError::Other(detail) => {
            format!("Unexpected error retrieving config from {}: {}", device, detail)
        }
    }
}

/// The scheduled backup action: load devices, run the pipeline, deliver
/// the report.
pub struct BackupTask {
    config: Arc<ConfigStore>,
    orchestrator: Arc<BackupOrchestrator>,
    sink: Arc<dyn ReportSink>,
}

impl BackupTask {
    /// Wire a task from its collaborators.
    pub fn new(
        config: Arc<ConfigStore>,
        orchestrator: Arc<BackupOrchestrator>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            sink,
        }
    }

    /// Run one full pass. A device-list load failure aborts the run before
    /// the pipeline is invoked; report delivery failure is logged, never
    /// fatal.
    pub async fn execute(&self) -> RunResult {
        let result = match self.config.load_devices() {
            Ok(devices) => self.orchestrator.run_backup(&devices).await,
            Err(e) => {
                let message = format!("Error loading device configuration: {}", e);
                error!("{}", message);
                RunResult::aborted(message)
            }
        };

        if let Err(e) = self.sink.deliver(&result).await {
            warn!(error = %e, "Report delivery failed");
        }
        result
    }
}

#[async_trait]
impl BackupJob for BackupTask {
    async fn run(&self) -> std::result::Result<String, String> {
        let result = self.execute().await;
        Ok(format!(
            "{} successful, {} failed",
            result.successful, result.failed
        ))
    }

    fn name(&self) -> &str {
        "weekly-backup"
    }
}
