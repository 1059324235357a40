//! Core data model shared across netvault modules.

use serde::{Deserialize, Serialize};

/// A single network device eligible for configuration backup.
///
/// Loaded from the device inventory once per run and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Display name used for artifact naming. Falls back to `ip`.
    pub name: Option<String>,
    /// Network address of the device.
    pub ip: String,
    /// Login user.
    pub username: String,
    /// Login secret or credential handle.
    pub password: String,
    /// Command dialect selector understood by the transport (e.g. `cisco_ios`).
    pub device_type: String,
    /// Management port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    22
}

impl DeviceDescriptor {
    /// Identifier used in artifact names and log lines.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.ip)
    }
}

/// Aggregate outcome of one orchestration pass.
///
/// Invariant: `successful + failed` equals the number of devices attempted.
/// A run that could not start at all carries zero counts and a single
/// message describing why.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    /// Devices backed up successfully.
    pub successful: usize,
    /// Devices that failed.
    pub failed: usize,
    /// Human-readable error messages, in device-iteration order.
    pub errors: Vec<String>,
}

impl RunResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// A result for a run that never reached the device loop.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            successful: 0,
            failed: 0,
            errors: vec![message.into()],
        }
    }

    /// Record one successful device backup.
    pub fn record_success(&mut self) {
        self.successful += 1;
    }

    /// Record one failed device backup with its message.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(message.into());
    }

    /// Number of devices attempted in this run.
    pub fn attempted(&self) -> usize {
        self.successful + self.failed
    }

    /// True when every attempted device succeeded and no extra errors were
    /// recorded.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }
}
