//! Device transport capability.
//!
//! Opening a management session and issuing a single read-only command is
//! external to the backup engine: the engine consumes the
//! [`DeviceTransport`] trait and never sees protocol details. The trait is
//! the per-device failure boundary; every failure mode collapses into a
//! [`TransportError`] the orchestrator renders as a message.
//!
//! [`OpenSshTransport`] is a thin implementation that delegates each
//! command to the system OpenSSH client, so a plain installation can back
//! up real devices without any protocol code living in this crate.

use crate::types::DeviceDescriptor;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Typed failure from a device transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection timed out")]
    Timeout,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    Other(String),
}

/// Capability for executing one read-only command against a remote device.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Retrieve the device's full running configuration text.
    async fn fetch_config(&self, device: &DeviceDescriptor) -> Result<String, TransportError>;

    /// Check connectivity without retrieving a configuration.
    async fn test_connection(&self, device: &DeviceDescriptor) -> Result<(), TransportError>;
}

/// Command that dumps the running configuration for a device type.
///
/// Closed table with an explicit default: unrecognized types fall back to
/// the Cisco IOS command.
pub fn config_command(device_type: &str) -> &'static str {
    match device_type.to_ascii_lowercase().as_str() {
        "cisco_ios" | "cisco_xe" | "cisco_nxos" | "cisco_asa" => "show running-config",
        "juniper" | "juniper_junos" => "show configuration",
        "arista_eos" => "show running-config",
        "hp_comware" => "display current-configuration",
        "hp_procurve" => "show config",
        "fortinet" => "show full-configuration",
        "paloalto_panos" => "show config running",
        "dell_force10" | "dell_powerconnect" => "show running-config",
        "extreme" | "extreme_exos" => "show configuration",
        "mikrotik_routeros" => "/export",
        "vyos" => "show configuration",
        "linux" => "cat /etc/network/interfaces",
        _ => "show running-config",
    }
}

/// Default wall-clock limit for one remote command.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Default TCP connect limit handed to the ssh client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Transport backed by the system OpenSSH client.
///
/// Spawns `ssh` in batch mode, one command per session. Authentication and
/// session handling stay entirely in the external client; key-based auth is
/// assumed since batch mode never prompts.
pub struct OpenSshTransport {
    command_timeout: Duration,
    connect_timeout: Duration,
}

impl OpenSshTransport {
    /// Create a transport with default timeouts.
    pub fn new() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the per-command and connect timeouts.
    pub fn with_timeouts(mut self, command: Duration, connect: Duration) -> Self {
        self.command_timeout = command;
        self.connect_timeout = connect;
        self
    }

    /// Run one command on the device and capture its stdout.
    async fn run_command(
        &self,
        device: &DeviceDescriptor,
        command: &str,
    ) -> Result<String, TransportError> {
        let target = format!("{}@{}", device.username, device.ip);

        let mut cmd = Command::new("ssh");
        cmd.arg("-p")
            .arg(device.port.to_string())
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs()))
            .arg(&target)
            .arg(command);

        debug!(device = %device.display_name(), command, "Executing remote command");

        let output = tokio::time::timeout(self.command_timeout, cmd.output())
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Other(format!("failed to spawn ssh: {}", e)))?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|_| {
                TransportError::Protocol("command output was not valid UTF-8".to_string())
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_ssh_failure(output.status.code(), stderr.trim()))
        }
    }
}

impl Default for OpenSshTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTransport for OpenSshTransport {
    async fn fetch_config(&self, device: &DeviceDescriptor) -> Result<String, TransportError> {
        self.run_command(device, config_command(&device.device_type))
            .await
    }

    async fn test_connection(&self, device: &DeviceDescriptor) -> Result<(), TransportError> {
        self.run_command(device, "show version").await.map(|_| ())
    }
}

/// Map an ssh client failure onto a typed transport error.
///
/// The OpenSSH client exits 255 for its own failures and passes the remote
/// command's status through otherwise.
fn classify_ssh_failure(code: Option<i32>, stderr: &str) -> TransportError {
    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("permission denied") || lowered.contains("authentication") {
        TransportError::AuthenticationFailed
    } else if lowered.contains("timed out") || lowered.contains("timeout") {
        TransportError::Timeout
    } else if code == Some(255) {
        TransportError::Protocol(stderr.to_string())
    } else {
        TransportError::Other(format!(
            "remote command exited with status {}: {}",
            code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()),
            stderr
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_command_table() {
        assert_eq!(config_command("cisco_ios"), "show running-config");
        assert_eq!(config_command("juniper_junos"), "show configuration");
        assert_eq!(config_command("mikrotik_routeros"), "/export");
        assert_eq!(config_command("hp_comware"), "display current-configuration");
    }

    #[test]
    fn test_config_command_is_case_insensitive() {
        assert_eq!(config_command("Cisco_IOS"), "show running-config");
        assert_eq!(config_command("FORTINET"), "show full-configuration");
    }

    #[test]
    fn test_config_command_defaults_for_unknown_types() {
        assert_eq!(config_command("frobnicator_os"), "show running-config");
        assert_eq!(config_command(""), "show running-config");
    }

    #[test]
    fn test_classify_auth_failure() {
        let err = classify_ssh_failure(Some(255), "admin@10.0.0.1: Permission denied (publickey)");
        assert!(matches!(err, TransportError::AuthenticationFailed));
    }

    #[test]
    fn test_classify_timeout() {
        let err = classify_ssh_failure(Some(255), "ssh: connect to host 10.0.0.1: Connection timed out");
        assert!(matches!(err, TransportError::Timeout));
    }

    #[test]
    fn test_classify_client_failure_as_protocol_error() {
        let err = classify_ssh_failure(Some(255), "kex_exchange_identification: read: reset by peer");
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn test_classify_remote_command_failure() {
        let err = classify_ssh_failure(Some(1), "% Invalid input detected");
        match err {
            TransportError::Other(detail) => assert!(detail.contains("status 1")),
            other => panic!("expected Other, got {:?}", other),
        }
    }
}
