//! Common test utilities for integration tests.

use async_trait::async_trait;
use netvault::store::ArtifactStore;
use netvault::transport::{DeviceTransport, TransportError};
use netvault::types::DeviceDescriptor;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Test environment that manages a temporary artifact directory.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub backup_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let backup_dir = temp_dir.path().join("backups");
        Self {
            temp_dir,
            backup_dir,
        }
    }

    /// Open the artifact store under this environment.
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::open(&self.backup_dir).expect("Failed to open artifact store")
    }
}

/// Scripted outcome for one device.
pub enum Outcome {
    Config(&'static str),
    Empty,
    Timeout,
    AuthFailed,
    Protocol(&'static str),
}

impl Outcome {
    fn to_result(&self) -> Result<String, TransportError> {
        match self {
            Outcome::Config(text) => Ok((*text).to_string()),
            Outcome::Empty => Ok(String::new()),
            Outcome::Timeout => Err(TransportError::Timeout),
            Outcome::AuthFailed => Err(TransportError::AuthenticationFailed),
            Outcome::Protocol(detail) => Err(TransportError::Protocol((*detail).to_string())),
        }
    }
}

/// Transport double that replays scripted outcomes and records call order.
pub struct ScriptedTransport {
    outcomes: HashMap<String, Outcome>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(outcomes: Vec<(&str, Outcome)>) -> Self {
        Self {
            outcomes: outcomes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Devices contacted so far, in call order.
    pub fn call_order(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn fetch_config(&self, device: &DeviceDescriptor) -> Result<String, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(device.display_name().to_string());
        match self.outcomes.get(device.display_name()) {
            Some(outcome) => outcome.to_result(),
            None => Err(TransportError::Other(format!(
                "no scripted outcome for {}",
                device.display_name()
            ))),
        }
    }

    async fn test_connection(&self, device: &DeviceDescriptor) -> Result<(), TransportError> {
        match self.outcomes.get(device.display_name()) {
            Some(outcome) => outcome.to_result().map(|_| ()),
            None => Err(TransportError::Other(format!(
                "no scripted outcome for {}",
                device.display_name()
            ))),
        }
    }
}

/// Build a device descriptor with test defaults.
pub fn device(name: &str, ip: &str) -> DeviceDescriptor {
    DeviceDescriptor {
        name: Some(name.to_string()),
        ip: ip.to_string(),
        username: "admin".to_string(),
        password: "secret".to_string(),
        device_type: "cisco_ios".to_string(),
        port: 22,
    }
}
