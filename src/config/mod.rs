//! Configuration loading for netvault.
//!
//! Two YAML files live under one configuration directory: `devices.yaml`
//! holds the device inventory, `settings.yaml` the service settings.
//! Missing files are seeded with commented samples on first use so a fresh
//! install is editable rather than silently empty.

use crate::error::{NetvaultError, Result};
use crate::schedule::engine::SchedulerKind;
use crate::types::DeviceDescriptor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Weekly cadence in raw form: a weekday name and an HH:MM time.
///
/// Parsed and validated by the schedule engine at start, not here, so a
/// bad value is surfaced where it matters instead of crashing a load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Weekday name, case-insensitive.
    pub day: String,
    /// Time of day, 24-hour HH:MM.
    pub time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day: "sunday".to_string(),
            time: "02:00".to_string(),
        }
    }
}

/// Service settings, one sub-struct per settings.yaml section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Backup behavior.
    #[serde(default)]
    pub backup: BackupSettings,
    /// Report delivery settings, consumed by an external mail sink.
    #[serde(default)]
    pub email: EmailSettings,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Validate settings that must hold before any component starts.
    pub fn validate(&self) -> Result<()> {
        if self.backup.directory.as_os_str().is_empty() {
            return Err(NetvaultError::InvalidConfig {
                field: "backup.directory".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Backup behavior: artifact directory, retention window, and cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Directory artifacts are written to.
    #[serde(default = "default_backup_directory")]
    pub directory: PathBuf,
    /// Days an artifact is kept before the retention sweep removes it.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Weekly schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Engine strategy driving the schedule.
    #[serde(default)]
    pub scheduler: SchedulerKind,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            directory: default_backup_directory(),
            retention_days: default_retention_days(),
            schedule: ScheduleConfig::default(),
            scheduler: SchedulerKind::default(),
        }
    }
}

fn default_backup_directory() -> PathBuf {
    PathBuf::from("./backups")
}

fn default_retention_days() -> u64 {
    7
}

/// Report delivery settings. Delivery itself is an external concern; the
/// values are loaded and handed to whichever sink implements it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    /// Whether report mail is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP relay host.
    #[serde(default)]
    pub smtp_server: String,
    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// Sender address.
    #[serde(default)]
    pub sender_email: String,
    /// Sender credential.
    #[serde(default)]
    pub sender_password: String,
    /// Recipient address.
    #[serde(default)]
    pub recipient_email: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            sender_email: String::new(),
            sender_password: String::new(),
            recipient_email: String::new(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level or filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON log lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Top-level shape of devices.yaml.
#[derive(Debug, Deserialize)]
struct DeviceInventory {
    #[serde(default)]
    devices: Vec<DeviceDescriptor>,
}

/// Loads and validates configuration from a directory.
pub struct ConfigStore {
    config_dir: PathBuf,
}

impl ConfigStore {
    /// Open a config store, creating the directory if absent.
    pub fn open(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();
        fs::create_dir_all(&config_dir)?;
        Ok(Self { config_dir })
    }

    /// Path of the device inventory file.
    pub fn devices_path(&self) -> PathBuf {
        self.config_dir.join("devices.yaml")
    }

    /// Path of the settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.yaml")
    }

    /// Load the device inventory, seeding a sample file on first use.
    pub fn load_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let path = self.devices_path();
        if !path.exists() {
            self.seed_sample(&path, SAMPLE_DEVICES)?;
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            NetvaultError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let inventory: DeviceInventory = serde_yaml::from_str(&content).map_err(|e| {
            NetvaultError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        validate_devices(&inventory.devices)?;
        Ok(inventory.devices)
    }

    /// Load service settings, seeding a sample file on first use.
    pub fn load_settings(&self) -> Result<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            self.seed_sample(&path, SAMPLE_SETTINGS)?;
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            NetvaultError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let settings: Settings = serde_yaml::from_str(&content).map_err(|e| {
            NetvaultError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Configured artifact directory.
    pub fn backup_directory(&self) -> Result<PathBuf> {
        Ok(self.load_settings()?.backup.directory)
    }

    /// Configured retention window in days.
    pub fn retention_days(&self) -> Result<u64> {
        Ok(self.load_settings()?.backup.retention_days)
    }

    /// Configured weekly schedule.
    pub fn load_schedule(&self) -> Result<ScheduleConfig> {
        Ok(self.load_settings()?.backup.schedule)
    }

    fn seed_sample(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content)?;
        warn!(path = %path.display(), "Created sample configuration file");
        Ok(())
    }
}

/// Reject devices with empty required fields. Absent fields already fail
/// at deserialization; this catches present-but-blank values.
fn validate_devices(devices: &[DeviceDescriptor]) -> Result<()> {
    for (index, device) in devices.iter().enumerate() {
        if device.ip.trim().is_empty() {
            return Err(NetvaultError::InvalidConfig {
                field: format!("devices[{}].ip", index),
                reason: "must not be empty".to_string(),
            });
        }
        if device.username.trim().is_empty() {
            return Err(NetvaultError::InvalidConfig {
                field: format!("devices[{}].username", index),
                reason: "must not be empty".to_string(),
            });
        }
        if device.device_type.trim().is_empty() {
            return Err(NetvaultError::InvalidConfig {
                field: format!("devices[{}].device_type", index),
                reason: "must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

const SAMPLE_DEVICES: &str = "\
# Device inventory. One entry per device to back up.
devices:
  - name: router-01
    ip: 192.168.1.1
    username: admin
    password: change-me
    device_type: cisco_ios
    port: 22
  - name: switch-01
    ip: 192.168.1.2
    username: admin
    password: change-me
    device_type: cisco_ios
";

const SAMPLE_SETTINGS: &str = "\
backup:
  directory: ./backups
  retention_days: 7
  schedule:
    day: sunday
    time: \"02:00\"
  # cron (default) or polling
  scheduler: cron

email:
  enabled: false
  smtp_server: smtp.example.com
  smtp_port: 587
  sender_email: backups@example.com
  sender_password: change-me
  recipient_email: netops@example.com

logging:
  level: info
  json: false
";

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_settings_defaults_from_empty_sections() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path()).unwrap();
        fs::write(store.settings_path(), "backup:\n  retention_days: 14\n").unwrap();

        let settings = store.load_settings().unwrap();
        assert_eq!(settings.backup.retention_days, 14);
        assert_eq!(settings.backup.directory, PathBuf::from("./backups"));
        assert_eq!(settings.backup.schedule.day, "sunday");
        assert_eq!(settings.backup.schedule.time, "02:00");
        assert_eq!(settings.backup.scheduler, SchedulerKind::Cron);
        assert!(!settings.email.enabled);
        assert_eq!(settings.email.smtp_port, 587);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_load_devices() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path()).unwrap();
        fs::write(
            store.devices_path(),
            "devices:\n  - name: r1\n    ip: 10.0.0.1\n    username: admin\n    password: s\n    device_type: cisco_ios\n",
        )
        .unwrap();

        let devices = store.load_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].display_name(), "r1");
        assert_eq!(devices[0].port, 22);
    }

    #[test]
    fn test_load_devices_rejects_missing_fields() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path()).unwrap();
        fs::write(store.devices_path(), "devices:\n  - name: r1\n    ip: 10.0.0.1\n").unwrap();

        let err = store.load_devices().unwrap_err();
        assert!(matches!(err, NetvaultError::Config(_)));
    }

    #[test]
    fn test_load_devices_rejects_blank_ip() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path()).unwrap();
        fs::write(
            store.devices_path(),
            "devices:\n  - ip: \"  \"\n    username: admin\n    password: s\n    device_type: cisco_ios\n",
        )
        .unwrap();

        let err = store.load_devices().unwrap_err();
        assert!(matches!(err, NetvaultError::InvalidConfig { .. }));
    }

    #[test]
    fn test_load_devices_rejects_malformed_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path()).unwrap();
        fs::write(store.devices_path(), "devices: [ {name: r1").unwrap();

        assert!(store.load_devices().is_err());
    }

    #[test]
    fn test_missing_files_are_seeded_with_samples() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path().join("config")).unwrap();

        let devices = store.load_devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert!(store.devices_path().exists());

        let settings = store.load_settings().unwrap();
        assert_eq!(settings.backup.retention_days, 7);
        assert!(store.settings_path().exists());
    }

    #[test]
    fn test_polling_scheduler_kind_parses() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path()).unwrap();
        fs::write(store.settings_path(), "backup:\n  scheduler: polling\n").unwrap();

        let settings = store.load_settings().unwrap();
        assert_eq!(settings.backup.scheduler, SchedulerKind::Polling);
    }

    #[test]
    fn test_accessors() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::open(temp_dir.path()).unwrap();
        fs::write(
            store.settings_path(),
            "backup:\n  directory: /var/lib/netvault\n  retention_days: 30\n  schedule:\n    day: tuesday\n    time: \"03:15\"\n",
        )
        .unwrap();

        assert_eq!(store.backup_directory().unwrap(), PathBuf::from("/var/lib/netvault"));
        assert_eq!(store.retention_days().unwrap(), 30);
        let schedule = store.load_schedule().unwrap();
        assert_eq!(schedule.day, "tuesday");
        assert_eq!(schedule.time, "03:15");
    }
}
