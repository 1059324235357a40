//! Artifact store for retrieved device configurations.
//!
//! One artifact per device per run, written under a flat directory and
//! named `{device}_{YYYYMMDD_HHMMSS}.txt`. The timestamp sorts both
//! lexically and chronologically, and all artifacts of a run share it, so
//! one run can be correlated across devices by suffix.
//!
//! The header layout is a compatibility surface consumed by external
//! tooling; see [`write_artifact`](ArtifactStore::write_artifact).

use crate::error::{NetvaultError, Result};
use crate::types::DeviceDescriptor;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// File extension for stored artifacts.
pub const ARTIFACT_EXT: &str = "txt";

/// Timestamp format shared by every artifact of a run.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Width of the `=` run in the artifact header separator line.
const SEPARATOR_WIDTH: usize = 70;

/// Length of the `_YYYYMMDD_HHMMSS` file name suffix.
const TIMESTAMP_SUFFIX_LEN: usize = 16;

/// Metadata for one stored artifact.
#[derive(Debug, Clone)]
pub struct ArtifactMeta {
    /// Path of the artifact file.
    pub path: PathBuf,
    /// Bare file name, `{device}_{timestamp}.txt`.
    pub file_name: String,
    /// Filesystem modification time.
    pub modified: SystemTime,
    /// Size in bytes.
    pub size: u64,
}

impl ArtifactMeta {
    /// Device portion of the file name.
    ///
    /// Artifact names carry a fixed `_YYYYMMDD_HHMMSS` suffix; stripping it
    /// keeps device names containing underscores intact. Files without the
    /// suffix fall back to the text before the first underscore.
    pub fn device_key(&self) -> &str {
        let stem = self
            .file_name
            .strip_suffix(".txt")
            .unwrap_or(&self.file_name);
        if stem.len() > TIMESTAMP_SUFFIX_LEN
            && stem.is_char_boundary(stem.len() - TIMESTAMP_SUFFIX_LEN)
        {
            let (head, tail) = stem.split_at(stem.len() - TIMESTAMP_SUFFIX_LEN);
            if is_timestamp_suffix(tail) {
                return head;
            }
        }
        stem.split('_').next().unwrap_or(stem)
    }

    /// Age relative to `now`, saturating to zero for future mtimes.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.modified).unwrap_or_default()
    }
}

/// Check for the `_YYYYMMDD_HHMMSS` shape.
fn is_timestamp_suffix(tail: &str) -> bool {
    let bytes = tail.as_bytes();
    bytes.len() == TIMESTAMP_SUFFIX_LEN
        && bytes[0] == b'_'
        && bytes[9] == b'_'
        && bytes[1..9].iter().all(u8::is_ascii_digit)
        && bytes[10..16].iter().all(u8::is_ascii_digit)
}

/// Derived, read-only view over the artifact store.
///
/// Recomputed on demand, never cached.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupStatistics {
    /// Total number of stored artifacts.
    pub total_artifacts: usize,
    /// Artifact count per device.
    pub per_device: BTreeMap<String, usize>,
    /// File name of the oldest artifact.
    pub oldest: Option<String>,
    /// File name of the newest artifact.
    pub newest: Option<String>,
    /// Total size in megabytes, rounded to two decimals.
    pub total_size_mb: f64,
}

/// Flat-directory store of configuration artifacts.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at `root`, creating the directory tree if absent.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one artifact for `device` captured at `captured_at`.
    ///
    /// The file starts with four `#` header lines (device name, capture
    /// date, device IP, device type), a `#` plus seventy `=` separator
    /// line, one blank line, then the raw body verbatim.
    pub fn write_artifact(
        &self,
        device: &DeviceDescriptor,
        captured_at: DateTime<Local>,
        body: &str,
    ) -> Result<PathBuf> {
        let device_name = sanitize_device_name(device.display_name())?;
        let file_name = format!(
            "{}_{}.{}",
            device_name,
            captured_at.format(TIMESTAMP_FORMAT),
            ARTIFACT_EXT
        );
        let path = self.root.join(&file_name);

        let mut file = BufWriter::new(File::create(&path)?);
        file.write_all(render_header(device, captured_at).as_bytes())?;
        file.write_all(body.as_bytes())?;
        file.flush()?;

        debug!(device = %device_name, file = %file_name, "Wrote artifact");
        Ok(path)
    }

    /// Enumerate all artifacts under the store root.
    pub fn list_artifacts(&self) -> Result<Vec<ArtifactMeta>> {
        let mut artifacts = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXT) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            artifacts.push(ArtifactMeta {
                modified: metadata.modified()?,
                size: metadata.len(),
                path,
                file_name,
            });
        }

        Ok(artifacts)
    }

    /// Remove an artifact. Removing an already-absent artifact succeeds;
    /// any other failure is surfaced.
    pub fn delete_artifact(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NetvaultError::Storage(format!(
                "failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Compute statistics in one pass over the store.
    ///
    /// Oldest/newest ties on modification time break deterministically by
    /// file name.
    pub fn statistics(&self) -> Result<BackupStatistics> {
        let artifacts = self.list_artifacts()?;
        let mut stats = BackupStatistics {
            total_artifacts: artifacts.len(),
            ..Default::default()
        };

        let mut total_size: u64 = 0;
        let mut oldest: Option<&ArtifactMeta> = None;
        let mut newest: Option<&ArtifactMeta> = None;

        for artifact in &artifacts {
            total_size += artifact.size;
            *stats
                .per_device
                .entry(artifact.device_key().to_string())
                .or_insert(0) += 1;

            let key = (artifact.modified, &artifact.file_name);
            if oldest.map_or(true, |o| key < (o.modified, &o.file_name)) {
                oldest = Some(artifact);
            }
            if newest.map_or(true, |n| key > (n.modified, &n.file_name)) {
                newest = Some(artifact);
            }
        }

        stats.oldest = oldest.map(|a| a.file_name.clone());
        stats.newest = newest.map(|a| a.file_name.clone());
        stats.total_size_mb = round2(total_size as f64 / (1024.0 * 1024.0));
        Ok(stats)
    }
}

/// Fixed artifact header: four comment lines, a separator, one blank line.
fn render_header(device: &DeviceDescriptor, captured_at: DateTime<Local>) -> String {
    format!(
        "# Configuration backup for {}\n\
         # Backup date: {}\n\
         # Device IP: {}\n\
         # Device Type: {}\n\
         #{}\n\n",
        device.display_name(),
        captured_at.format("%Y-%m-%d %H:%M:%S"),
        device.ip,
        device.device_type,
        "=".repeat(SEPARATOR_WIDTH),
    )
}

/// Make a device name safe to embed in an artifact file name.
///
/// Path separators and other unsafe characters are replaced with `-`; a
/// name that sanitizes to nothing is a configuration error.
pub fn sanitize_device_name(name: &str) -> Result<String> {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() || c.is_control() => '-',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim_matches('-').to_string();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        return Err(NetvaultError::InvalidConfig {
            field: "device.name".to_string(),
            reason: format!("'{}' does not sanitize to a usable file name", name),
        });
    }
    Ok(sanitized)
}

/// Round to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
