//! Retention policy for stored artifacts.
//!
//! Selection is a pure function over artifact metadata so the cutoff rule
//! can be tested without touching a filesystem. An artifact is a deletion
//! candidate when it is strictly older than the window; an artifact exactly
//! at the boundary is kept.

use crate::store::ArtifactMeta;
use std::time::{Duration, SystemTime};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Select artifacts whose age at `now` strictly exceeds `retention_days`.
///
/// Returned references preserve the input order.
pub fn select_for_deletion<'a>(
    artifacts: &'a [ArtifactMeta],
    retention_days: u64,
    now: SystemTime,
) -> Vec<&'a ArtifactMeta> {
    let window = Duration::from_secs(retention_days * SECS_PER_DAY);
    artifacts
        .iter()
        .filter(|artifact| match now.duration_since(artifact.modified) {
            Ok(age) => age > window,
            // Modified after `now`: never eligible.
            Err(_) => false,
        })
        .collect()
}
