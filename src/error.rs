//! Error types for netvault.
//!
//! This module provides a unified error type [`NetvaultError`] for all
//! netvault operations, along with a convenient [`Result`] type alias.
//!
//! Per-device transport failures are deliberately not represented here:
//! they are confined to the device boundary by the orchestrator and
//! recorded as human-readable strings in the run result. Only
//! configuration-load and schedule-start failures propagate as hard
//! errors to the caller.

use crate::schedule::cadence::CadenceParseError;
use std::io;
use thiserror::Error;

/// Main error type for netvault operations.
#[derive(Error, Debug)]
pub enum NetvaultError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Scheduling errors
    #[error("Invalid schedule: {0}")]
    Schedule(#[from] CadenceParseError),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // External errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NetvaultError {
    /// Check if the error is a configuration problem the operator must fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NetvaultError::Config(_)
                | NetvaultError::InvalidConfig { .. }
                | NetvaultError::Schedule(_)
        )
    }
}

impl From<serde_yaml::Error> for NetvaultError {
    fn from(e: serde_yaml::Error) -> Self {
        NetvaultError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for NetvaultError {
    fn from(e: serde_json::Error) -> Self {
        NetvaultError::Serialization(e.to_string())
    }
}

/// Result type alias for netvault operations.
pub type Result<T> = std::result::Result<T, NetvaultError>;
