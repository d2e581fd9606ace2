//! Runtime configuration
//!
//! Everything has a default, so an empty JSON object is a valid config file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub reconcile: ReconcileConfig,
    pub defaults: RecordDefaults,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file; in-memory when absent
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub locking: LockingMode,
    pub max_relationship_depth: u8,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
            locking: LockingMode::Immediate,
            max_relationship_depth: 5,
        }
    }
}

/// How a unit of work takes the database lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockingMode {
    /// Write lock at BEGIN; find-or-create cannot race another writer
    #[default]
    Immediate,
    /// Lock on first write
    Deferred,
}

impl From<LockingMode> for rusqlite::TransactionBehavior {
    fn from(mode: LockingMode) -> Self {
        match mode {
            LockingMode::Immediate => rusqlite::TransactionBehavior::Immediate,
            LockingMode::Deferred => rusqlite::TransactionBehavior::Deferred,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    pub duplicate_names: DuplicateNamePolicy,
}

/// What to do when a desired-name list repeats a name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateNamePolicy {
    /// Keep the first occurrence
    #[default]
    Collapse,
    /// Fail before any write
    Reject,
}

/// Field values the operations fill in when the caller does not
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordDefaults {
    pub batch_opportunity_stage: String,
    pub batch_opportunity_close_months: u32,
    pub batch_opportunity_amount: f64,
    pub reconciled_opportunity_stage: String,
    pub reconciled_opportunity_close_days: u32,
    pub reconciled_opportunity_amount: f64,
    pub lead_company: String,
    pub new_account_description: String,
    pub updated_account_description: String,
}

impl Default for RecordDefaults {
    fn default() -> Self {
        Self {
            batch_opportunity_stage: "Qualification".to_string(),
            batch_opportunity_close_months: 3,
            batch_opportunity_amount: 50000.0,
            reconciled_opportunity_stage: "Prospecting".to_string(),
            reconciled_opportunity_close_days: 30,
            reconciled_opportunity_amount: 0.0,
            lead_company: "Unknown".to_string(),
            new_account_description: "New Account".to_string(),
            updated_account_description: "Updated Account".to_string(),
        }
    }
}
