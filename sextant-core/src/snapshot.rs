//! JSON snapshot sources for the resolver and history contracts.
//!
//! A resolved snapshot is a JSON array of `{version, description, script,
//! checksum, type}` objects. A history snapshot is a JSON export of the
//! schema history table, one object per row with the table's column names.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{Result, SextantError};
use crate::history::{HistoryRow, SchemaHistory};
use crate::migration::{MigrationResolver, ResolvedMigration};

/// Resolved migrations exported to a JSON file.
#[derive(Debug, Clone)]
pub struct JsonResolvedSnapshot {
    path: PathBuf,
}

impl JsonResolvedSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MigrationResolver for JsonResolvedSnapshot {
    fn resolve(&self) -> Result<Vec<ResolvedMigration>> {
        if !self.path.exists() {
            tracing::warn!(path = %self.path.display(), "Resolved snapshot does not exist");
            return Ok(Vec::new());
        }
        let migrations: Vec<ResolvedMigration> = read_snapshot(&self.path)?;
        tracing::debug!(path = %self.path.display(), count = migrations.len(), "Loaded resolved snapshot");
        Ok(migrations)
    }
}

/// Schema history rows exported to a JSON file.
///
/// A missing file means the history table was never created: every resolved
/// migration is then pending.
#[derive(Debug, Clone)]
pub struct JsonHistorySnapshot {
    path: PathBuf,
}

impl JsonHistorySnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SchemaHistory for JsonHistorySnapshot {
    fn applied_rows(&self) -> Result<Vec<HistoryRow>> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "No history snapshot; treating history as empty");
            return Ok(Vec::new());
        }
        let rows: Vec<HistoryRow> = read_snapshot(&self.path)?;
        tracing::debug!(path = %self.path.display(), count = rows.len(), "Loaded history snapshot");
        Ok(rows)
    }
}

fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SextantError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to read snapshot '{}': {}", path.display(), e),
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| SextantError::SnapshotError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
