//! Schema history rows and the ranked view the engine reasons about.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::migration::MigrationKind;
use crate::version::MigrationVersion;

/// A row from the schema history table, one per execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub installed_rank: i32,
    pub version: MigrationVersion,
    pub description: String,
    #[serde(rename = "type")]
    pub migration_type: MigrationKind,
    pub script: String,
    #[serde(default)]
    pub checksum: Option<i32>,
    #[serde(default)]
    pub installed_by: String,
    pub installed_on: DateTime<Utc>,
    pub execution_time: i32,
    pub success: bool,
}

/// Source of schema history rows.
///
/// Must return every row of one consistent snapshot; ordering is taken from
/// `installed_rank`, not from the position in the returned list.
pub trait SchemaHistory {
    fn applied_rows(&self) -> Result<Vec<HistoryRow>>;
}

impl SchemaHistory for Vec<HistoryRow> {
    fn applied_rows(&self) -> Result<Vec<HistoryRow>> {
        Ok(self.clone())
    }
}

/// An applied migration with its position in version order and in install order.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMigration {
    pub version: MigrationVersion,
    pub description: String,
    pub script: String,
    pub checksum: Option<i32>,
    pub kind: MigrationKind,
    pub success: bool,
    pub installed_by: String,
    pub installed_on: DateTime<Utc>,
    pub execution_time: i32,
    /// 1-based rank when the applied versions are sorted by version.
    pub version_rank: usize,
    /// 1-based rank when the applied versions are sorted by installation.
    pub installed_rank: usize,
}

impl AppliedMigration {
    /// Whether this row was applied in version order relative to the rest of history.
    pub fn in_version_order(&self) -> bool {
        self.version_rank == self.installed_rank
    }
}

/// Rank the whole history in one pass.
///
/// When several rows share a version, the latest attempt represents it.
/// Both ranks are computed over the represented rows, so a retried version
/// does not shift every later rank. The result is in installation order.
pub fn rank_applied(mut rows: Vec<HistoryRow>) -> Vec<AppliedMigration> {
    rows.sort_by_key(|r| r.installed_rank);

    let mut latest: BTreeMap<MigrationVersion, HistoryRow> = BTreeMap::new();
    for row in rows {
        latest.insert(row.version.clone(), row);
    }

    let mut by_install: Vec<(usize, HistoryRow)> = latest
        .into_values()
        .enumerate()
        .map(|(i, row)| (i + 1, row))
        .collect();
    by_install.sort_by_key(|(_, row)| row.installed_rank);

    by_install
        .into_iter()
        .enumerate()
        .map(|(i, (version_rank, row))| AppliedMigration {
            version: row.version,
            description: row.description,
            script: row.script,
            checksum: row.checksum,
            kind: row.migration_type,
            success: row.success,
            installed_by: row.installed_by,
            installed_on: row.installed_on,
            execution_time: row.execution_time,
            version_rank,
            installed_rank: i + 1,
        })
        .collect()
}
