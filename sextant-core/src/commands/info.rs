use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SextantConfig;
use crate::error::Result;
use crate::history::SchemaHistory;
use crate::info::{MigrationInfo, MigrationState};
use crate::migration::MigrationResolver;

/// Flattened view of one migration for display and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct InfoRow {
    pub version: String,
    pub description: String,
    pub migration_type: String,
    pub script: String,
    pub state: MigrationState,
    pub installed_on: Option<DateTime<Utc>>,
    pub installed_by: Option<String>,
    pub execution_time: Option<i32>,
    pub checksum: Option<i32>,
}

impl From<&MigrationInfo> for InfoRow {
    fn from(info: &MigrationInfo) -> Self {
        Self {
            version: info.version().to_string(),
            description: info.description().to_string(),
            migration_type: info.kind().to_string(),
            script: info.script().to_string(),
            state: info.state(),
            installed_on: info.installed_on(),
            installed_by: info.installed_by().map(str::to_string),
            execution_time: info.execution_time(),
            checksum: info.checksum(),
        }
    }
}

/// Report returned by the info command.
#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub current_version: Option<String>,
    pub migrations: Vec<InfoRow>,
}

/// Execute the info command: merge resolved migrations and applied history into a unified view.
pub fn execute(
    resolver: &dyn MigrationResolver,
    history: &dyn SchemaHistory,
    config: &SextantConfig,
) -> Result<InfoReport> {
    let aggregator = super::reconcile(resolver, history, &config.reconciliation_policy())?;

    let current_version = aggregator
        .current(true)
        .map(|info| info.version().to_string());
    let migrations: Vec<InfoRow> = aggregator.all().iter().map(InfoRow::from).collect();

    tracing::debug!(
        total = migrations.len(),
        pending = aggregator.pending().len(),
        failed = aggregator.failed().len(),
        "Info completed"
    );

    Ok(InfoReport {
        current_version,
        migrations,
    })
}
