use serde::Serialize;

use crate::config::SextantConfig;
use crate::error::{Result, SextantError};
use crate::history::SchemaHistory;
use crate::info::MigrationState;
use crate::migration::MigrationResolver;

/// Report returned after a validate operation.
#[derive(Debug, Serialize)]
pub struct ValidateReport {
    pub valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Execute the validate command.
///
/// Every version's first problem becomes an issue; any issue fails the
/// command. Out-of-order application and unresolvable history that the
/// policy tolerates are reported as warnings.
pub fn execute(
    resolver: &dyn MigrationResolver,
    history: &dyn SchemaHistory,
    config: &SextantConfig,
) -> Result<ValidateReport> {
    let aggregator = super::reconcile(resolver, history, &config.reconciliation_policy())?;

    let issues: Vec<String> = aggregator
        .problems()
        .iter()
        .map(|issue| issue.to_string())
        .collect();

    let mut warnings = Vec::new();
    if aggregator.all().iter().all(|info| info.applied().is_none()) {
        warnings.push("No schema history found; nothing applied yet.".to_string());
    }
    for info in aggregator.all() {
        match info.state() {
            MigrationState::OutOfOrder => warnings.push(format!(
                "Migration {} ({}) was applied out of version order.",
                info.version(),
                info.script()
            )),
            MigrationState::FutureSuccess => warnings.push(format!(
                "Applied migration {} ({}) is newer than every resolved migration.",
                info.version(),
                info.script()
            )),
            MigrationState::MissingSuccess if info.validate().is_none() => warnings.push(format!(
                "Applied migration {} ({}) no longer resolves locally.",
                info.version(),
                info.script()
            )),
            _ => {}
        }
    }

    let valid = issues.is_empty();

    tracing::info!(
        valid = valid,
        issue_count = issues.len(),
        warning_count = warnings.len(),
        "Validation completed"
    );

    if !valid {
        return Err(SextantError::ValidationFailed(issues.join("\n")));
    }

    Ok(ValidateReport {
        valid,
        issues,
        warnings,
    })
}
