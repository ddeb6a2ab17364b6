//! Dry-run of a migrate: which versions would run, and whether it may run at all.

use serde::Serialize;

use crate::config::SextantConfig;
use crate::error::{Result, SextantError};
use crate::history::SchemaHistory;
use crate::info::MigrationState;
use crate::migration::MigrationResolver;

/// Report returned by the plan command.
#[derive(Debug, Serialize)]
pub struct MigratePlan {
    pub current_version: Option<String>,
    pub target: String,
    pub pending: Vec<PlannedMigration>,
    /// Versions left behind below the last applied one while out-of-order is off.
    pub ignored: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PlannedMigration {
    pub version: String,
    pub description: String,
    pub script: String,
    pub out_of_order: bool,
}

/// Execute the plan command.
///
/// 1. Refuse if any migration failed; failures need repair, not a retry
/// 2. If validate-on-migrate is enabled, refuse on drift (pending work itself is not drift)
/// 3. List pending migrations in the order a migrate would run them
pub fn execute(
    resolver: &dyn MigrationResolver,
    history: &dyn SchemaHistory,
    config: &SextantConfig,
) -> Result<MigratePlan> {
    let mut policy = config.reconciliation_policy();
    policy.pending_or_future = true;
    let aggregator = super::reconcile(resolver, history, &policy)?;

    let blocked: Vec<_> = aggregator
        .all()
        .iter()
        .filter(|info| info.state().needs_intervention())
        .collect();
    if !blocked.is_empty() {
        let versions: Vec<String> = blocked.iter().map(|i| i.version().to_string()).collect();
        tracing::error!(failed = %versions.join(", "), "Refusing to plan over failed migrations");
        return Err(SextantError::InterventionRequired {
            versions: versions.join(", "),
        });
    }

    if config.policy.validate_on_migrate {
        let problems = aggregator.problems();
        if !problems.is_empty() {
            let issues: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
            return Err(SextantError::ValidationFailed(issues.join("\n")));
        }
    }

    let context = aggregator.context();
    let pending: Vec<PlannedMigration> = aggregator
        .pending()
        .into_iter()
        .map(|info| PlannedMigration {
            version: info.version().to_string(),
            description: info.description().to_string(),
            script: info.script().to_string(),
            out_of_order: info.version() < &context.last_applied,
        })
        .collect();

    let ignored: Vec<String> = aggregator
        .in_state(MigrationState::Ignored)
        .into_iter()
        .map(|info| info.version().to_string())
        .collect();

    tracing::info!(
        pending = pending.len(),
        ignored = ignored.len(),
        target = %context.target,
        "Migration plan computed"
    );

    Ok(MigratePlan {
        current_version: aggregator.current(true).map(|i| i.version().to_string()),
        target: context.target.to_string(),
        pending,
        ignored,
    })
}
