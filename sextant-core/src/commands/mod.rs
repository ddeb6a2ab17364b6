//! Command implementations: info, validate, plan.

pub mod info;
pub mod plan;
pub mod validate;

use crate::aggregator::InfoAggregator;
use crate::context::ReconciliationPolicy;
use crate::error::Result;
use crate::history::SchemaHistory;
use crate::migration::MigrationResolver;

/// Read both sources and run one reconciliation pass over the snapshot.
pub(crate) fn reconcile(
    resolver: &dyn MigrationResolver,
    history: &dyn SchemaHistory,
    policy: &ReconciliationPolicy,
) -> Result<InfoAggregator> {
    let resolved = resolver.resolve()?;
    let rows = history.applied_rows()?;
    tracing::debug!(
        resolved = resolved.len(),
        history_rows = rows.len(),
        "Reconciling migrations"
    );
    InfoAggregator::build(resolved, rows, policy)
}
