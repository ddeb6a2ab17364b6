//! Values derived once per reconciliation pass and shared by every info.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, SextantError};
use crate::history::AppliedMigration;
use crate::migration::{MigrationKind, ResolvedMigration};
use crate::version::MigrationVersion;

/// The highest version a pass may consider for migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TargetVersion {
    /// No upper bound.
    #[default]
    Latest,
    /// Whatever is currently the highest applied version.
    Current,
    Version(MigrationVersion),
}

impl TargetVersion {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "latest" => Ok(TargetVersion::Latest),
            "current" => Ok(TargetVersion::Current),
            other => MigrationVersion::parse(other).map(TargetVersion::Version),
        }
    }
}

impl FromStr for TargetVersion {
    type Err = SextantError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TargetVersion::parse(s)
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetVersion::Latest => write!(f, "latest"),
            TargetVersion::Current => write!(f, "current"),
            TargetVersion::Version(v) => write!(f, "{}", v),
        }
    }
}

/// Caller policy for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPolicy {
    /// Used only when history holds no baseline row.
    pub baseline: Option<MigrationVersion>,
    pub target: TargetVersion,
    /// Allow resolved migrations below the last applied version to run.
    pub out_of_order: bool,
    /// Accept history that references pending or unresolvable migrations.
    pub pending_or_future: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationContext {
    pub baseline: MigrationVersion,
    pub target: MigrationVersion,
    pub last_applied: MigrationVersion,
    pub last_resolved: MigrationVersion,
    pub out_of_order: bool,
    pub pending_or_future: bool,
}

impl ReconciliationContext {
    /// Derive the context from the complete resolved and applied sets.
    pub fn build(
        resolved: &[ResolvedMigration],
        applied: &[AppliedMigration],
        policy: &ReconciliationPolicy,
    ) -> Self {
        let baseline = applied
            .iter()
            .filter(|a| a.kind == MigrationKind::Baseline)
            .max_by_key(|a| a.installed_rank)
            .map(|a| a.version.clone())
            .or_else(|| policy.baseline.clone())
            .unwrap_or(MigrationVersion::EMPTY);

        let last_applied = applied
            .iter()
            .filter(|a| a.success)
            .map(|a| &a.version)
            .max()
            .cloned()
            .unwrap_or(MigrationVersion::EMPTY);

        let last_resolved = resolved
            .iter()
            .map(|r| &r.version)
            .max()
            .cloned()
            .unwrap_or(MigrationVersion::EMPTY);

        let target = match &policy.target {
            TargetVersion::Latest => MigrationVersion::LATEST,
            TargetVersion::Current => last_applied.clone(),
            TargetVersion::Version(v) => v.clone(),
        };

        Self {
            baseline,
            target,
            last_applied,
            last_resolved,
            out_of_order: policy.out_of_order,
            pending_or_future: policy.pending_or_future,
        }
    }
}
