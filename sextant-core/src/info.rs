//! Per-version view joining a resolved and an applied migration.
//!
//! [`MigrationInfo::state`] and [`MigrationInfo::validate`] are pure functions
//! of the entry and the shared [`ReconciliationContext`]; calling them again
//! always gives the same answer.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::ReconciliationContext;
use crate::error::{Result, SextantError};
use crate::history::AppliedMigration;
use crate::migration::{MigrationKind, ResolvedMigration};
use crate::version::MigrationVersion;

/// The state of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    Pending,
    AboveTarget,
    BelowBaseline,
    Baseline,
    Ignored,
    MissingSuccess,
    MissingFailed,
    Success,
    Failed,
    OutOfOrder,
    FutureSuccess,
    FutureFailed,
}

impl MigrationState {
    /// Whether a migration in this state is available locally.
    pub fn is_resolved(&self) -> bool {
        !matches!(
            self,
            MigrationState::MissingSuccess
                | MigrationState::MissingFailed
                | MigrationState::FutureSuccess
                | MigrationState::FutureFailed
        )
    }

    /// Whether a migration in this state appears in schema history.
    pub fn is_applied(&self) -> bool {
        !matches!(
            self,
            MigrationState::Pending
                | MigrationState::AboveTarget
                | MigrationState::BelowBaseline
                | MigrationState::Ignored
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            MigrationState::Failed | MigrationState::MissingFailed | MigrationState::FutureFailed
        )
    }

    /// Failed states are never retried automatically; an operator has to
    /// repair or reapply.
    pub fn needs_intervention(&self) -> bool {
        self.is_failed()
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationState::Pending => "Pending",
            MigrationState::AboveTarget => "Above Target",
            MigrationState::BelowBaseline => "Below Baseline",
            MigrationState::Baseline => "Baseline",
            MigrationState::Ignored => "Ignored",
            MigrationState::MissingSuccess => "Missing",
            MigrationState::MissingFailed => "Failed (Missing)",
            MigrationState::Success => "Success",
            MigrationState::Failed => "Failed",
            MigrationState::OutOfOrder => "Out of Order",
            MigrationState::FutureSuccess => "Future",
            MigrationState::FutureFailed => "Failed (Future)",
        };
        f.write_str(name)
    }
}

/// Which side(s) of the reconciliation know about a version.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationEntry {
    Resolved(ResolvedMigration),
    Applied(AppliedMigration),
    Both {
        resolved: ResolvedMigration,
        applied: AppliedMigration,
    },
}

/// The field that differs between history and the resolved migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchField {
    Type,
    Checksum,
    Description,
}

impl fmt::Display for MismatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchField::Type => write!(f, "Type"),
            MismatchField::Checksum => write!(f, "Checksum"),
            MismatchField::Description => write!(f, "Description"),
        }
    }
}

/// A consistency problem found by [`MigrationInfo::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    NotResolvedLocally {
        version: MigrationVersion,
    },
    NotAppliedToDatabase {
        version: MigrationVersion,
    },
    Mismatch {
        field: MismatchField,
        version: MigrationVersion,
        applied: String,
        resolved: String,
    },
}

impl ValidationIssue {
    pub fn version(&self) -> &MigrationVersion {
        match self {
            ValidationIssue::NotResolvedLocally { version }
            | ValidationIssue::NotAppliedToDatabase { version }
            | ValidationIssue::Mismatch { version, .. } => version,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NotResolvedLocally { version } => {
                write!(f, "Detected applied migration not resolved locally: {}", version)
            }
            ValidationIssue::NotAppliedToDatabase { version } => {
                write!(f, "Detected resolved migration not applied to database: {}", version)
            }
            ValidationIssue::Mismatch {
                field,
                version,
                applied,
                resolved,
            } => write!(
                f,
                "Migration {} mismatch for migration {}\n\
                 -> Applied to database : {}\n\
                 -> Resolved locally    : {}",
                field, version, applied, resolved
            ),
        }
    }
}

fn format_checksum(checksum: Option<i32>) -> String {
    checksum.map_or_else(|| "none".to_string(), |c| c.to_string())
}

/// Combined view of a migration (resolved + history) for one version.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationInfo {
    entry: MigrationEntry,
    context: Arc<ReconciliationContext>,
}

impl MigrationInfo {
    /// Pair a resolved and an applied migration under a shared context.
    ///
    /// Fails if both are absent or if their versions differ.
    pub fn new(
        resolved: Option<ResolvedMigration>,
        applied: Option<AppliedMigration>,
        context: Arc<ReconciliationContext>,
    ) -> Result<Self> {
        let entry = match (resolved, applied) {
            (Some(resolved), Some(applied)) => {
                if resolved.version != applied.version {
                    return Err(SextantError::VersionMismatch {
                        resolved: resolved.version.to_string(),
                        applied: applied.version.to_string(),
                    });
                }
                MigrationEntry::Both { resolved, applied }
            }
            (Some(resolved), None) => MigrationEntry::Resolved(resolved),
            (None, Some(applied)) => MigrationEntry::Applied(applied),
            (None, None) => return Err(SextantError::EmptyMigrationInfo),
        };
        Ok(Self { entry, context })
    }

    pub fn entry(&self) -> &MigrationEntry {
        &self.entry
    }

    pub fn context(&self) -> &ReconciliationContext {
        &self.context
    }

    pub fn resolved(&self) -> Option<&ResolvedMigration> {
        match &self.entry {
            MigrationEntry::Resolved(resolved) | MigrationEntry::Both { resolved, .. } => {
                Some(resolved)
            }
            MigrationEntry::Applied(_) => None,
        }
    }

    pub fn applied(&self) -> Option<&AppliedMigration> {
        match &self.entry {
            MigrationEntry::Applied(applied) | MigrationEntry::Both { applied, .. } => {
                Some(applied)
            }
            MigrationEntry::Resolved(_) => None,
        }
    }

    pub fn version(&self) -> &MigrationVersion {
        match &self.entry {
            MigrationEntry::Resolved(r) => &r.version,
            MigrationEntry::Applied(a) | MigrationEntry::Both { applied: a, .. } => &a.version,
        }
    }

    pub fn description(&self) -> &str {
        match &self.entry {
            MigrationEntry::Resolved(r) => &r.description,
            MigrationEntry::Applied(a) | MigrationEntry::Both { applied: a, .. } => &a.description,
        }
    }

    pub fn script(&self) -> &str {
        match &self.entry {
            MigrationEntry::Resolved(r) => &r.script,
            MigrationEntry::Applied(a) | MigrationEntry::Both { applied: a, .. } => &a.script,
        }
    }

    pub fn kind(&self) -> MigrationKind {
        match &self.entry {
            MigrationEntry::Resolved(r) => r.kind,
            MigrationEntry::Applied(a) | MigrationEntry::Both { applied: a, .. } => a.kind,
        }
    }

    pub fn checksum(&self) -> Option<i32> {
        match &self.entry {
            MigrationEntry::Resolved(r) => r.checksum,
            MigrationEntry::Applied(a) | MigrationEntry::Both { applied: a, .. } => a.checksum,
        }
    }

    pub fn installed_on(&self) -> Option<DateTime<Utc>> {
        self.applied().map(|a| a.installed_on)
    }

    pub fn installed_by(&self) -> Option<&str> {
        self.applied().map(|a| a.installed_by.as_str())
    }

    /// Execution time in milliseconds.
    pub fn execution_time(&self) -> Option<i32> {
        self.applied().map(|a| a.execution_time)
    }

    /// Derive the lifecycle state. The order of the checks is significant.
    pub fn state(&self) -> MigrationState {
        let ctx = &*self.context;
        match &self.entry {
            MigrationEntry::Resolved(resolved) => {
                let version = &resolved.version;
                if version.cmp(&ctx.baseline) == Ordering::Less {
                    MigrationState::BelowBaseline
                } else if version.cmp(&ctx.target) == Ordering::Greater {
                    MigrationState::AboveTarget
                } else if version.cmp(&ctx.last_applied) == Ordering::Less && !ctx.out_of_order {
                    MigrationState::Ignored
                } else {
                    MigrationState::Pending
                }
            }
            MigrationEntry::Applied(applied) => match applied.kind {
                MigrationKind::Schema => MigrationState::Success,
                MigrationKind::Baseline => MigrationState::Baseline,
                MigrationKind::Sql | MigrationKind::Code => {
                    match applied.version.cmp(&ctx.last_resolved) {
                        Ordering::Less if applied.success => MigrationState::MissingSuccess,
                        Ordering::Less => MigrationState::MissingFailed,
                        Ordering::Greater if applied.success => MigrationState::FutureSuccess,
                        Ordering::Greater => MigrationState::FutureFailed,
                        Ordering::Equal => applied_outcome(applied),
                    }
                }
            },
            MigrationEntry::Both { applied, .. } => applied_outcome(applied),
        }
    }

    /// Check this entry for consistency; the first failing check wins.
    pub fn validate(&self) -> Option<ValidationIssue> {
        let ctx = &*self.context;

        if let MigrationEntry::Applied(applied) = &self.entry {
            if !ctx.pending_or_future && applied.kind.is_resolvable() {
                return Some(ValidationIssue::NotResolvedLocally {
                    version: applied.version.clone(),
                });
            }
        }

        let state = self.state();
        if (!ctx.pending_or_future && state == MigrationState::Pending)
            || state == MigrationState::Ignored
        {
            return Some(ValidationIssue::NotAppliedToDatabase {
                version: self.version().clone(),
            });
        }

        if let MigrationEntry::Both { resolved, applied } = &self.entry {
            if resolved.version.cmp(&ctx.baseline) == Ordering::Greater {
                if resolved.kind != applied.kind {
                    return Some(mismatch(
                        MismatchField::Type,
                        applied,
                        applied.kind.to_string(),
                        resolved.kind.to_string(),
                    ));
                }
                if resolved.checksum != applied.checksum {
                    return Some(mismatch(
                        MismatchField::Checksum,
                        applied,
                        format_checksum(applied.checksum),
                        format_checksum(resolved.checksum),
                    ));
                }
                if resolved.description != applied.description {
                    return Some(mismatch(
                        MismatchField::Description,
                        applied,
                        applied.description.clone(),
                        resolved.description.clone(),
                    ));
                }
            }
        }

        None
    }
}

/// Outcome of a history row: failure first, then rank order.
fn applied_outcome(applied: &AppliedMigration) -> MigrationState {
    if !applied.success {
        MigrationState::Failed
    } else if applied.in_version_order() {
        MigrationState::Success
    } else {
        MigrationState::OutOfOrder
    }
}

fn mismatch(
    field: MismatchField,
    applied: &AppliedMigration,
    applied_value: String,
    resolved_value: String,
) -> ValidationIssue {
    ValidationIssue::Mismatch {
        field,
        version: applied.version.clone(),
        applied: applied_value,
        resolved: resolved_value,
    }
}
