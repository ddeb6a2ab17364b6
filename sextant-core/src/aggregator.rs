//! Joins resolved migrations and schema history into one info per version.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::context::{ReconciliationContext, ReconciliationPolicy};
use crate::error::{Result, SextantError};
use crate::history::{rank_applied, AppliedMigration, HistoryRow};
use crate::info::{MigrationInfo, MigrationState, ValidationIssue};
use crate::migration::{MigrationKind, ResolvedMigration};
use crate::version::MigrationVersion;

/// The result of one reconciliation pass, sorted by version.
#[derive(Debug, Clone)]
pub struct InfoAggregator {
    context: Arc<ReconciliationContext>,
    infos: Vec<MigrationInfo>,
}

impl InfoAggregator {
    /// Reconcile resolved migrations against raw history rows.
    ///
    /// Fails without producing any info if two resolved migrations share a version.
    pub fn build(
        resolved: Vec<ResolvedMigration>,
        history: Vec<HistoryRow>,
        policy: &ReconciliationPolicy,
    ) -> Result<Self> {
        check_duplicates(&resolved)?;
        check_checksums(&resolved)?;

        let applied = rank_applied(history);
        let context = Arc::new(ReconciliationContext::build(&resolved, &applied, policy));

        let mut resolved_by_version: BTreeMap<MigrationVersion, ResolvedMigration> = resolved
            .into_iter()
            .map(|r| (r.version.clone(), r))
            .collect();
        let mut applied_by_version: BTreeMap<MigrationVersion, AppliedMigration> = applied
            .into_iter()
            .map(|a| (a.version.clone(), a))
            .collect();

        let versions: BTreeSet<MigrationVersion> = resolved_by_version
            .keys()
            .chain(applied_by_version.keys())
            .cloned()
            .collect();

        let mut infos = Vec::with_capacity(versions.len());
        for version in &versions {
            let resolved = resolved_by_version.remove(version);
            let applied = applied_by_version.remove(version);
            infos.push(MigrationInfo::new(resolved, applied, Arc::clone(&context))?);
        }

        Ok(Self { context, infos })
    }

    pub fn context(&self) -> &ReconciliationContext {
        &self.context
    }

    /// Every info, ascending by version.
    pub fn all(&self) -> &[MigrationInfo] {
        &self.infos
    }

    pub fn get(&self, version: &MigrationVersion) -> Option<&MigrationInfo> {
        self.infos
            .binary_search_by(|info| info.version().cmp(version))
            .ok()
            .map(|i| &self.infos[i])
    }

    pub fn in_state(&self, state: MigrationState) -> Vec<&MigrationInfo> {
        self.infos.iter().filter(|i| i.state() == state).collect()
    }

    pub fn pending(&self) -> Vec<&MigrationInfo> {
        self.in_state(MigrationState::Pending)
    }

    pub fn applied(&self) -> Vec<&MigrationInfo> {
        self.infos.iter().filter(|i| i.state().is_applied()).collect()
    }

    pub fn failed(&self) -> Vec<&MigrationInfo> {
        self.infos.iter().filter(|i| i.state().is_failed()).collect()
    }

    /// The highest successfully applied version.
    ///
    /// With `include_baseline` false, baseline markers are skipped so the
    /// answer is the last migration that actually ran.
    pub fn current(&self, include_baseline: bool) -> Option<&MigrationInfo> {
        self.infos.iter().rev().find(|info| {
            info.applied().is_some_and(|a| {
                a.success && (include_baseline || a.kind != MigrationKind::Baseline)
            })
        })
    }

    /// The first problem of each info, in version order.
    pub fn problems(&self) -> Vec<ValidationIssue> {
        self.infos.iter().filter_map(MigrationInfo::validate).collect()
    }
}

fn check_duplicates(resolved: &[ResolvedMigration]) -> Result<()> {
    let mut seen: BTreeMap<&MigrationVersion, &str> = BTreeMap::new();
    for migration in resolved {
        if let Some(first) = seen.insert(&migration.version, migration.script.as_str()) {
            return Err(SextantError::DuplicateVersion {
                version: migration.version.to_string(),
                first: first.to_string(),
                second: migration.script.clone(),
            });
        }
    }
    Ok(())
}

/// Script-backed migrations must arrive with a checksum.
fn check_checksums(resolved: &[ResolvedMigration]) -> Result<()> {
    match resolved
        .iter()
        .find(|m| m.kind.is_checksum_bearing() && m.checksum.is_none())
    {
        Some(migration) => Err(SextantError::MissingChecksum {
            version: migration.version.to_string(),
            script: migration.script.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::context::TargetVersion;

    fn v(raw: &str) -> MigrationVersion {
        MigrationVersion::parse(raw).unwrap()
    }

    fn resolved(version: &str) -> ResolvedMigration {
        ResolvedMigration::new(
            v(version),
            format!("migration {}", version),
            format!("V{}__migration.sql", version),
            Some(version.len() as i32),
            MigrationKind::Sql,
        )
    }

    fn row(rank: i32, version: &str, success: bool) -> HistoryRow {
        HistoryRow {
            installed_rank: rank,
            version: v(version),
            description: format!("migration {}", version),
            migration_type: MigrationKind::Sql,
            script: format!("V{}__migration.sql", version),
            checksum: Some(version.len() as i32),
            installed_by: "deploy".to_string(),
            installed_on: Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, rank as u32).unwrap(),
            execution_time: 3,
            success,
        }
    }

    fn baseline_row(rank: i32, version: &str) -> HistoryRow {
        HistoryRow {
            migration_type: MigrationKind::Baseline,
            description: "<< Baseline >>".to_string(),
            script: "<< Baseline >>".to_string(),
            checksum: None,
            ..row(rank, version, true)
        }
    }

    fn states(agg: &InfoAggregator) -> Vec<(String, MigrationState)> {
        agg.all()
            .iter()
            .map(|i| (i.version().to_string(), i.state()))
            .collect()
    }

    #[test]
    fn test_pending_tail() {
        let agg = InfoAggregator::build(
            vec![resolved("1"), resolved("2"), resolved("3")],
            vec![row(1, "1", true), row(2, "2", true)],
            &ReconciliationPolicy::default(),
        )
        .unwrap();

        assert_eq!(
            states(&agg),
            vec![
                ("1".to_string(), MigrationState::Success),
                ("2".to_string(), MigrationState::Success),
                ("3".to_string(), MigrationState::Pending),
            ]
        );
        assert_eq!(agg.pending().len(), 1);
        assert_eq!(agg.current(true).map(|i| i.version().to_string()), Some("2".to_string()));
    }

    #[test]
    fn test_missing_success() {
        let agg = InfoAggregator::build(
            vec![resolved("1"), resolved("3")],
            vec![row(1, "1", true), row(2, "2", true), row(3, "3", true)],
            &ReconciliationPolicy::default(),
        )
        .unwrap();

        assert_eq!(agg.context().last_resolved, v("3"));
        let v2 = agg.get(&v("2")).unwrap();
        assert!(v2.resolved().is_none());
        assert_eq!(v2.state(), MigrationState::MissingSuccess);
    }

    #[test]
    fn test_out_of_order_pair() {
        let agg = InfoAggregator::build(
            vec![resolved("1"), resolved("2")],
            vec![row(1, "2", true), row(2, "1", true)],
            &ReconciliationPolicy::default(),
        )
        .unwrap();

        assert_eq!(
            states(&agg),
            vec![
                ("1".to_string(), MigrationState::OutOfOrder),
                ("2".to_string(), MigrationState::OutOfOrder),
            ]
        );
    }

    #[test]
    fn test_duplicate_resolved_version_fails() {
        let mut dup = resolved("1.0");
        dup.script = "V1_0__again.sql".to_string();
        let err = InfoAggregator::build(
            vec![resolved("1"), resolved("2"), dup],
            vec![],
            &ReconciliationPolicy::default(),
        )
        .unwrap_err();

        match err {
            SextantError::DuplicateVersion { version, first, second } => {
                assert_eq!(version, "1.0");
                assert_eq!(first, "V1__migration.sql");
                assert_eq!(second, "V1_0__again.sql");
            }
            other => panic!("Expected DuplicateVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_script_migration_without_checksum_fails() {
        let mut unchecked = resolved("2");
        unchecked.checksum = None;
        let err = InfoAggregator::build(
            vec![resolved("1"), unchecked],
            vec![],
            &ReconciliationPolicy::default(),
        )
        .unwrap_err();

        match err {
            SextantError::MissingChecksum { version, script } => {
                assert_eq!(version, "2");
                assert_eq!(script, "V2__migration.sql");
            }
            other => panic!("Expected MissingChecksum, got {:?}", other),
        }
    }

    #[test]
    fn test_resolved_baseline_marker_is_success_when_in_order() {
        let marker = ResolvedMigration::new(
            v("3"),
            "<< Baseline >>",
            "<< Baseline >>",
            None,
            MigrationKind::Baseline,
        );
        let agg = InfoAggregator::build(
            vec![marker],
            vec![baseline_row(1, "3")],
            &ReconciliationPolicy::default(),
        )
        .unwrap();

        let info = agg.get(&v("3")).unwrap();
        let applied = info.applied().unwrap();
        assert!(applied.success);
        assert_eq!((applied.version_rank, applied.installed_rank), (1, 1));
        assert_eq!(info.state(), MigrationState::Success);
        assert!(agg.problems().is_empty());
    }

    #[test]
    fn test_output_is_independent_of_input_order() {
        let policy = ReconciliationPolicy::default();
        let a = InfoAggregator::build(
            vec![resolved("1"), resolved("1.10"), resolved("1.9"), resolved("4")],
            vec![row(1, "1", true), row(2, "1.9", true), row(3, "3", true)],
            &policy,
        )
        .unwrap();
        let b = InfoAggregator::build(
            vec![resolved("4"), resolved("1.9"), resolved("1"), resolved("1.10")],
            vec![row(3, "3", true), row(1, "1", true), row(2, "1.9", true)],
            &policy,
        )
        .unwrap();

        assert_eq!(states(&a), states(&b));
        assert_eq!(a.problems(), b.problems());
        let versions: Vec<String> = a.all().iter().map(|i| i.version().to_string()).collect();
        assert_eq!(versions, vec!["1", "1.9", "1.10", "3", "4"]);
    }

    #[test]
    fn test_baseline_history() {
        let agg = InfoAggregator::build(
            vec![resolved("1"), resolved("2"), resolved("3"), resolved("4")],
            vec![baseline_row(1, "3"), row(2, "4", true)],
            &ReconciliationPolicy::default(),
        )
        .unwrap();

        assert_eq!(
            states(&agg),
            vec![
                ("1".to_string(), MigrationState::BelowBaseline),
                ("2".to_string(), MigrationState::BelowBaseline),
                ("3".to_string(), MigrationState::Success),
                ("4".to_string(), MigrationState::Success),
            ]
        );
        assert!(agg.problems().is_empty());
        assert_eq!(agg.current(false).map(|i| i.version().to_string()), Some("4".to_string()));
    }

    #[test]
    fn test_current_can_skip_baseline() {
        let agg = InfoAggregator::build(
            vec![resolved("5")],
            vec![row(1, "1", true), baseline_row(2, "3")],
            &ReconciliationPolicy {
                pending_or_future: true,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(agg.current(true).map(|i| i.version().to_string()), Some("3".to_string()));
        assert_eq!(agg.current(false).map(|i| i.version().to_string()), Some("1".to_string()));
    }

    #[test]
    fn test_current_ignores_failed_rows() {
        let agg = InfoAggregator::build(
            vec![resolved("1"), resolved("2")],
            vec![row(1, "1", true), row(2, "2", false)],
            &ReconciliationPolicy::default(),
        )
        .unwrap();

        assert_eq!(agg.current(true).map(|i| i.version().to_string()), Some("1".to_string()));
        assert_eq!(agg.failed().len(), 1);
        assert_eq!(agg.failed()[0].state(), MigrationState::Failed);
    }

    #[test]
    fn test_gap_is_ignored_unless_out_of_order() {
        let resolved_set = vec![resolved("1"), resolved("2"), resolved("3")];
        let history = vec![row(1, "1", true), row(2, "3", true)];

        let strict = InfoAggregator::build(resolved_set.clone(), history.clone(), &ReconciliationPolicy::default()).unwrap();
        assert_eq!(strict.get(&v("2")).unwrap().state(), MigrationState::Ignored);
        assert_eq!(
            strict.problems().iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            vec!["Detected resolved migration not applied to database: 2".to_string()]
        );

        let lenient = InfoAggregator::build(
            resolved_set,
            history,
            &ReconciliationPolicy {
                out_of_order: true,
                pending_or_future: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(lenient.get(&v("2")).unwrap().state(), MigrationState::Pending);
        assert!(lenient.problems().is_empty());
    }

    #[test]
    fn test_target_marks_above_target() {
        let agg = InfoAggregator::build(
            vec![resolved("1"), resolved("2"), resolved("3")],
            vec![],
            &ReconciliationPolicy {
                target: TargetVersion::Version(v("2")),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(agg.in_state(MigrationState::AboveTarget).len(), 1);
        assert_eq!(agg.pending().len(), 2);
    }

    #[test]
    fn test_problems_follow_version_order() {
        let mut drifted = resolved("1");
        drifted.checksum = Some(999);
        let agg = InfoAggregator::build(
            vec![drifted, resolved("3")],
            vec![row(1, "1", true), row(2, "2", true)],
            &ReconciliationPolicy::default(),
        )
        .unwrap();

        let problems: Vec<String> = agg.problems().iter().map(|p| p.version().to_string()).collect();
        assert_eq!(problems, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_empty_inputs() {
        let agg = InfoAggregator::build(vec![], vec![], &ReconciliationPolicy::default()).unwrap();
        assert!(agg.all().is_empty());
        assert!(agg.current(true).is_none());
        assert!(agg.problems().is_empty());
    }
}
