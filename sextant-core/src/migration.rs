//! Resolved migrations and the resolver contract.
//!
//! Discovery itself lives outside this crate; a resolver only has to hand
//! over the migrations it found.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::version::MigrationVersion;

/// The type of a migration, as stored in the history table's `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationKind {
    /// Schema-level change recorded by the tool itself; never backed by a script.
    Schema,
    /// Marker: assume the schema is at this version, do not replay earlier migrations.
    Baseline,
    /// Script-backed migration.
    Sql,
    /// Migration implemented in application code.
    Code,
}

impl MigrationKind {
    /// Whether migrations of this kind carry a content checksum.
    pub fn is_checksum_bearing(&self) -> bool {
        matches!(self, MigrationKind::Sql | MigrationKind::Code)
    }

    /// Kinds whose history rows are expected to keep resolving locally.
    pub fn is_resolvable(&self) -> bool {
        !matches!(self, MigrationKind::Schema | MigrationKind::Baseline)
    }
}

impl fmt::Display for MigrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationKind::Schema => write!(f, "SCHEMA"),
            MigrationKind::Baseline => write!(f, "BASELINE"),
            MigrationKind::Sql => write!(f, "SQL"),
            MigrationKind::Code => write!(f, "CODE"),
        }
    }
}

/// A migration available from the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMigration {
    pub version: MigrationVersion,
    pub description: String,
    pub script: String,
    #[serde(default)]
    pub checksum: Option<i32>,
    #[serde(rename = "type")]
    pub kind: MigrationKind,
}

impl ResolvedMigration {
    pub fn new(
        version: MigrationVersion,
        description: impl Into<String>,
        script: impl Into<String>,
        checksum: Option<i32>,
        kind: MigrationKind,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            script: script.into(),
            checksum,
            kind,
        }
    }
}

/// Source of resolved migrations.
///
/// Implementations may return migrations in any order. Returning two
/// migrations with the same version is reported as an error by the
/// aggregator, never silently resolved.
pub trait MigrationResolver {
    fn resolve(&self) -> Result<Vec<ResolvedMigration>>;
}

impl MigrationResolver for Vec<ResolvedMigration> {
    fn resolve(&self) -> Result<Vec<ResolvedMigration>> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_names() {
        let kind: MigrationKind = serde_json::from_str("\"BASELINE\"").unwrap();
        assert_eq!(kind, MigrationKind::Baseline);
        assert_eq!(serde_json::to_string(&MigrationKind::Code).unwrap(), "\"CODE\"");
        assert!(serde_json::from_str::<MigrationKind>("\"SQL_REPEATABLE\"").is_err());
    }

    #[test]
    fn test_kind_flags() {
        assert!(MigrationKind::Sql.is_checksum_bearing());
        assert!(!MigrationKind::Baseline.is_checksum_bearing());
        assert!(MigrationKind::Code.is_resolvable());
        assert!(!MigrationKind::Schema.is_resolvable());
    }

    #[test]
    fn test_resolved_from_json() {
        let json = r#"{
            "version": "1.1",
            "description": "Add users",
            "script": "V1_1__Add_users.sql",
            "checksum": -12345,
            "type": "SQL"
        }"#;
        let m: ResolvedMigration = serde_json::from_str(json).unwrap();
        assert_eq!(m.version, MigrationVersion::parse("1.1").unwrap());
        assert_eq!(m.checksum, Some(-12345));
        assert_eq!(m.kind, MigrationKind::Sql);
    }

    #[test]
    fn test_resolved_checksum_is_optional() {
        let json = r#"{"version": "3", "description": "Baseline", "script": "<< Baseline >>", "type": "BASELINE"}"#;
        let m: ResolvedMigration = serde_json::from_str(json).unwrap();
        assert_eq!(m.checksum, None);
    }
}
