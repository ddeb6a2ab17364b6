//! Migration versions: dotted numeric identifiers with a total order.
//!
//! Two sentinels bracket every parsed version: [`MigrationVersion::EMPTY`]
//! sorts before all of them and [`MigrationVersion::LATEST`] after all of them.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SextantError};

#[derive(Debug, Clone)]
enum Repr {
    Empty,
    Numeric(Vec<u64>),
    Latest,
}

/// A parsed migration version, supporting dotted numeric segments (e.g., "1.2.3").
///
/// Equality follows the ordering: `1.0` and `1` are the same version.
#[derive(Debug, Clone)]
pub struct MigrationVersion {
    repr: Repr,
    raw: String,
}

impl MigrationVersion {
    /// Lowest possible version, used when nothing has been applied or resolved.
    pub const EMPTY: MigrationVersion = MigrationVersion {
        repr: Repr::Empty,
        raw: String::new(),
    };

    /// Unbounded version, the default migration target.
    pub const LATEST: MigrationVersion = MigrationVersion {
        repr: Repr::Latest,
        raw: String::new(),
    };

    /// Parse a version string like `"1.2.3"` or `"1_2"` into segments.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(parse_error(raw, "version string is empty"));
        }

        // Support both "." and "_" as segment separators
        let mut segments = Vec::new();
        for segment in raw.split(['.', '_']) {
            if segment.is_empty() {
                return Err(parse_error(raw, "empty segment"));
            }
            if !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(parse_error(
                    raw,
                    &format!("segment '{}' is not a number", segment),
                ));
            }
            let value = segment
                .parse::<u64>()
                .map_err(|e| parse_error(raw, &format!("segment '{}': {}", segment, e)))?;
            segments.push(value);
        }

        Ok(MigrationVersion {
            repr: Repr::Numeric(segments),
            raw: raw.to_string(),
        })
    }

    /// Numeric segments, or `None` for the sentinels.
    pub fn segments(&self) -> Option<&[u64]> {
        match &self.repr {
            Repr::Numeric(segments) => Some(segments),
            Repr::Empty | Repr::Latest => None,
        }
    }

    /// The text this version was parsed from.
    pub fn as_str(&self) -> &str {
        match self.repr {
            Repr::Empty => "<< Empty Schema >>",
            Repr::Latest => "<< Latest Version >>",
            Repr::Numeric(_) => &self.raw,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.repr, Repr::Empty)
    }

    pub fn is_latest(&self) -> bool {
        matches!(self.repr, Repr::Latest)
    }

    /// Segments without trailing zeros, so `1.2.0` and `1.2` share one key.
    fn significant(segments: &[u64]) -> &[u64] {
        let len = segments
            .iter()
            .rposition(|s| *s != 0)
            .map_or(0, |i| i + 1);
        &segments[..len]
    }
}

fn parse_error(raw: &str, reason: &str) -> SextantError {
    SextantError::VersionParseError {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

impl Ord for MigrationVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.repr, &other.repr) {
            (Repr::Empty, Repr::Empty) | (Repr::Latest, Repr::Latest) => Ordering::Equal,
            (Repr::Empty, _) | (_, Repr::Latest) => Ordering::Less,
            (_, Repr::Empty) | (Repr::Latest, _) => Ordering::Greater,
            (Repr::Numeric(a), Repr::Numeric(b)) => {
                let max_len = a.len().max(b.len());
                for i in 0..max_len {
                    let x = a.get(i).copied().unwrap_or(0);
                    let y = b.get(i).copied().unwrap_or(0);
                    match x.cmp(&y) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                Ordering::Equal
            }
        }
    }
}

impl PartialOrd for MigrationVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MigrationVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MigrationVersion {}

impl Hash for MigrationVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            Repr::Empty => 0u8.hash(state),
            Repr::Numeric(segments) => {
                1u8.hash(state);
                Self::significant(segments).hash(state);
            }
            Repr::Latest => 2u8.hash(state),
        }
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationVersion {
    type Err = SextantError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MigrationVersion::parse(s)
    }
}

impl Serialize for MigrationVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MigrationVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        MigrationVersion::parse(&raw).map_err(serde::de::Error::custom)
    }
}
