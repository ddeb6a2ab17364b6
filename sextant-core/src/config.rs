use std::path::PathBuf;

use serde::Deserialize;

use crate::context::{ReconciliationPolicy, TargetVersion};
use crate::error::{Result, SextantError};
use crate::version::MigrationVersion;

/// Top-level configuration for Sextant.
#[derive(Debug, Clone, Default)]
pub struct SextantConfig {
    pub sources: SourceSettings,
    pub policy: PolicySettings,
}

/// Where the resolved and history snapshots are read from.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub resolved: PathBuf,
    pub history: PathBuf,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            resolved: PathBuf::from("sextant/resolved.json"),
            history: PathBuf::from("sextant/history.json"),
        }
    }
}

/// Reconciliation behavior settings.
#[derive(Debug, Clone)]
pub struct PolicySettings {
    pub out_of_order: bool,
    pub pending_or_future: bool,
    pub target: TargetVersion,
    pub baseline_version: Option<MigrationVersion>,
    pub validate_on_migrate: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            out_of_order: false,
            pending_or_future: false,
            target: TargetVersion::Latest,
            baseline_version: None,
            validate_on_migrate: true,
        }
    }
}

// ── TOML deserialization structs ──

#[derive(Deserialize, Default)]
struct TomlConfig {
    sources: Option<TomlSourceSettings>,
    policy: Option<TomlPolicySettings>,
}

#[derive(Deserialize, Default)]
struct TomlSourceSettings {
    resolved: Option<String>,
    history: Option<String>,
}

#[derive(Deserialize, Default)]
struct TomlPolicySettings {
    out_of_order: Option<bool>,
    pending_or_future: Option<bool>,
    target: Option<String>,
    baseline_version: Option<String>,
    validate_on_migrate: Option<bool>,
}

/// CLI overrides that take highest priority.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub resolved: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub out_of_order: Option<bool>,
    pub pending_or_future: Option<bool>,
    pub target: Option<String>,
    pub baseline_version: Option<String>,
    pub validate_on_migrate: Option<bool>,
}

impl SextantConfig {
    /// Load configuration with the following priority (highest wins):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. TOML config file
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&str>, overrides: &CliOverrides) -> Result<Self> {
        let mut config = SextantConfig::default();

        // Layer 3: TOML config file
        let toml_path = config_path.unwrap_or("sextant.toml");
        if let Ok(content) = std::fs::read_to_string(toml_path) {
            let toml_config: TomlConfig = toml::from_str(&content).map_err(|e| {
                SextantError::ConfigError(format!("Failed to parse config file '{}': {}", toml_path, e))
            })?;
            config.apply_toml(toml_config)?;
            tracing::debug!(path = %toml_path, "Loaded config file");
        } else if config_path.is_some() {
            // If explicitly specified, error if not found
            return Err(SextantError::ConfigError(format!(
                "Config file '{}' not found",
                toml_path
            )));
        }

        // Layer 2: Environment variables
        config.apply_env()?;

        // Layer 1: CLI overrides
        config.apply_cli(overrides)?;

        Ok(config)
    }

    /// The reconciliation policy these settings describe.
    pub fn reconciliation_policy(&self) -> ReconciliationPolicy {
        ReconciliationPolicy {
            baseline: self.policy.baseline_version.clone(),
            target: self.policy.target.clone(),
            out_of_order: self.policy.out_of_order,
            pending_or_future: self.policy.pending_or_future,
        }
    }

    fn apply_toml(&mut self, toml: TomlConfig) -> Result<()> {
        if let Some(s) = toml.sources {
            if let Some(v) = s.resolved { self.sources.resolved = PathBuf::from(v); }
            if let Some(v) = s.history { self.sources.history = PathBuf::from(v); }
        }

        if let Some(p) = toml.policy {
            if let Some(v) = p.out_of_order { self.policy.out_of_order = v; }
            if let Some(v) = p.pending_or_future { self.policy.pending_or_future = v; }
            if let Some(v) = p.validate_on_migrate { self.policy.validate_on_migrate = v; }
            if let Some(v) = p.target {
                self.policy.target = parse_target("policy.target", &v)?;
            }
            if let Some(v) = p.baseline_version {
                self.policy.baseline_version = Some(parse_baseline("policy.baseline_version", &v)?);
            }
        }

        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("SEXTANT_RESOLVED") {
            self.sources.resolved = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SEXTANT_HISTORY") {
            self.sources.history = PathBuf::from(v);
        }
        if let Some(v) = env_flag("SEXTANT_OUT_OF_ORDER") {
            self.policy.out_of_order = v;
        }
        if let Some(v) = env_flag("SEXTANT_PENDING_OR_FUTURE") {
            self.policy.pending_or_future = v;
        }
        if let Some(v) = env_flag("SEXTANT_VALIDATE_ON_MIGRATE") {
            self.policy.validate_on_migrate = v;
        }
        if let Ok(v) = std::env::var("SEXTANT_TARGET") {
            self.policy.target = parse_target("SEXTANT_TARGET", &v)?;
        }
        if let Ok(v) = std::env::var("SEXTANT_BASELINE_VERSION") {
            self.policy.baseline_version = Some(parse_baseline("SEXTANT_BASELINE_VERSION", &v)?);
        }
        Ok(())
    }

    fn apply_cli(&mut self, overrides: &CliOverrides) -> Result<()> {
        if let Some(ref v) = overrides.resolved {
            self.sources.resolved = v.clone();
        }
        if let Some(ref v) = overrides.history {
            self.sources.history = v.clone();
        }
        if let Some(v) = overrides.out_of_order {
            self.policy.out_of_order = v;
        }
        if let Some(v) = overrides.pending_or_future {
            self.policy.pending_or_future = v;
        }
        if let Some(v) = overrides.validate_on_migrate {
            self.policy.validate_on_migrate = v;
        }
        if let Some(ref v) = overrides.target {
            self.policy.target = parse_target("--target", v)?;
        }
        if let Some(ref v) = overrides.baseline_version {
            self.policy.baseline_version = Some(parse_baseline("--baseline-version", v)?);
        }
        Ok(())
    }
}

fn parse_target(source: &str, raw: &str) -> Result<TargetVersion> {
    TargetVersion::parse(raw).map_err(|e| {
        SextantError::ConfigError(format!(
            "Invalid target '{}' in {}: {}. Use a version, 'latest' or 'current'.",
            raw, source, e
        ))
    })
}

fn parse_baseline(source: &str, raw: &str) -> Result<MigrationVersion> {
    MigrationVersion::parse(raw.trim())
        .map_err(|e| SextantError::ConfigError(format!("Invalid baseline version in {}: {}", source, e)))
}

/// Read a boolean environment variable, ignoring values that are not booleans.
fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key = %key, value = %value, "Ignoring non-boolean environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SextantConfig::default();
        assert_eq!(config.sources.resolved, PathBuf::from("sextant/resolved.json"));
        assert_eq!(config.sources.history, PathBuf::from("sextant/history.json"));
        assert!(!config.policy.out_of_order);
        assert!(!config.policy.pending_or_future);
        assert!(config.policy.validate_on_migrate);
        assert_eq!(config.policy.target, TargetVersion::Latest);
        assert_eq!(config.policy.baseline_version, None);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = SextantConfig::default();
        let overrides = CliOverrides {
            resolved: Some(PathBuf::from("out/resolved.json")),
            history: Some(PathBuf::from("out/history.json")),
            out_of_order: Some(true),
            pending_or_future: Some(true),
            target: Some("current".to_string()),
            baseline_version: Some("5".to_string()),
            validate_on_migrate: Some(false),
        };

        config.apply_cli(&overrides).unwrap();

        assert_eq!(config.sources.resolved, PathBuf::from("out/resolved.json"));
        assert_eq!(config.sources.history, PathBuf::from("out/history.json"));
        assert!(config.policy.out_of_order);
        assert!(config.policy.pending_or_future);
        assert!(!config.policy.validate_on_migrate);
        assert_eq!(config.policy.target, TargetVersion::Current);
        assert_eq!(
            config.policy.baseline_version,
            Some(MigrationVersion::parse("5").unwrap())
        );
    }

    #[test]
    fn test_cli_rejects_malformed_versions() {
        let mut config = SextantConfig::default();
        let overrides = CliOverrides {
            target: Some("v2".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.apply_cli(&overrides),
            Err(SextantError::ConfigError(_))
        ));
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
[sources]
resolved = "build/resolved.json"
history = "build/history.json"

[policy]
out_of_order = true
target = "2.1"
baseline_version = "1.5"
validate_on_migrate = false
"#;

        let toml_config: TomlConfig = toml::from_str(toml_str).unwrap();
        let mut config = SextantConfig::default();
        config.apply_toml(toml_config).unwrap();

        assert_eq!(config.sources.resolved, PathBuf::from("build/resolved.json"));
        assert_eq!(config.sources.history, PathBuf::from("build/history.json"));
        assert!(config.policy.out_of_order);
        assert!(!config.policy.pending_or_future);
        assert!(!config.policy.validate_on_migrate);
        assert_eq!(
            config.policy.target,
            TargetVersion::Version(MigrationVersion::parse("2.1").unwrap())
        );

        let policy = config.reconciliation_policy();
        assert_eq!(policy.baseline, Some(MigrationVersion::parse("1.5").unwrap()));
        assert!(policy.out_of_order);
    }

    #[test]
    fn test_toml_rejects_malformed_baseline() {
        let toml_config: TomlConfig = toml::from_str("[policy]\nbaseline_version = \"one\"\n").unwrap();
        let mut config = SextantConfig::default();
        assert!(config.apply_toml(toml_config).is_err());
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let result = SextantConfig::load(Some("/nonexistent/sextant.toml"), &CliOverrides::default());
        assert!(matches!(result, Err(SextantError::ConfigError(_))));
    }

    #[test]
    fn test_load_from_file_then_cli() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sextant.toml");
        std::fs::write(&path, "[policy]\nout_of_order = true\ntarget = \"3\"\n").unwrap();

        let overrides = CliOverrides {
            target: Some("latest".to_string()),
            ..Default::default()
        };
        let config = SextantConfig::load(path.to_str(), &overrides).unwrap();
        assert!(config.policy.out_of_order);
        assert_eq!(config.policy.target, TargetVersion::Latest);
    }
}
