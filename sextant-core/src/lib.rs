pub mod aggregator;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod info;
pub mod migration;
pub mod snapshot;
pub mod version;

use config::SextantConfig;
use error::Result;
use history::SchemaHistory;
use migration::MigrationResolver;
use snapshot::{JsonHistorySnapshot, JsonResolvedSnapshot};

pub use aggregator::InfoAggregator;
pub use commands::info::{InfoReport, InfoRow};
pub use commands::plan::MigratePlan;
pub use commands::validate::ValidateReport;
pub use config::CliOverrides;
pub use context::{ReconciliationContext, ReconciliationPolicy, TargetVersion};
pub use history::{AppliedMigration, HistoryRow};
pub use info::{MigrationInfo, MigrationState, ValidationIssue};
pub use migration::{MigrationKind, ResolvedMigration};
pub use version::MigrationVersion;

/// Main entry point for the Sextant library.
///
/// Create a `Sextant` instance with a config and use its methods to
/// inspect migration state programmatically.
pub struct Sextant {
    pub config: SextantConfig,
    resolver: Box<dyn MigrationResolver>,
    history: Box<dyn SchemaHistory>,
}

impl Sextant {
    /// Create a new Sextant instance reading the snapshot files named in the config.
    pub fn new(config: SextantConfig) -> Self {
        let resolver = JsonResolvedSnapshot::new(&config.sources.resolved);
        let history = JsonHistorySnapshot::new(&config.sources.history);
        Self::with_sources(config, resolver, history)
    }

    /// Create a new Sextant instance with caller-provided sources.
    pub fn with_sources(
        config: SextantConfig,
        resolver: impl MigrationResolver + 'static,
        history: impl SchemaHistory + 'static,
    ) -> Self {
        Self {
            config,
            resolver: Box::new(resolver),
            history: Box::new(history),
        }
    }

    /// Run one reconciliation pass and keep the full result.
    pub fn reconcile(&self) -> Result<InfoAggregator> {
        commands::reconcile(
            self.resolver.as_ref(),
            self.history.as_ref(),
            &self.config.reconciliation_policy(),
        )
    }

    /// Show migration status information.
    pub fn info(&self) -> Result<InfoReport> {
        commands::info::execute(self.resolver.as_ref(), self.history.as_ref(), &self.config)
    }

    /// Validate applied migrations against resolved migrations.
    pub fn validate(&self) -> Result<ValidateReport> {
        commands::validate::execute(self.resolver.as_ref(), self.history.as_ref(), &self.config)
    }

    /// Compute which migrations a migrate would apply, without applying anything.
    pub fn plan(&self) -> Result<MigratePlan> {
        commands::plan::execute(self.resolver.as_ref(), self.history.as_ref(), &self.config)
    }
}
