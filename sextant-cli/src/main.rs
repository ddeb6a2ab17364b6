mod output;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use sextant_core::config::{CliOverrides, SextantConfig};
use sextant_core::error::SextantError;
use sextant_core::Sextant;

#[derive(Parser)]
#[command(
    name = "sextant",
    about = "Reconcile resolved migrations against schema history",
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_HASH"), " ", env!("BUILD_TIME"), ")"
    ),
    propagate_version = true
)]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Resolved migrations snapshot (overrides config)
    #[arg(long, value_name = "PATH")]
    resolved: Option<PathBuf>,

    /// Schema history snapshot (overrides config)
    #[arg(long, value_name = "PATH")]
    history: Option<PathBuf>,

    /// Target version: a version, "latest" or "current"
    #[arg(long, value_name = "VERSION")]
    target: Option<String>,

    /// Baseline version used when history has no baseline row
    #[arg(long, value_name = "VER")]
    baseline_version: Option<String>,

    /// Allow out-of-order migrations
    #[arg(long, overrides_with = "no_out_of_order")]
    out_of_order: bool,

    /// Disallow out-of-order migrations (overrides --out-of-order)
    #[arg(long = "no-out-of-order", hide = true)]
    no_out_of_order: bool,

    /// Tolerate pending, missing and future migrations during validation
    #[arg(long)]
    pending_or_future: bool,

    /// Validate before planning a migrate (default: true)
    #[arg(long, overrides_with = "no_validate_on_migrate")]
    validate_on_migrate: Option<bool>,

    /// Disable validate-on-migrate
    #[arg(long = "no-validate-on-migrate", hide = true)]
    no_validate_on_migrate: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose/debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show migration status
    Info,

    /// Validate applied migrations against resolved migrations
    Validate,

    /// Show which migrations a migrate would apply
    Plan,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging (suppress when JSON output is requested)
    let filter = if cli.json {
        "error"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = run(cli) {
        print_error(&e);
        process::exit(exit_code(&e));
    }
}

/// Map error types to differentiated exit codes.
fn exit_code(error: &SextantError) -> i32 {
    match error {
        SextantError::ConfigError(_) | SextantError::VersionParseError { .. } => 2,
        SextantError::ValidationFailed(_) => 3,
        SextantError::SnapshotError { .. } | SextantError::IoError(_) => 4,
        SextantError::InterventionRequired { .. } => 5,
        SextantError::DuplicateVersion { .. } | SextantError::MissingChecksum { .. } => 6,
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<(), SextantError> {
    let json_output = cli.json;

    // Build CLI overrides with negation flag support
    let out_of_order = if cli.out_of_order {
        Some(true)
    } else if cli.no_out_of_order {
        Some(false)
    } else {
        None
    };

    let validate_on_migrate = if cli.no_validate_on_migrate {
        Some(false)
    } else {
        cli.validate_on_migrate
    };

    let overrides = CliOverrides {
        resolved: cli.resolved,
        history: cli.history,
        out_of_order,
        pending_or_future: cli.pending_or_future.then_some(true),
        target: cli.target,
        baseline_version: cli.baseline_version,
        validate_on_migrate,
    };

    let config = SextantConfig::load(cli.config.as_deref(), &overrides)?;
    let sextant = Sextant::new(config);

    match cli.command {
        Commands::Info => {
            let report = sextant.info()?;
            if json_output {
                output::print_json(&report);
            } else {
                output::print_info_table(&report);
            }
        }
        Commands::Validate => {
            let report = sextant.validate()?;
            if json_output {
                output::print_json(&report);
            } else {
                output::print_validate_result(&report);
            }
        }
        Commands::Plan => {
            let plan = sextant.plan()?;
            if json_output {
                output::print_json(&plan);
            } else {
                output::print_plan(&plan);
            }
        }
    }

    Ok(())
}

fn print_error(error: &SextantError) {
    eprintln!("{} {}", "ERROR:".red().bold(), error);

    // Provide actionable guidance
    match error {
        SextantError::ConfigError(_) => {
            eprintln!(
                "{}",
                "Hint: Check your sextant.toml or the SEXTANT_* environment variables.".dimmed()
            );
        }
        SextantError::SnapshotError { .. } => {
            eprintln!(
                "{}",
                "Hint: Re-export the snapshot; it must be a JSON array of rows.".dimmed()
            );
        }
        SextantError::DuplicateVersion { .. } => {
            eprintln!(
                "{}",
                "Hint: Give one of the migrations a new version; versions like 1 and 1.0 are the same."
                    .dimmed()
            );
        }
        SextantError::MissingChecksum { .. } => {
            eprintln!(
                "{}",
                "Hint: Re-export the resolved snapshot with checksums for SQL and CODE migrations."
                    .dimmed()
            );
        }
        SextantError::InterventionRequired { .. } => {
            eprintln!(
                "{}",
                "Hint: Remove or fix the failed history rows before migrating again.".dimmed()
            );
        }
        SextantError::ValidationFailed(message) if message.contains("not applied to database") => {
            eprintln!(
                "{}",
                "Hint: Use --pending-or-future to tolerate pending work, or --out-of-order for skipped versions."
                    .dimmed()
            );
        }
        _ => {}
    }
}
