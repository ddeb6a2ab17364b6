use colored::Colorize;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use serde::Serialize;

use sextant_core::{InfoReport, MigratePlan, MigrationState, ValidateReport};

/// Print any report as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("{} Failed to serialize output: {}", "ERROR:".red().bold(), e),
    }
}

/// Format migration info as a colored table.
pub fn print_info_table(report: &InfoReport) {
    if report.migrations.is_empty() {
        println!("{}", "No migrations found.".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Version"),
            Cell::new("Description"),
            Cell::new("Type"),
            Cell::new("State"),
            Cell::new("Installed On"),
            Cell::new("Execution Time"),
        ]);

    for info in &report.migrations {
        let installed_on = info
            .installed_on
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let exec_time = info
            .execution_time
            .map(|t| format!("{}ms", t))
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(&info.version),
            Cell::new(&info.description),
            Cell::new(&info.migration_type),
            Cell::new(format_state(info.state)),
            Cell::new(&installed_on),
            Cell::new(&exec_time),
        ]);
    }

    println!("{table}");

    match &report.current_version {
        Some(version) => println!("Current version: {}", version.bold()),
        None => println!("{}", "Current version: << Empty Schema >>".dimmed()),
    }
}

fn format_state(state: MigrationState) -> String {
    let label = state.to_string();
    match state {
        MigrationState::Pending => label.yellow().to_string(),
        MigrationState::Success => label.green().to_string(),
        MigrationState::Baseline => label.blue().to_string(),
        MigrationState::OutOfOrder | MigrationState::FutureSuccess => label.yellow().to_string(),
        MigrationState::MissingSuccess => label.red().to_string(),
        MigrationState::Failed | MigrationState::MissingFailed | MigrationState::FutureFailed => {
            label.red().bold().to_string()
        }
        MigrationState::AboveTarget => label.cyan().to_string(),
        MigrationState::BelowBaseline | MigrationState::Ignored => label.dimmed().to_string(),
    }
}

/// Print a validate report.
pub fn print_validate_result(report: &ValidateReport) {
    if report.valid {
        println!("{}", "Successfully validated all applied migrations.".green().bold());
    }

    for warning in &report.warnings {
        println!("{} {}", "WARNING:".yellow().bold(), warning);
    }

    for issue in &report.issues {
        println!("{} {}", "ERROR:".red().bold(), issue);
    }
}

/// Print the migrations a migrate would apply.
pub fn print_plan(plan: &MigratePlan) {
    for version in &plan.ignored {
        println!(
            "{} Migration {} is below the current version and will not run without --out-of-order.",
            "WARNING:".yellow().bold(),
            version
        );
    }

    if plan.pending.is_empty() {
        println!("{}", "Schema is up to date. No migration necessary.".green());
        return;
    }

    println!(
        "{}",
        format!(
            "{} migration(s) would be applied (target {}):",
            plan.pending.len(),
            plan.target
        )
        .yellow()
        .bold()
    );

    for migration in &plan.pending {
        let marker = if migration.out_of_order {
            " [out of order]".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {} - {} [{}]{}",
            "→".yellow(),
            migration.version,
            migration.description,
            migration.script,
            marker
        );
    }
}
