//! Terminal front-end for installation runs.

use anyhow::{Context, Result};
use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use dialoguer::MultiSelect;
use std::io::{self, BufRead, Write};

use super::prelude::*;
use super::InstallerUi;
use crate::catalog::{AppDescriptor, InstallMechanism};
use crate::orchestrator::BatchSummary;
use crate::outcome::InstallOutcome;

const PAGE_SIZE: usize = 15;
const NAME_WIDTH: usize = 35;

#[derive(Debug, Default)]
pub struct ConsoleUi;

impl ConsoleUi {
    pub fn new() -> Self {
        Self
    }

    fn is_json(&self) -> bool {
        matches!(get_output_format(), OutputFormat::Json)
    }

    pub fn show_title(&self) {
        if self.is_json() {
            return;
        }
        println!("{}", "Auto Installer".cyan().bold());
        separator(false);
    }

    /// Print the catalog (`--list`).
    pub fn print_catalog(&self, apps: &[AppDescriptor]) {
        if self.is_json() {
            for app in apps {
                emit(
                    Level::Info,
                    "catalog.entry",
                    &app.name,
                    serde_json::to_value(app).ok(),
                );
            }
            return;
        }

        let mut table = styled_table();
        table.set_header(vec!["Application", "Type", "Mode", "Source"]);
        for app in apps {
            table.add_row(vec![
                app.name.clone(),
                app.mechanism.tag().to_string(),
                app.mode.tag().to_string(),
                app.source.clone(),
            ]);
        }
        println!("{table}");
        println!(
            "{}",
            "Type: W = package manager, D = direct download   Mode: S = silent, I = interactive"
                .dimmed()
        );
    }

    /// Wait for Enter so a double-clicked console window stays open.
    pub fn pause(&self) {
        if self.is_json() {
            return;
        }
        print!("{}", "Press Enter to exit...".dimmed());
        let _ = io::stdout().flush();
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
    }
}

fn styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One selection-list line: padded name plus mechanism and mode tags.
pub fn format_choice(app: &AppDescriptor) -> String {
    format!(
        "{:<width$} {} {}",
        app.name,
        app.mechanism.tag(),
        app.mode.tag(),
        width = NAME_WIDTH
    )
}

impl InstallerUi for ConsoleUi {
    fn prompt_selection(&self, catalog: &[AppDescriptor]) -> Result<Vec<AppDescriptor>> {
        let choices: Vec<String> = catalog.iter().map(format_choice).collect();

        let picked = MultiSelect::new()
            .with_prompt(">> Select the applications to install (space to toggle, enter to confirm)")
            .items(&choices)
            .max_length(PAGE_SIZE)
            .interact_opt()
            .context("Failed to show the application menu")?
            .unwrap_or_default();

        let selected: Vec<AppDescriptor> = picked
            .into_iter()
            .filter_map(|index| catalog.get(index).cloned())
            .collect();

        if !selected.is_empty() {
            emit(
                Level::Success,
                "selection.confirmed",
                &format!("{} application(s) selected", selected.len()),
                None,
            );
        }
        Ok(selected)
    }

    fn report_empty_selection(&self) {
        emit(
            Level::Error,
            "selection.empty",
            "X No application selected",
            None,
        );
    }

    fn report_batch_start(&self, selected: &[AppDescriptor]) {
        emit(
            Level::Info,
            "install.batch.start",
            &format!("{}", ">> INSTALLATION STARTING".cyan().bold()),
            Some(serde_json::json!({ "count": selected.len() })),
        );
        if self.is_json() {
            return;
        }

        let mut table = styled_table();
        table.set_header(vec!["#", "Application", "Type", "Mode", "Status"]);
        for (i, app) in selected.iter().enumerate() {
            let kind = match app.mechanism {
                InstallMechanism::PackageManager => "W",
                InstallMechanism::DirectDownload => "D",
            };
            table.add_row(vec![
                (i + 1).to_string(),
                app.name.clone(),
                kind.to_string(),
                app.mode.tag().to_string(),
                "...".to_string(),
            ]);
        }
        println!("{table}");
    }

    fn report_item_start(&self, index: usize, total: usize, app: &AppDescriptor) {
        emit(
            Level::Info,
            "install.item.start",
            &format!("[{}/{}] Installing {}...", index + 1, total, app.name.cyan()),
            Some(serde_json::json!({ "app": app.name, "index": index, "total": total })),
        );
    }

    fn report_outcome(&self, app: &AppDescriptor, outcome: &InstallOutcome) {
        let level = if outcome.is_failure() {
            Level::Error
        } else {
            Level::Info
        };
        emit(
            level,
            "install.item.outcome",
            &format!(
                "  {} {} - {}",
                outcome.kind.color_status(),
                app.name.dimmed(),
                outcome.message()
            ),
            Some(serde_json::json!({ "app": app.name, "outcome": outcome })),
        );
    }

    fn report_exception(&self, app: &AppDescriptor, message: &str) {
        emit(
            Level::Error,
            "install.item.exception",
            &format!("  {} {} - {}", "FAIL".red(), app.name.dimmed(), message.red()),
            Some(serde_json::json!({ "app": app.name, "error": message })),
        );
    }

    fn report_batch_complete(&self, summary: &BatchSummary) {
        separator(true);
        emit(
            Level::Success,
            "install.batch.complete",
            &format!(
                "ALL INSTALLATIONS FINISHED: {} installed, {} already present, {} failed",
                summary.succeeded, summary.already_installed, summary.failed
            ),
            serde_json::to_value(summary).ok(),
        );
    }
}
