mod catalog;
mod config;
mod error;
mod installer;
mod orchestrator;
mod outcome;
mod ui;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::catalog::Catalog;
use crate::installer::InstallerRegistry;
use crate::orchestrator::{Orchestrator, Selection};
use crate::ui::OutputFormat;
use crate::ui::console::ConsoleUi;

/// Pick desktop applications from a fixed catalog and install them unattended
#[derive(Parser, Debug)]
#[command(name = "autoinstall", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for progress and results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Settings file (defaults to <config dir>/autoinstall/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the catalog and exit
    #[arg(long)]
    list: bool,

    /// Install every catalog entry without asking
    #[arg(long, conflicts_with = "select")]
    all: bool,

    /// Install the named application without asking (repeatable)
    #[arg(short, long, value_name = "NAME")]
    select: Vec<String>,

    /// Do not wait for Enter after an interactive run
    #[arg(long)]
    no_pause: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    ui::set_debug_mode(cli.debug);
    ui::init(cli.output, !cli.no_color);
    enable_ansi_colors();

    let config = config::load(cli.config.as_deref())?;
    let catalog = Catalog::with_extra(&config.apps)?;
    let console = ConsoleUi::new();

    if cli.list {
        console.print_catalog(catalog.apps());
        return Ok(());
    }

    let selection = if cli.all {
        Selection::Preset(catalog.apps().to_vec())
    } else if !cli.select.is_empty() {
        Selection::Preset(catalog.select_by_names(&cli.select)?)
    } else {
        Selection::Prompt
    };
    let interactive = matches!(selection, Selection::Prompt);

    let registry = InstallerRegistry::from_config(&config)?;

    console.show_title();
    let mut orchestrator = Orchestrator::new(&registry, &console);
    let report = orchestrator.run(&catalog, selection).await?;
    ui::debug(
        "install.report",
        &format!(
            "{} of {} result(s), {:?}, state {:?}",
            report.results.len(),
            report.summary.total(),
            report.summary,
            orchestrator.state()
        ),
    );

    if interactive && !cli.no_pause {
        console.pause();
    }

    Ok(())
}

#[cfg(windows)]
fn enable_ansi_colors() {
    let _ = colored::control::set_virtual_terminal(true);
}

#[cfg(not(windows))]
fn enable_ansi_colors() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_flags() {
        let cli = Cli::try_parse_from(["autoinstall", "-s", "7-Zip", "--select", "Telegram"]).unwrap();
        assert_eq!(cli.select, ["7-Zip", "Telegram"]);
        assert!(!cli.all);
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn parses_output_format() {
        let cli = Cli::try_parse_from(["autoinstall", "--output", "json", "--list"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.list);
    }

    #[test]
    fn rejects_all_with_select() {
        assert!(Cli::try_parse_from(["autoinstall", "--all", "--select", "7-Zip"]).is_err());
    }

    #[test]
    fn rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["autoinstall", "--output", "yaml"]).is_err());
    }
}
