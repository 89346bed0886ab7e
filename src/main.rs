use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use dotkeep::cfg::{self, ConfigStore, Settings};
use dotkeep::diff::{self, SyncStatus};
use dotkeep::fileops::{self, FileFilter};
use dotkeep::sync::DotfileSync;
use dotkeep::ui;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Dotkeep - import dotfiles into a managed directory and diff them against home
#[derive(Parser)]
#[command(name = "dotkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// List importable dotfiles instead of opening the interactive menu
    #[arg(short = 'i', long = "list")]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Path to settings file (defaults to ~/.config/dotfile_manager/config.yaml)
    #[arg(long, env = "DOTKEEP_CONFIG")]
    config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    ui::init();

    if let Err(e) = run(cli) {
        ui::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    tracing_subscriber::registry().with(layer).with(filter).init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => cfg::default_config_path()?,
    };

    let mut store = ConfigStore::new(config_path);
    let settings = store.load();

    let sync = DotfileSync::new(&settings)?;
    if sync.ensure_managed_dir()? {
        ui::success(&format!(
            "Created dotfiles directory: {}",
            sync.managed_root().display()
        ));
    }

    for issue in store.validate() {
        ui::warn(&issue);
    }

    if cli.list {
        cmd_list(&sync)
    } else {
        cmd_interactive(&sync, &settings)
    }
}

fn cmd_list(sync: &DotfileSync) -> Result<()> {
    let candidates = sync.scan_home();

    ui::section("Available dotfiles for import:");
    if candidates.is_empty() {
        ui::info("No dotfiles found in home directory");
    }
    for (i, path) in candidates.iter().enumerate() {
        let size = if path.is_dir() {
            fileops::directory_size(path)
        } else {
            path.metadata().map(|m| m.len()).unwrap_or(0)
        };
        println!(
            "{:2}. {} {}",
            i + 1,
            relative_to(path, sync.home_root()).display(),
            format!("({})", ui::format_size(size)).dimmed()
        );
    }

    println!();
    ui::hint("Run without -i for interactive import and diff");
    Ok(())
}

fn cmd_interactive(sync: &DotfileSync, settings: &Settings) -> Result<()> {
    if !ui::is_interactive() {
        bail!("Interactive mode needs a terminal; use -i to list dotfiles instead");
    }

    let menu = ["Import dotfiles", "Diff managed dotfiles", "Quit"];
    loop {
        ui::section("Dotfile Manager");
        match ui::prompt_select("Choose a mode", &menu, 0)? {
            0 => cmd_import(sync, settings)?,
            1 => cmd_diff(sync)?,
            _ => return Ok(()),
        }
    }
}

fn cmd_import(sync: &DotfileSync, settings: &Settings) -> Result<()> {
    let filter = FileFilter::with_patterns(&settings.ignore_patterns);
    let candidates: Vec<PathBuf> = sync
        .scan_home()
        .into_iter()
        .filter(|path| !filter.should_ignore(path))
        .collect();

    if candidates.is_empty() {
        ui::info("No dotfiles found in home directory");
        return Ok(());
    }

    let items: Vec<String> = candidates
        .iter()
        .map(|path| relative_to(path, sync.home_root()).display().to_string())
        .collect();
    let selected: Vec<PathBuf> = ui::prompt_multi_select("Select dotfiles to import", &items)?
        .into_iter()
        .map(|i| candidates[i].clone())
        .collect();

    if selected.is_empty() {
        ui::info("No files selected for import");
        return Ok(());
    }

    if settings.dry_run {
        ui::info("Dry run - nothing will be copied:");
        for path in &selected {
            println!("  {}", relative_to(path, sync.home_root()).display());
        }
        return Ok(());
    }

    if !ui::prompt_confirm(&format!("Import {} files?", selected.len()), true)? {
        return Ok(());
    }

    let imported = sync.import_many(&selected, true);
    if imported == selected.len() {
        ui::success(&format!("Imported {} files", imported));
    } else {
        ui::warn(&format!(
            "Imported {} of {} files (see log for failures)",
            imported,
            selected.len()
        ));
    }
    Ok(())
}

fn cmd_diff(sync: &DotfileSync) -> Result<()> {
    let report = sync.status_report();
    if report.is_empty() {
        ui::info("No managed dotfiles yet - import some first");
        return Ok(());
    }

    ui::section("Managed dotfiles");
    diff::print_status_report(&report);

    let changed: Vec<_> = report
        .iter()
        .filter(|e| e.status != SyncStatus::InSync)
        .collect();
    if changed.is_empty() {
        ui::success("Everything is in sync");
        return Ok(());
    }

    let mut items: Vec<String> = changed
        .iter()
        .map(|e| format!("{} {}", e.status.symbol(), e.rel_path.display()))
        .collect();
    items.push("Back".to_string());

    loop {
        let choice = ui::prompt_select("Select a file to view its diff", &items, 0)?;
        let Some(entry) = changed.get(choice) else {
            return Ok(());
        };

        ui::section(&entry.rel_path.display().to_string());
        match sync.diff(&entry.managed_path).into_text() {
            Some(text) => diff::print_diff(&text),
            None => ui::success("Files are identical"),
        }
    }
}

fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}
