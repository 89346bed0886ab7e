use anyhow::{bail, Context, Result};
use colored::*;
use similar::TextDiff;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::sync::{resolve, DotfileSync};
use crate::ui;

const BINARY_SNIFF_LEN: usize = 8192;

/// Outcome of comparing a managed copy with its home counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    Identical,
    Changed(String),
    MissingInHome(PathBuf),
    Failed(String),
}

impl DiffOutcome {
    /// Text to show for this outcome; `None` when the files are identical.
    pub fn into_text(self) -> Option<String> {
        match self {
            DiffOutcome::Identical => None,
            DiffOutcome::Changed(text) => Some(text),
            DiffOutcome::MissingInHome(path) => Some(format!(
                "File {} does not exist in home directory",
                path.display()
            )),
            DiffOutcome::Failed(message) => Some(format!("Error generating diff: {}", message)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SyncStatus {
    InSync,
    Different,
    MissingInHome,
}

impl SyncStatus {
    pub fn symbol(&self) -> ColoredString {
        match self {
            SyncStatus::InSync => "=".dimmed(),
            SyncStatus::Different => "M".yellow(),
            SyncStatus::MissingInHome => "D".red(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            SyncStatus::InSync => "In sync",
            SyncStatus::Different => "Different",
            SyncStatus::MissingInHome => "Missing in home",
        }
    }
}

impl From<&DiffOutcome> for SyncStatus {
    fn from(outcome: &DiffOutcome) -> Self {
        match outcome {
            DiffOutcome::Identical => SyncStatus::InSync,
            DiffOutcome::MissingInHome(_) => SyncStatus::MissingInHome,
            DiffOutcome::Changed(_) | DiffOutcome::Failed(_) => SyncStatus::Different,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub rel_path: PathBuf,
    pub managed_path: PathBuf,
    pub home_path: PathBuf,
    pub status: SyncStatus,
}

impl DotfileSync {
    /// Unified diff from the managed copy to the live file in home.
    pub fn diff(&self, managed_path: &Path) -> DiffOutcome {
        let managed_path = resolve(managed_path);
        let Some(home_path) = self.home_path_for(&managed_path) else {
            return DiffOutcome::Failed(format!(
                "{} is not inside {}",
                managed_path.display(),
                self.managed_root().display()
            ));
        };

        if !home_path.exists() {
            return DiffOutcome::MissingInHome(home_path);
        }

        unified_diff(&managed_path, &home_path)
    }

    pub fn status(&self, managed_path: &Path) -> SyncStatus {
        SyncStatus::from(&self.diff(managed_path))
    }

    /// Status of every managed file, in path order.
    pub fn status_report(&self) -> Vec<StatusEntry> {
        self.scan_managed()
            .into_iter()
            .filter_map(|managed_path| {
                let rel_path = managed_path.strip_prefix(self.managed_root()).ok()?.to_path_buf();
                let home_path = self.home_root().join(&rel_path);
                let status = self.status(&managed_path);
                Some(StatusEntry {
                    rel_path,
                    managed_path,
                    home_path,
                    status,
                })
            })
            .collect()
    }
}

/// Line-based unified diff of two text files, headed by both paths.
pub fn unified_diff(old_path: &Path, new_path: &Path) -> DiffOutcome {
    let texts = read_text(old_path).and_then(|old| Ok((old, read_text(new_path)?)));
    let (old, new) = match texts {
        Ok(texts) => texts,
        Err(e) => return DiffOutcome::Failed(format!("{:#}", e)),
    };

    if old == new {
        return DiffOutcome::Identical;
    }

    let old_header = old_path.display().to_string();
    let new_header = new_path.display().to_string();
    let diff = TextDiff::from_lines(&old, &new);
    let text = diff
        .unified_diff()
        .context_radius(3)
        .header(&old_header, &new_header)
        .to_string();

    debug!("{} and {} differ", old_path.display(), new_path.display());
    DiffOutcome::Changed(text.trim_end_matches('\n').to_string())
}

fn read_text(path: &Path) -> Result<String> {
    if is_binary(path)? {
        bail!("{} is a binary file", path.display());
    }
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", path.display()))
}

/// Check if a file is binary
fn is_binary(path: &Path) -> Result<bool> {
    let mut file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut buffer = [0u8; BINARY_SNIFF_LEN];
    let n = file
        .read(&mut buffer)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    // Check for null bytes (simple binary detection)
    Ok(buffer[..n].contains(&0))
}

/// Print the per-file status table and a summary of the counts.
pub fn print_status_report(entries: &[StatusEntry]) {
    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.status.symbol().to_string(),
                e.rel_path.display().to_string(),
                e.status.description().to_string(),
            ]
        })
        .collect();
    ui::print_table(&["", "File", "Status"], rows);

    let count = |status: SyncStatus| entries.iter().filter(|e| e.status == status).count();

    ui::section("Summary");
    println!("  {} in sync", count(SyncStatus::InSync).to_string().dimmed());
    println!("  {} different", count(SyncStatus::Different).to_string().yellow());
    println!(
        "  {} missing in home",
        count(SyncStatus::MissingInHome).to_string().red()
    );
}

/// Print diff text with added and removed lines colored.
pub fn print_diff(text: &str) {
    for line in text.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("    {}", line.bold());
        } else if line.starts_with("@@") {
            println!("    {}", line.cyan());
        } else if line.starts_with('+') {
            println!("    {}", line.green());
        } else if line.starts_with('-') {
            println!("    {}", line.red());
        } else {
            println!("    {}", line);
        }
    }
}
