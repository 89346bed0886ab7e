//! Heuristics for deciding which paths look like dotfiles and which to skip.

use glob::Pattern;
use std::path::{Component, Path};
use tracing::warn;

/// Files above this size are never worth tracking.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "*.pyc", "*.pyo", "*.pyd", "__pycache__", ".DS_Store", "Thumbs.db", ".git", ".svn", "*.log",
    "*.tmp", "*.temp", "*.swp", "*.swo",
];

const DOTFILE_SUFFIXES: &[&str] = &[
    ".conf",
    ".config",
    ".rc",
    ".profile",
    ".bashrc",
    ".zshrc",
    ".vimrc",
    ".tmux.conf",
    ".gitconfig",
];

const CONFIG_DIRS: &[&str] = &[".config", ".local", ".cache", ".ssh"];

#[derive(Debug, Clone)]
pub struct FileFilter {
    ignore: Vec<Pattern>,
    max_size: u64,
}

impl Default for FileFilter {
    fn default() -> Self {
        let ignore = DEFAULT_IGNORE_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        FileFilter {
            ignore,
            max_size: MAX_FILE_SIZE,
        }
    }
}

impl FileFilter {
    /// Build a filter from user-supplied glob patterns. Invalid patterns are
    /// skipped with a warning.
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> Self {
        let ignore = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p.as_ref()) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("skipping invalid ignore pattern {:?}: {}", p.as_ref(), e);
                    None
                }
            })
            .collect();
        FileFilter {
            ignore,
            max_size: MAX_FILE_SIZE,
        }
    }

    /// Hidden names, config-like suffixes, or anything under a well-known
    /// config directory.
    pub fn is_dotfile(&self, path: &Path) -> bool {
        let name = file_name(path);

        if name.starts_with('.') && name != "." && name != ".." {
            return true;
        }

        if DOTFILE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            return true;
        }

        // Only directory components count, not the final name.
        match path.parent() {
            Some(parent) => parent.components().any(|c| match c {
                Component::Normal(part) => part
                    .to_str()
                    .map_or(false, |part| CONFIG_DIRS.contains(&part)),
                _ => false,
            }),
            None => false,
        }
    }

    pub fn should_ignore(&self, path: &Path) -> bool {
        let name = file_name(path);

        if self.ignore.iter().any(|pattern| pattern.matches(&name)) {
            return true;
        }

        match path.metadata() {
            Ok(metadata) => metadata.is_file() && metadata.len() > self.max_size,
            Err(_) => false,
        }
    }
}

pub fn is_dotfile(path: &Path) -> bool {
    FileFilter::default().is_dotfile(path)
}

pub fn should_ignore(path: &Path) -> bool {
    FileFilter::default().should_ignore(path)
}

fn file_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}
