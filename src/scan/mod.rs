//! Lazy discovery of dotfile candidates under home and of files in the
//! managed tree.
//!
//! The iterators here do no sorting or deduplication; callers that need a
//! stable order collect into a sorted container.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Paths, relative to home, that are worth offering even if they are nested.
pub const WELL_KNOWN_DOTFILES: &[&str] = &[
    ".bashrc",
    ".zshrc",
    ".vimrc",
    ".gitconfig",
    ".tmux.conf",
    ".profile",
    ".bash_profile",
    ".config/nvim",
    ".config/alacritty",
    ".ssh/config",
];

/// Well-known dotfiles that exist under `home`, followed by every hidden
/// top-level entry. May yield the same path twice.
pub fn home_candidates(home: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    let known = WELL_KNOWN_DOTFILES
        .iter()
        .map(move |rel| home.join(rel))
        .filter(|path| path.exists());

    let entries = match fs::read_dir(home) {
        Ok(entries) => Some(entries),
        Err(e) => {
            warn!("failed to read {}: {}", home.display(), e);
            None
        }
    };

    let hidden = entries
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_hidden_name(path) && (path.is_file() || path.is_dir()));

    known.chain(hidden)
}

/// Every regular file below `root`. Yields nothing when `root` is missing.
pub fn managed_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("skipping unreadable managed entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
}

fn is_hidden_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |name| name.starts_with('.') && name != "." && name != "..")
}
