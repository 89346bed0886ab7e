//! Stateless file helpers: hashing, metadata, backups, comparison, search and
//! symlinks.
//!
//! `hash_file`, `metadata` and `backup` report failures through
//! [`FileOpsError`]. Everything else logs the failure and returns a fallback
//! value.

pub mod error;
pub mod filter;
pub mod hash;
pub mod parse;

pub use error::FileOpsError;
pub use filter::{is_dotfile, should_ignore, FileFilter, MAX_FILE_SIZE};
pub use hash::hash_file;
pub use parse::{parse_ini_like, parse_key_value_file, IniSections};

use chrono::{DateTime, Local, Utc};
use filetime::FileTime;
use glob::Pattern;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use error::Result;
use hash::file_mode;

pub const BACKUP_DIR_NAME: &str = "backups";
const UNKNOWN_MIME: &str = "unknown";

#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub created: Option<DateTime<Utc>>,
    /// Last three octal digits of the mode, e.g. `"644"`.
    pub permissions: String,
    pub mode: u32,
    pub is_file: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
    pub hash: Option<String>,
    pub mime_type: Option<String>,
}

/// Result of [`compare`]. `same_content` is only computed when sizes match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub both_exist: bool,
    pub same_size: bool,
    pub same_permissions: bool,
    pub same_content: bool,
    pub error: Option<String>,
}

/// Collect metadata for `path` as it is on disk right now.
pub fn metadata(path: &Path) -> Result<FileInfo> {
    if !path.exists() {
        return Err(FileOpsError::not_found(path));
    }

    let meta = fs::metadata(path).map_err(|e| FileOpsError::io(path, e))?;
    let is_symlink = path.is_symlink();
    let mode = file_mode(&meta);
    let modified = meta.modified().map_err(|e| FileOpsError::io(path, e))?;

    let (hash, mime_type) = if meta.is_file() {
        let mime = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| UNKNOWN_MIME.to_string());
        (Some(hash_file(path)?), Some(mime))
    } else {
        (None, None)
    };

    Ok(FileInfo {
        path: path.to_path_buf(),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: meta.len(),
        modified: DateTime::from(modified),
        created: meta.created().ok().map(DateTime::from),
        permissions: format!("{:03o}", mode & 0o777),
        mode,
        is_file: meta.is_file(),
        is_dir: meta.is_dir(),
        is_symlink,
        hash,
        mime_type,
    })
}

/// Name used for a backup of `file_name` taken at `at`.
pub fn backup_name(file_name: &str, at: DateTime<Local>) -> String {
    format!("{}.backup.{}", file_name, at.format("%Y%m%d_%H%M%S"))
}

/// Copy `path` into `backup_dir` (default: a `backups` directory next to the
/// file) as `<name>.backup.<YYYYMMDD_HHMMSS>`, preserving metadata.
pub fn backup(path: &Path, backup_dir: Option<&Path>) -> Result<PathBuf> {
    if !path.exists() {
        return Err(FileOpsError::not_found(path));
    }

    let backup_dir = match backup_dir {
        Some(dir) => dir.to_path_buf(),
        None => path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(BACKUP_DIR_NAME),
    };
    fs::create_dir_all(&backup_dir).map_err(|e| FileOpsError::io(&backup_dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| FileOpsError::constraint(format!("no file name in {}", path.display())))?;
    let backup_path = backup_dir.join(backup_name(&file_name, Local::now()));

    copy_preserving(path, &backup_path)?;
    debug!("backed up {} to {}", path.display(), backup_path.display());

    Ok(backup_path)
}

/// Copy a backup back to `dest`, creating parent directories as needed.
pub fn restore(backup_path: &Path, dest: &Path) -> bool {
    let result = (|| -> Result<()> {
        if !backup_path.exists() {
            return Err(FileOpsError::not_found(backup_path));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| FileOpsError::io(parent, e))?;
        }
        copy_preserving(backup_path, dest)
    })();

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("failed to restore {}: {}", dest.display(), e);
            false
        }
    }
}

pub fn compare(first: &Path, second: &Path) -> Comparison {
    let mut result = Comparison {
        both_exist: first.exists() && second.exists(),
        ..Comparison::default()
    };

    if !result.both_exist {
        result.error = Some("One or both files do not exist".to_string());
        return result;
    }

    let outcome = (|| -> Result<()> {
        let meta1 = fs::metadata(first).map_err(|e| FileOpsError::io(first, e))?;
        let meta2 = fs::metadata(second).map_err(|e| FileOpsError::io(second, e))?;

        result.same_size = meta1.len() == meta2.len();
        result.same_permissions = file_mode(&meta1) == file_mode(&meta2);

        if result.same_size {
            result.same_content = hash_file(first)? == hash_file(second)?;
        }
        Ok(())
    })();

    if let Err(e) = outcome {
        result.error = Some(e.to_string());
    }

    result
}

/// Files under `root` whose name matches `pattern`, sorted. Traversal errors
/// are logged and skipped.
pub fn find_by_pattern(root: &Path, pattern: &str, recursive: bool) -> Vec<PathBuf> {
    let pattern = match Pattern::new(pattern) {
        Ok(pattern) => pattern,
        Err(e) => {
            warn!("invalid search pattern {:?}: {}", pattern, e);
            return Vec::new();
        }
    };

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut matches = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(max_depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("error while searching {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_file() && pattern.matches(&entry.file_name().to_string_lossy()) {
            matches.push(entry.into_path());
        }
    }

    matches.sort();
    matches
}

/// Total size in bytes of the regular files under `root`. Unreadable entries
/// are skipped.
pub fn directory_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Create `link` pointing at `target`. An existing `link` is replaced only
/// when `force` is set.
pub fn create_symlink(target: &Path, link: &Path, force: bool) -> bool {
    let result = (|| -> Result<()> {
        if link.exists() || link.is_symlink() {
            if !force {
                return Err(FileOpsError::constraint(format!(
                    "link already exists: {}",
                    link.display()
                )));
            }
            remove_path(link)?;
        }

        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).map_err(|e| FileOpsError::io(parent, e))?;
        }

        symlink(target, link).map_err(|e| FileOpsError::io(link, e))
    })();

    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("failed to create symlink {}: {}", link.display(), e);
            false
        }
    }
}

fn remove_path(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| FileOpsError::io(path, e))?;
    if meta.is_dir() {
        fs::remove_dir_all(path).map_err(|e| FileOpsError::io(path, e))
    } else {
        fs::remove_file(path).map_err(|e| FileOpsError::io(path, e))
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Copy a single file, keeping its permission bits and timestamps.
pub(crate) fn copy_preserving(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest).map_err(|e| FileOpsError::io(source, e))?;

    let meta = fs::metadata(source).map_err(|e| FileOpsError::io(source, e))?;
    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(dest, atime, mtime).map_err(|e| FileOpsError::io(dest, e))?;

    Ok(())
}

/// Recursively copy `source` into `dest`, merging with whatever is already
/// there. Symlinks are followed and their content copied.
pub(crate) fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            FileOpsError::io(path, e.into())
        })?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| FileOpsError::constraint(format!("{} escaped the copy root", entry.path().display())))?;
        let target = dest.join(rel);

        if target.is_symlink() {
            remove_path(&target)?;
        }
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| FileOpsError::io(&target, e))?;
        } else if entry.file_type().is_file() {
            copy_preserving(entry.path(), &target)?;
        }
    }

    Ok(())
}
