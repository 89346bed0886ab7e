//! The managed tree mirrors home: `<managed>/<rel>` is the kept copy of
//! `<home>/<rel>`.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cfg::{expand_path, Settings};
use crate::fileops::{copy_preserving, copy_tree};
use crate::scan;
use crate::ui;

#[derive(Debug, Clone)]
pub struct DotfileSync {
    managed_root: PathBuf,
    home_root: PathBuf,
}

impl DotfileSync {
    /// Managed root from the settings, home root from the environment.
    pub fn new(settings: &Settings) -> Result<Self> {
        let home = dirs::home_dir().context("Failed to find home directory")?;
        Ok(DotfileSync::with_roots(&settings.dotfiles_dir, home))
    }

    pub fn with_roots(managed_root: impl AsRef<Path>, home_root: impl AsRef<Path>) -> Self {
        DotfileSync {
            managed_root: resolve(managed_root.as_ref()),
            home_root: resolve(home_root.as_ref()),
        }
    }

    pub fn managed_root(&self) -> &Path {
        &self.managed_root
    }

    pub fn home_root(&self) -> &Path {
        &self.home_root
    }

    /// Create the managed root if it is missing. Returns whether it was created.
    pub fn ensure_managed_dir(&self) -> Result<bool> {
        if self.managed_root.exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.managed_root).with_context(|| {
            format!(
                "Failed to create dotfiles directory {}",
                self.managed_root.display()
            )
        })?;
        info!("created dotfiles directory {}", self.managed_root.display());
        Ok(true)
    }

    /// Dotfile candidates under home, deduplicated and sorted.
    pub fn scan_home(&self) -> BTreeSet<PathBuf> {
        scan::home_candidates(&self.home_root).collect()
    }

    /// Every regular file in the managed tree, sorted.
    pub fn scan_managed(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = scan::managed_files(&self.managed_root).collect();
        files.sort();
        files
    }

    /// Home counterpart of a path inside the managed tree.
    pub fn home_path_for(&self, managed_path: &Path) -> Option<PathBuf> {
        managed_path
            .strip_prefix(&self.managed_root)
            .ok()
            .map(|rel| self.home_root.join(rel))
    }

    /// Managed counterpart of a path inside home.
    pub fn managed_path_for(&self, home_path: &Path) -> Option<PathBuf> {
        home_path
            .strip_prefix(&self.home_root)
            .ok()
            .map(|rel| self.managed_root.join(rel))
    }

    /// Copy `source` from home into the managed tree, recursively for
    /// directories. Re-importing overwrites the managed copy.
    pub fn import_one(&self, source: &Path) -> bool {
        match self.try_import(source) {
            Ok(rel) => {
                info!("Imported: {}", rel.display());
                true
            }
            Err(e) => {
                warn!("Error importing {}: {:#}", source.display(), e);
                false
            }
        }
    }

    fn try_import(&self, source: &Path) -> Result<PathBuf> {
        let source = resolve(source);
        let rel = source.strip_prefix(&self.home_root).with_context(|| {
            format!(
                "{} is not inside {}",
                source.display(),
                self.home_root.display()
            )
        })?;

        if rel.as_os_str().is_empty() {
            bail!("refusing to import the home directory itself");
        }
        if source.starts_with(&self.managed_root) || self.managed_root.starts_with(&source) {
            bail!(
                "{} overlaps the dotfiles directory {}",
                source.display(),
                self.managed_root.display()
            );
        }

        // Symlinked dotfiles may already point into the managed tree.
        let real_source = fs::canonicalize(&source)
            .with_context(|| format!("Failed to resolve {}", source.display()))?;
        let real_managed =
            fs::canonicalize(&self.managed_root).unwrap_or_else(|_| self.managed_root.clone());
        if real_source.starts_with(&real_managed) || real_managed.starts_with(&real_source) {
            bail!(
                "{} resolves to {}, inside the dotfiles directory",
                source.display(),
                real_source.display()
            );
        }

        let dest = self.managed_root.join(rel);
        if let Ok(real_dest) = fs::canonicalize(&dest) {
            if real_dest.starts_with(&real_source) || real_source.starts_with(&real_dest) {
                bail!(
                    "{} and {} are the same file",
                    source.display(),
                    dest.display()
                );
            }
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let metadata = fs::metadata(&source)
            .with_context(|| format!("Failed to read metadata for {}", source.display()))?;
        if metadata.is_dir() {
            copy_tree(&source, &dest)?;
        } else {
            if dest.is_symlink() {
                fs::remove_file(&dest)
                    .with_context(|| format!("Failed to replace link {}", dest.display()))?;
            }
            copy_preserving(&source, &dest)?;
        }

        Ok(rel.to_path_buf())
    }

    /// Import each path, returning how many succeeded.
    pub fn import_many(&self, paths: &[PathBuf], progress: bool) -> usize {
        let pb = if progress {
            Some(ui::progress_bar(paths.len() as u64, "Importing dotfiles"))
        } else {
            None
        };

        let mut imported = 0;
        for path in paths {
            if self.import_one(path) {
                imported += 1;
            }
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = pb {
            pb.finish_with_message("Import complete");
        }

        imported
    }
}

/// Tilde-expanded absolute form of `path`.
pub(crate) fn resolve(path: &Path) -> PathBuf {
    let expanded = expand_path(&path.to_string_lossy());
    std::path::absolute(&expanded).unwrap_or(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DotfileSync) {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().join("home");
        let managed = temp_dir.path().join("managed");
        fs::create_dir_all(&home).unwrap();
        let sync = DotfileSync::with_roots(&managed, &home);
        (temp_dir, sync)
    }

    #[test]
    fn test_import_file() {
        let (_temp, sync) = setup();
        let source = sync.home_root().join(".bashrc");
        fs::write(&source, "alias ll='ls -l'\n").unwrap();

        assert!(sync.import_one(&source));
        let dest = sync.managed_root().join(".bashrc");
        assert_eq!(fs::read(&dest).unwrap(), fs::read(&source).unwrap());
    }

    #[test]
    fn test_import_overwrites_on_retry() {
        let (_temp, sync) = setup();
        let source = sync.home_root().join(".vimrc");
        fs::write(&source, "set nu\n").unwrap();
        assert!(sync.import_one(&source));

        fs::write(&source, "set rnu\n").unwrap();
        assert!(sync.import_one(&source));
        assert_eq!(
            fs::read_to_string(sync.managed_root().join(".vimrc")).unwrap(),
            "set rnu\n"
        );
    }

    #[test]
    fn test_import_directory_creates_parents() {
        let (_temp, sync) = setup();
        let nvim = sync.home_root().join(".config/nvim");
        fs::create_dir_all(nvim.join("lua")).unwrap();
        fs::write(nvim.join("init.lua"), "require('plugins')\n").unwrap();
        fs::write(nvim.join("lua/plugins.lua"), "return {}\n").unwrap();

        assert!(sync.import_one(&nvim));
        let managed = sync.managed_root().join(".config/nvim");
        assert_eq!(
            fs::read_to_string(managed.join("init.lua")).unwrap(),
            "require('plugins')\n"
        );
        assert!(managed.join("lua/plugins.lua").is_file());
        assert_eq!(sync.scan_managed().len(), 2);
    }

    #[test]
    fn test_import_outside_home_fails() {
        let (temp, sync) = setup();
        let outside = temp.path().join("elsewhere.conf");
        fs::write(&outside, "x").unwrap();

        assert!(!sync.import_one(&outside));
        assert!(sync.scan_managed().is_empty());
    }

    #[test]
    fn test_import_missing_source_fails() {
        let (_temp, sync) = setup();
        assert!(!sync.import_one(&sync.home_root().join(".nothing")));
    }

    #[test]
    fn test_import_refuses_managed_overlap() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path();
        let sync = DotfileSync::with_roots(home.join(".dotfiles"), home);
        fs::create_dir_all(home.join(".dotfiles")).unwrap();

        assert!(!sync.import_one(&home.join(".dotfiles")));
        assert!(!sync.import_one(home));
    }

    #[cfg(unix)]
    #[test]
    fn test_import_symlink_into_managed_keeps_content() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path();
        let managed = home.join(".dotfiles");
        fs::create_dir_all(&managed).unwrap();
        fs::write(managed.join(".bashrc"), "alias ll='ls -l'\n").unwrap();
        std::os::unix::fs::symlink(managed.join(".bashrc"), home.join(".bashrc")).unwrap();

        let sync = DotfileSync::with_roots(&managed, home);
        assert!(!sync.import_one(&home.join(".bashrc")));
        assert_eq!(
            fs::read_to_string(managed.join(".bashrc")).unwrap(),
            "alias ll='ls -l'\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_import_symlinked_directory_into_managed_keeps_content() {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path();
        let managed = home.join(".dotfiles");
        fs::create_dir_all(managed.join(".config/nvim")).unwrap();
        fs::write(managed.join(".config/nvim/init.lua"), "vim.o.number = true\n").unwrap();
        fs::create_dir_all(home.join(".config")).unwrap();
        std::os::unix::fs::symlink(managed.join(".config/nvim"), home.join(".config/nvim"))
            .unwrap();

        let sync = DotfileSync::with_roots(&managed, home);
        assert!(!sync.import_one(&home.join(".config/nvim")));
        assert_eq!(
            fs::read_to_string(managed.join(".config/nvim/init.lua")).unwrap(),
            "vim.o.number = true\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_import_refuses_managed_link_back_to_source() {
        let (_temp, sync) = setup();
        let source = sync.home_root().join(".gitconfig");
        fs::write(&source, "[user]\n\tname = me\n").unwrap();
        fs::create_dir_all(sync.managed_root()).unwrap();
        std::os::unix::fs::symlink(&source, sync.managed_root().join(".gitconfig")).unwrap();

        assert!(!sync.import_one(&source));
        assert_eq!(fs::read_to_string(&source).unwrap(), "[user]\n\tname = me\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_import_directory_copies_symlinked_content() {
        let (temp, sync) = setup();
        let outside = temp.path().join("shared.lua");
        fs::write(&outside, "return 42\n").unwrap();
        let nvim = sync.home_root().join(".config/nvim");
        fs::create_dir_all(&nvim).unwrap();
        std::os::unix::fs::symlink(&outside, nvim.join("init.lua")).unwrap();

        assert!(sync.import_one(&nvim));
        let copied = sync.managed_root().join(".config/nvim/init.lua");
        assert!(!copied.is_symlink());
        assert_eq!(fs::read_to_string(&copied).unwrap(), "return 42\n");
        assert_eq!(sync.scan_managed(), vec![copied]);
    }

    #[test]
    fn test_import_many_counts_successes() {
        let (_temp, sync) = setup();
        let good = sync.home_root().join(".zshrc");
        fs::write(&good, "").unwrap();
        let bad = sync.home_root().join(".missing");

        assert_eq!(sync.import_many(&[good, bad], false), 1);
    }

    #[test]
    fn test_scan_home_sorted_and_deduped() {
        let (_temp, sync) = setup();
        fs::write(sync.home_root().join(".zshrc"), "").unwrap();
        fs::write(sync.home_root().join(".bashrc"), "").unwrap();

        let found: Vec<_> = sync.scan_home().into_iter().collect();
        assert_eq!(
            found,
            vec![sync.home_root().join(".bashrc"), sync.home_root().join(".zshrc")]
        );
    }

    #[test]
    fn test_scan_managed_missing_root() {
        let (_temp, sync) = setup();
        assert!(sync.scan_managed().is_empty());
    }

    #[test]
    fn test_ensure_managed_dir() {
        let (_temp, sync) = setup();
        assert!(sync.ensure_managed_dir().unwrap());
        assert!(!sync.ensure_managed_dir().unwrap());
        assert!(sync.managed_root().is_dir());
    }

    #[test]
    fn test_path_mapping() {
        let (_temp, sync) = setup();
        let managed = sync.managed_root().join(".ssh/config");
        let home = sync.home_root().join(".ssh/config");
        assert_eq!(sync.home_path_for(&managed), Some(home.clone()));
        assert_eq!(sync.managed_path_for(&home), Some(managed));
        assert_eq!(sync.home_path_for(Path::new("/elsewhere")), None);
    }

    #[test]
    #[serial_test::serial]
    fn test_new_uses_home_env() {
        let temp_dir = TempDir::new().unwrap();
        let previous = std::env::var_os("HOME");
        std::env::set_var("HOME", temp_dir.path());

        let settings = Settings {
            dotfiles_dir: "~/.dots".to_string(),
            ..Settings::default()
        };
        let sync = DotfileSync::new(&settings).unwrap();

        match previous {
            Some(home) => std::env::set_var("HOME", home),
            None => std::env::remove_var("HOME"),
        }

        assert_eq!(sync.home_root(), temp_dir.path());
        assert_eq!(sync.managed_root(), temp_dir.path().join(".dots"));
    }
}
