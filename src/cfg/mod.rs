//! Settings record and its on-disk store.
//!
//! The store never surfaces I/O or parse failures to callers: it logs them and
//! keeps the last settings it successfully held.

mod field;
pub mod validate;

pub use field::SettingsField;

use anyhow::{bail, Context, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::fileops::FileOpsError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dotfiles_dir: String,
    pub backup_dir: String,
    pub auto_backup: bool,
    pub sync_permissions: bool,
    pub ignore_patterns: Vec<String>,
    pub include_patterns: Vec<String>,
    pub symlink_mode: bool,
    pub dry_run: bool,
}

impl Settings {
    pub const KEYS: &'static [&'static str] = &[
        "dotfiles_dir",
        "backup_dir",
        "auto_backup",
        "sync_permissions",
        "ignore_patterns",
        "include_patterns",
        "symlink_mode",
        "dry_run",
    ];
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dotfiles_dir: "~/.dotfiles".to_string(),
            backup_dir: "~/.dotfiles/backups".to_string(),
            auto_backup: true,
            sync_permissions: true,
            ignore_patterns: default_ignore_patterns(),
            include_patterns: default_include_patterns(),
            symlink_mode: false,
            dry_run: false,
        }
    }
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        "*.pyc".to_string(),
        "*.pyo".to_string(),
        "__pycache__".to_string(),
        ".DS_Store".to_string(),
        "Thumbs.db".to_string(),
        "*.log".to_string(),
        "*.tmp".to_string(),
        "*.swp".to_string(),
    ]
}

fn default_include_patterns() -> Vec<String> {
    vec![
        ".*rc".to_string(),
        ".*profile".to_string(),
        ".*conf".to_string(),
        ".*config".to_string(),
    ]
}

/// Serialization formats a settings file may use, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, FileOpsError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(FileOpsError::Format {
                path: path.to_path_buf(),
                message: format!("unsupported config format {:?}", ext),
            }),
        }
    }

    pub fn parse(self, path: &Path, contents: &str) -> Result<Value, FileOpsError> {
        let parsed: Result<Value, String> = match self {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|e| format!("invalid YAML: {}", e))
            }
            ConfigFormat::Json => {
                serde_json::from_str(contents).map_err(|e| format!("invalid JSON: {}", e))
            }
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| format!("invalid TOML: {}", e)),
        };
        parsed.map_err(|message| FileOpsError::Format {
            path: path.to_path_buf(),
            message,
        })
    }

    fn serialize(self, settings: &Settings) -> Result<String> {
        let text = match self {
            ConfigFormat::Yaml => serde_yaml::to_string(settings)?,
            ConfigFormat::Json => serde_json::to_string_pretty(settings)?,
            ConfigFormat::Toml => toml::to_string_pretty(settings)?,
        };
        Ok(text)
    }
}

/// Tilde-expanded managed and backup roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedPaths {
    pub dotfiles_dir: PathBuf,
    pub backup_dir: PathBuf,
}

pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// `<config dir>/dotfile_manager/config.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Failed to find config directory")?;
    Ok(config_dir.join("dotfile_manager").join("config.yaml"))
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    settings: Settings,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("failed to create config directory {}: {}", parent.display(), e);
            }
        }

        ConfigStore {
            path,
            settings: Settings::default(),
        }
    }

    pub fn open_default() -> Result<Self> {
        Ok(ConfigStore::new(default_config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Read the settings file, writing defaults first if it does not exist.
    ///
    /// On any failure the previously held settings are returned unchanged.
    pub fn load(&mut self) -> Settings {
        if !self.path.exists() {
            debug!("no settings at {}, writing defaults", self.path.display());
            self.save();
            return self.settings.clone();
        }

        match self.read_settings() {
            Ok(settings) => self.settings = settings,
            Err(e) => error!("Error loading config {}: {:#}", self.path.display(), e),
        }

        self.settings.clone()
    }

    fn read_settings(&self) -> Result<Settings> {
        let format = ConfigFormat::from_path(&self.path)?;
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        let mut map = match format.parse(&self.path, &contents)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => bail!("Expected a mapping at the top level, found {}", value_kind(&other)),
        };

        map.retain(|key, _| {
            let known = Settings::KEYS.contains(&key.as_str());
            if !known {
                warn!("Ignoring unknown config key: {}", key);
            }
            known
        });

        serde_json::from_value(Value::Object(map)).context("Invalid settings value")
    }

    /// Write the current settings in the format implied by the file extension.
    pub fn save(&self) -> bool {
        match self.write_settings() {
            Ok(()) => true,
            Err(e) => {
                error!("Error saving config {}: {:#}", self.path.display(), e);
                false
            }
        }
    }

    fn write_settings(&self) -> Result<()> {
        let format = ConfigFormat::from_path(&self.path)?;
        let text = format
            .serialize(&self.settings)
            .context("Failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Human-readable problems with the current settings; empty when fine.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let paths = self.expanded_paths();

        for (name, path) in [
            ("dotfiles_dir", &paths.dotfiles_dir),
            ("backup_dir", &paths.backup_dir),
        ] {
            let parent_exists = path.parent().map_or(true, |p| p.as_os_str().is_empty() || p.exists());
            if !parent_exists {
                issues.push(format!(
                    "Parent directory of {} does not exist: {}",
                    name,
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                ));
            }
        }

        for (name, patterns) in [
            ("ignore_patterns", &self.settings.ignore_patterns),
            ("include_patterns", &self.settings.include_patterns),
        ] {
            for pattern in patterns {
                if let Err(e) = Pattern::new(pattern) {
                    issues.push(format!("Invalid pattern in {}: {:?} ({})", name, pattern, e));
                }
            }
        }

        issues
    }

    pub fn expanded_paths(&self) -> ExpandedPaths {
        ExpandedPaths {
            dotfiles_dir: expand_path(&self.settings.dotfiles_dir),
            backup_dir: expand_path(&self.settings.backup_dir),
        }
    }

    /// Apply the given fields and persist the result.
    pub fn update<I>(&mut self, fields: I) -> bool
    where
        I: IntoIterator<Item = SettingsField>,
    {
        for field in fields {
            debug!("updating {}", field.key());
            field.apply(&mut self.settings);
        }
        self.save()
    }
}

/// Copy of `base` with `overrides` applied on top.
pub fn merge<I>(base: &Settings, overrides: I) -> Settings
where
    I: IntoIterator<Item = SettingsField>,
{
    let mut merged = base.clone();
    for field in overrides {
        field.apply(&mut merged);
    }
    merged
}

/// Write a default settings file at `path`.
pub fn create_default_config(path: &Path) -> bool {
    ConfigStore::new(path).save()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
