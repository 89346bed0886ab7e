use crate::fileops::FileOpsError;

use super::Settings;

/// One updatable setting together with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsField {
    DotfilesDir(String),
    BackupDir(String),
    AutoBackup(bool),
    SyncPermissions(bool),
    IgnorePatterns(Vec<String>),
    IncludePatterns(Vec<String>),
    SymlinkMode(bool),
    DryRun(bool),
}

impl SettingsField {
    pub fn key(&self) -> &'static str {
        match self {
            SettingsField::DotfilesDir(_) => "dotfiles_dir",
            SettingsField::BackupDir(_) => "backup_dir",
            SettingsField::AutoBackup(_) => "auto_backup",
            SettingsField::SyncPermissions(_) => "sync_permissions",
            SettingsField::IgnorePatterns(_) => "ignore_patterns",
            SettingsField::IncludePatterns(_) => "include_patterns",
            SettingsField::SymlinkMode(_) => "symlink_mode",
            SettingsField::DryRun(_) => "dry_run",
        }
    }

    /// Build a field from a string key and value, e.g. from a command line.
    ///
    /// Booleans accept `true/false`, `yes/no`, `on/off` and `1/0`. Pattern
    /// lists are comma separated.
    pub fn parse(key: &str, value: &str) -> Result<Self, FileOpsError> {
        let field = match key {
            "dotfiles_dir" => SettingsField::DotfilesDir(value.to_string()),
            "backup_dir" => SettingsField::BackupDir(value.to_string()),
            "auto_backup" => SettingsField::AutoBackup(parse_bool(key, value)?),
            "sync_permissions" => SettingsField::SyncPermissions(parse_bool(key, value)?),
            "ignore_patterns" => SettingsField::IgnorePatterns(parse_list(value)),
            "include_patterns" => SettingsField::IncludePatterns(parse_list(value)),
            "symlink_mode" => SettingsField::SymlinkMode(parse_bool(key, value)?),
            "dry_run" => SettingsField::DryRun(parse_bool(key, value)?),
            _ => {
                return Err(FileOpsError::constraint(format!(
                    "unknown config key: {}",
                    key
                )))
            }
        };
        Ok(field)
    }

    pub fn apply(self, settings: &mut Settings) {
        match self {
            SettingsField::DotfilesDir(v) => settings.dotfiles_dir = v,
            SettingsField::BackupDir(v) => settings.backup_dir = v,
            SettingsField::AutoBackup(v) => settings.auto_backup = v,
            SettingsField::SyncPermissions(v) => settings.sync_permissions = v,
            SettingsField::IgnorePatterns(v) => settings.ignore_patterns = v,
            SettingsField::IncludePatterns(v) => settings.include_patterns = v,
            SettingsField::SymlinkMode(v) => settings.symlink_mode = v,
            SettingsField::DryRun(v) => settings.dry_run = v,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, FileOpsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(FileOpsError::constraint(format!(
            "{} expects a boolean, got {:?}",
            key, other
        ))),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
