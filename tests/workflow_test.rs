/// End-to-end library workflow:
/// - Settings round trip
/// - Import from home into the managed tree
/// - Status and diff after the live file drifts
/// - Backup and restore of the live file

use dotkeep::cfg::{ConfigStore, SettingsField};
use dotkeep::diff::{DiffOutcome, SyncStatus};
use dotkeep::fileops;
use dotkeep::sync::DotfileSync;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_import_diff_backup_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let home = temp_dir.path().join("home");
    let managed = temp_dir.path().join("dotfiles");
    fs::create_dir_all(home.join(".config/git")).unwrap();
    fs::write(home.join(".zshrc"), "export EDITOR=vim\nalias g=git\n").unwrap();
    fs::write(home.join(".config/git/config"), "[user]\nname = Jane\n").unwrap();

    // Settings point at the managed tree
    let config_path = temp_dir.path().join("config.toml");
    let mut store = ConfigStore::new(&config_path);
    assert!(store.update([SettingsField::DotfilesDir(managed.display().to_string())]));
    let settings = ConfigStore::new(&config_path).load();
    assert_eq!(settings.dotfiles_dir, managed.display().to_string());

    let sync = DotfileSync::with_roots(&settings.dotfiles_dir, &home);
    sync.ensure_managed_dir().unwrap();

    // Import everything scan_home offers
    let candidates: Vec<_> = sync.scan_home().into_iter().collect();
    assert_eq!(sync.import_many(&candidates, false), candidates.len());
    assert_eq!(
        sync.scan_managed(),
        vec![managed.join(".config/git/config"), managed.join(".zshrc")]
    );
    assert!(sync
        .status_report()
        .iter()
        .all(|entry| entry.status == SyncStatus::InSync));

    // Imported copies are byte-identical
    let comparison = fileops::compare(&home.join(".zshrc"), &managed.join(".zshrc"));
    assert!(comparison.same_content);

    // Back up the live file, then let it drift
    let backup_dir = temp_dir.path().join("backups");
    let backup = fileops::backup(&home.join(".zshrc"), Some(&backup_dir)).unwrap();
    fs::write(home.join(".zshrc"), "export EDITOR=nvim\nalias g=git\n").unwrap();

    match sync.diff(&managed.join(".zshrc")) {
        DiffOutcome::Changed(text) => {
            assert!(text.contains("-export EDITOR=vim"));
            assert!(text.contains("+export EDITOR=nvim"));
        }
        other => panic!("expected a diff, got {:?}", other),
    }

    // Remove a live file to get a missing entry
    fs::remove_file(home.join(".config/git/config")).unwrap();
    let statuses: Vec<_> = sync.status_report().into_iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![SyncStatus::MissingInHome, SyncStatus::Different]);

    // Restoring the backup brings the file back in sync
    assert!(fileops::restore(&backup, &home.join(".zshrc")));
    assert_eq!(sync.status(&managed.join(".zshrc")), SyncStatus::InSync);
}

#[test]
fn test_parsers_on_imported_files() {
    let temp_dir = TempDir::new().unwrap();
    let env = temp_dir.path().join(".env");
    fs::write(&env, "FOO=bar\n# comment\nBAZ=\"qux\"\n").unwrap();

    let pairs = fileops::parse_key_value_file(&env);
    assert_eq!(
        pairs,
        vec![
            ("FOO".to_string(), "bar".to_string()),
            ("BAZ".to_string(), "qux".to_string()),
        ]
    );

    let found = fileops::find_by_pattern(temp_dir.path(), ".env", false);
    assert_eq!(found, vec![env]);
}
