//! Ad hoc parsers for `KEY=VALUE` env files and INI-like config files.
//!
//! Both are lenient: malformed lines are skipped and read failures are logged,
//! returning whatever was parsed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Parse `KEY=VALUE` lines in file order. Blank lines and `#` comments are
/// skipped; surrounding quotes are stripped from values. A repeated key keeps
/// its first position and takes the last value.
pub fn parse_key_value_file(path: &Path) -> Vec<(String, String)> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("failed to read env file {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    parse_key_values(&content)
}

pub fn parse_key_values(content: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'').to_string();

        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => pairs.push((key, value)),
        }
    }

    pairs
}

pub type IniSections = BTreeMap<String, BTreeMap<String, String>>;

/// Parse `[section]` delimited `key = value` files. Keys before the first
/// header land in [`DEFAULT_SECTION`]. `#` and `;` start comments.
pub fn parse_ini_like(path: &Path) -> IniSections {
    match fs::read_to_string(path) {
        Ok(content) => parse_ini(&content),
        Err(e) => {
            warn!("failed to read config file {}: {}", path.display(), e);
            let mut sections = IniSections::new();
            sections.insert(DEFAULT_SECTION.to_string(), BTreeMap::new());
            sections
        }
    }
}

pub fn parse_ini(content: &str) -> IniSections {
    let mut sections = IniSections::new();
    let mut current = DEFAULT_SECTION.to_string();
    sections.insert(current.clone(), BTreeMap::new());

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
            current = line[1..line.len() - 1].to_string();
            // A repeated header starts the section afresh.
            sections.insert(current.clone(), BTreeMap::new());
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}
