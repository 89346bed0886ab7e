//! Syntax checks for config files a user might track.

use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn failed(error: String) -> Self {
        ValidationReport {
            valid: false,
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    fn ok() -> Self {
        ValidationReport {
            valid: true,
            ..ValidationReport::default()
        }
    }
}

pub fn validate_yaml(path: &Path) -> ValidationReport {
    validate_with(path, |contents| {
        serde_yaml::from_str::<serde_yaml::Value>(contents)
            .map(|_| ())
            .map_err(|e| format!("YAML syntax error: {}", e))
    })
}

pub fn validate_json(path: &Path) -> ValidationReport {
    validate_with(path, |contents| {
        serde_json::from_str::<serde_json::Value>(contents)
            .map(|_| ())
            .map_err(|e| format!("JSON syntax error: {}", e))
    })
}

pub fn validate_toml(path: &Path) -> ValidationReport {
    validate_with(path, |contents| {
        toml::from_str::<toml::Table>(contents)
            .map(|_| ())
            .map_err(|e| format!("TOML syntax error: {}", e))
    })
}

fn validate_with<F>(path: &Path, check: F) -> ValidationReport
where
    F: FnOnce(&str) -> Result<(), String>,
{
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => return ValidationReport::failed(format!("Error reading file: {}", e)),
    };

    match check(&contents) {
        Ok(()) => ValidationReport::ok(),
        Err(e) => ValidationReport::failed(e),
    }
}

fn dangerous_rm() -> Result<Regex> {
    Ok(Regex::new(r"\brm\s+-(?:rf|fr)\s+(?:/|\*)(?:\s|;|$)")?)
}

/// Lightweight lint for shell scripts: flags empty files, a dangling line
/// continuation at EOF, and `rm -rf` aimed at `/` or `*`.
pub fn validate_shell_script(path: &Path) -> ValidationReport {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => return ValidationReport::failed(format!("Error reading file: {}", e)),
    };

    let mut report = ValidationReport::ok();

    if contents.trim().is_empty() {
        report.warnings.push("File is empty".to_string());
        return report;
    }

    let rm = match dangerous_rm() {
        Ok(rm) => rm,
        Err(e) => return ValidationReport::failed(e.to_string()),
    };

    let lines: Vec<&str> = contents.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let line_no = i + 1;
        let line = line.trim();

        if line_no == lines.len() && line.ends_with('\\') {
            report
                .warnings
                .push(format!("Line {}: Ends with backslash but is last line", line_no));
        }

        if rm.is_match(line) {
            report
                .errors
                .push(format!("Line {}: Potentially dangerous rm command", line_no));
        }
    }

    report
}
