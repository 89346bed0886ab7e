//! Dotkeep - a small dotfiles keeper.
//!
//! This library provides the core functionality for dotkeep, including:
//! - Settings loading and saving in YAML, JSON or TOML
//! - Dotfile discovery under home and in the managed tree
//! - Importing dotfiles into the managed tree
//! - Unified diffs between managed copies and their live counterparts
//! - File helpers: hashing, metadata, backups, comparison, search, symlinks
//!   and simple config-file parsers

pub mod cfg;
pub mod diff;
pub mod fileops;
pub mod scan;
pub mod sync;
pub mod ui;
