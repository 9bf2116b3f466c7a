//! CLI presenter for output formatting

use std::collections::BTreeMap;

use colored::*;

/// Presenter for CLI output formatting
#[derive(Debug, Default)]
pub struct Presenter;

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print daemon status
    pub fn daemon_status(&self, state: &str) {
        eprintln!("{} Daemon: {}", "●".cyan(), state);
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Print a counts table to stdout
    pub fn counts(&self, counts: &BTreeMap<String, u32>) {
        for line in format_counts(counts) {
            println!("{}", line);
        }
    }
}

/// Render counts as aligned `source  count` rows followed by a total
pub fn format_counts(counts: &BTreeMap<String, u32>) -> Vec<String> {
    if counts.is_empty() {
        return vec!["(no active notifications)".dimmed().to_string()];
    }

    let width = counts.keys().map(String::len).max().unwrap_or(0).max("total".len());
    let total: u64 = counts.values().map(|&c| u64::from(c)).sum();

    counts
        .iter()
        .map(|(source, count)| format!("{:<width$}  {}", source, count, width = width))
        .chain(std::iter::once(format!(
            "{:<width$}  {}",
            "total",
            total,
            width = width
        )))
        .collect()
}
