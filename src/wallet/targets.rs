//! Recipient list loading

use std::path::Path;

use tracing::warn;

use crate::error::{Error, Result};

/// Read the newline-delimited recipient list
///
/// Blank lines and `#` comments are skipped. The sender's own address is
/// dropped so a batch never pays itself.
pub fn load_targets(path: &Path, own_address: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Targets(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let targets = parse_targets(&content, own_address);
    if targets.is_empty() {
        return Err(Error::Targets(format!(
            "{} contains no recipient addresses",
            path.display()
        )));
    }

    Ok(targets)
}

/// Parse recipient addresses from text, preserving order
pub fn parse_targets(content: &str, own_address: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            if *line == own_address {
                warn!("Skipping own address {} in target list", line);
                false
            } else {
                true
            }
        })
        .map(str::to_string)
        .collect()
}
