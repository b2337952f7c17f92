use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a batch instruction file: one command per line, split on whitespace.
/// Blank lines and lines starting with `;` are skipped.
pub fn read_batch(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = fs::read_to_string(path).with_context(|| format!("read batch file {:?}", path))?;
    Ok(parse_batch(&text))
}

pub fn parse_batch(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with(';'))
        .map(|l| l.split_whitespace().map(str::to_string).collect())
        .collect()
}
