use anyhow::{bail, Result};
use std::path::{Component, Path};

/// Ensure a manifest entry stays under the manifest's directory: no absolute
/// paths, no root or drive prefix, no `..`.
pub fn validate_rel_path(rel: &str) -> Result<()> {
    let p = Path::new(rel);
    if p.is_absolute() || rel.starts_with('/') || rel.starts_with('\\') {
        bail!("absolute paths are not allowed");
    }
    for comp in p.components() {
        match comp {
            Component::ParentDir => bail!("parent traversal not allowed"),
            Component::RootDir | Component::Prefix(_) => bail!("absolute paths are not allowed"),
            _ => {}
        }
    }
    // Backslash-separated traversal is not split into components on unix.
    if rel.split(['/', '\\']).any(|seg| seg == "..") {
        bail!("parent traversal not allowed");
    }
    Ok(())
}
