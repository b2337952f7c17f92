use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Which files under a directory take part in a manifest.
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    pub recursive: bool,
    pub skip_sfv_files: bool,
    pub excludes: Vec<String>,
    /// Never listed, typically the manifest being written or checked.
    pub exclude_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedFile {
    /// `/`-separated, relative to the listing root.
    pub rel: String,
    pub abs: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct Listing {
    /// Sorted by `rel`, byte order.
    pub files: Vec<ListedFile>,
    pub skipped: Vec<SkippedFile>,
}

fn build_globset(excludes: &[String]) -> Result<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for g in excludes {
        b.add(Glob::new(g).with_context(|| format!("bad exclude pattern {:?}", g))?);
    }
    Ok(b.build()?)
}

/// Absolute form of a path that may not exist yet (only its parent must).
pub fn canonical_target(path: &Path) -> Option<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = path.file_name()?;
    Some(std::fs::canonicalize(parent).ok()?.join(name))
}

fn is_sfv(path: &Path) -> bool {
    path.extension().map(|e| e.eq_ignore_ascii_case("sfv")).unwrap_or(false)
}

fn rel_string(rel: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for comp in rel.components() {
        match comp {
            Component::Normal(s) => parts.push(s.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// List regular files under `root`. Symlinks and directories are never
/// listed; subdirectories are only descended into when `recursive` is set.
pub fn list_files(root: &Path, opts: &ListOptions) -> Result<Listing> {
    let excludes = build_globset(&opts.excludes)?;
    let root_can =
        std::fs::canonicalize(root).with_context(|| format!("list directory {:?}", root))?;
    let target = opts.exclude_path.as_deref().and_then(canonical_target);
    let max_depth = if opts.recursive { usize::MAX } else { 1 };

    let mut listing = Listing::default();
    for ent in WalkDir::new(root).min_depth(1).max_depth(max_depth) {
        let ent = ent.with_context(|| format!("list directory {:?}", root))?;
        if !ent.file_type().is_file() {
            continue;
        }
        let path = ent.path();
        let rel_path = pathdiff::diff_paths(path, root)
            .unwrap_or_else(|| PathBuf::from(ent.file_name()));
        if let Some(t) = &target {
            if root_can.join(&rel_path) == *t {
                continue;
            }
        }
        if opts.skip_sfv_files && is_sfv(path) {
            tracing::debug!(path = %path.display(), "skipping manifest file");
            continue;
        }
        let Some(rel) = rel_string(&rel_path) else {
            listing.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: "name is not valid UTF-8".to_string(),
            });
            continue;
        };
        if rel.chars().any(char::is_whitespace) {
            listing.skipped.push(SkippedFile {
                path: path.to_path_buf(),
                reason: "name contains whitespace".to_string(),
            });
            continue;
        }
        if excludes.is_match(&rel) {
            continue;
        }
        listing.files.push(ListedFile { rel, abs: path.to_path_buf() });
    }
    listing.files.sort_by(|a, b| a.rel.cmp(&b.rel));
    Ok(listing)
}
