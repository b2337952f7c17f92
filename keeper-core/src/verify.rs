use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::checksum::{format_crc, DEFAULT_BUFFER_SIZE};
use crate::listing::{list_files, ListOptions};
use crate::manifest::{FileRecord, FormatError, Manifest};
use crate::progress::Progress;
use crate::record::digest_all;
use crate::report::Reporter;

#[derive(Clone, Debug)]
pub struct VerifyConfig {
    pub buffer_size: usize,
    /// Also report files next to the manifest that it does not list.
    pub report_extra: bool,
    /// Listing depth for `report_extra`.
    pub recursive: bool,
    pub parallel: bool,
    pub progress: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            report_extra: false,
            recursive: false,
            parallel: false,
            progress: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Match,
    Mismatch { expected: u32, actual: u32 },
    Missing,
}

#[derive(Clone, Debug, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyReport {
    pub manifest: PathBuf,
    /// One per manifest record, sorted by path.
    pub outcomes: Vec<FileOutcome>,
    pub format_errors: Vec<FormatError>,
    pub extra_files: Vec<String>,
    /// Human-readable, in order: format errors, per-file failures, extras.
    pub errors: Vec<String>,
    pub bytes_checked: u64,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// (matched, mismatched, missing)
    pub fn tally(&self) -> (usize, usize, usize) {
        tally(&self.outcomes)
    }
}

/// Directory the manifest's relative paths are resolved against.
fn manifest_root(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Recompute every checksum listed in the manifest at `manifest_path`.
///
/// Only failing to read the manifest itself is an `Err`. Bad lines, missing
/// files and mismatches are all collected in the report; every record is
/// checked regardless of earlier failures.
pub fn verify(
    manifest_path: &Path,
    cfg: &VerifyConfig,
    reporter: &dyn Reporter,
) -> Result<VerifyReport> {
    reporter.info(&format!("Verifying {:?}", manifest_path));
    let decoded = Manifest::load(manifest_path).context("load manifest")?;
    let root = manifest_root(manifest_path);
    let mut errors: Vec<String> = Vec::new();

    for fe in &decoded.errors {
        let msg = fe.to_string();
        reporter.error(&msg);
        errors.push(msg);
    }

    let records = decoded.manifest.records();
    let prog = Progress::new(cfg.progress);
    prog.set_stage("Verifying");
    prog.set_files_total(records.len());
    prog.start();
    let paths: Vec<PathBuf> = records.iter().map(|r| root.join(&r.path)).collect();
    let digests = digest_all(&paths, |p: &PathBuf| p.as_path(), cfg.buffer_size, cfg.parallel, &prog);
    prog.stop();

    let mut outcomes = Vec::with_capacity(records.len());
    let mut bytes_checked = 0u64;
    for (rec, digest) in records.iter().zip(digests) {
        let outcome = match digest {
            Err(e) => {
                let cause = format!("{:#}", e);
                tracing::debug!(path = %rec.path, %cause, "unreadable");
                Outcome::Missing
            }
            Ok(d) => {
                bytes_checked += d.len;
                if d.crc == rec.crc {
                    Outcome::Match
                } else {
                    Outcome::Mismatch { expected: rec.crc, actual: d.crc }
                }
            }
        };
        if let Some(msg) = describe(rec, &outcome) {
            reporter.error(&msg);
            errors.push(msg);
        }
        outcomes.push(FileOutcome { path: rec.path.clone(), outcome });
    }

    let mut extra_files = Vec::new();
    if cfg.report_extra {
        match find_extra(&root, manifest_path, &decoded.manifest, cfg.recursive) {
            Ok(found) => extra_files = found,
            Err(e) => {
                let msg = format!("cannot list {}: {:#}", root.display(), e);
                reporter.error(&msg);
                errors.push(msg);
            }
        }
        for p in &extra_files {
            let msg = format!("extra file: {}", p);
            reporter.warn(&msg);
            errors.push(msg);
        }
    }

    let (ok, bad, missing) = tally(&outcomes);
    reporter.info(&format!(
        "Checked {} files: {} ok, {} mismatched, {} missing",
        outcomes.len(),
        ok,
        bad,
        missing
    ));
    Ok(VerifyReport {
        manifest: manifest_path.to_path_buf(),
        outcomes,
        format_errors: decoded.errors,
        extra_files,
        errors,
        bytes_checked,
    })
}

fn tally(outcomes: &[FileOutcome]) -> (usize, usize, usize) {
    outcomes.iter().fold((0, 0, 0), |(ok, bad, missing), o| match o.outcome {
        Outcome::Match => (ok + 1, bad, missing),
        Outcome::Mismatch { .. } => (ok, bad + 1, missing),
        Outcome::Missing => (ok, bad, missing + 1),
    })
}

fn describe(rec: &FileRecord, outcome: &Outcome) -> Option<String> {
    match outcome {
        Outcome::Match => None,
        Outcome::Missing => Some(format!("file missing: {}", rec.path)),
        Outcome::Mismatch { expected, actual } => Some(format!(
            "checksum mismatch: {} expected={} actual={}",
            rec.path,
            format_crc(*expected),
            format_crc(*actual)
        )),
    }
}

fn find_extra(
    root: &Path,
    manifest_path: &Path,
    manifest: &Manifest,
    recursive: bool,
) -> Result<Vec<String>> {
    let opts = ListOptions {
        recursive,
        skip_sfv_files: true,
        excludes: Vec::new(),
        exclude_path: Some(manifest_path.to_path_buf()),
    };
    let listing = list_files(root, &opts)?;
    let known: BTreeSet<&str> = manifest.records().iter().map(|r| r.path.as_str()).collect();
    Ok(listing
        .files
        .into_iter()
        .map(|f| f.rel)
        .filter(|rel| !known.contains(rel.as_str()))
        .collect())
}

/// Error strings for the manifest at `manifest_path`; empty means every file
/// matched. Never fails: an unreadable manifest is itself one error.
pub fn verify_errors(manifest_path: &Path, reporter: &dyn Reporter) -> Vec<String> {
    match verify(manifest_path, &VerifyConfig::default(), reporter) {
        Ok(r) => r.errors,
        Err(e) => {
            let msg = format!("cannot read manifest: {}: {:#}", manifest_path.display(), e);
            reporter.error(&msg);
            vec![msg]
        }
    }
}
