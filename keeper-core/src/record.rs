use anyhow::{anyhow, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::checksum::{ChecksumEngine, FileDigest, DEFAULT_BUFFER_SIZE};
use crate::listing::{list_files, ListOptions, ListedFile};
use crate::manifest::{FileRecord, Manifest};
use crate::progress::Progress;
use crate::report::Reporter;

#[derive(Clone, Debug)]
pub struct RecordConfig {
    pub buffer_size: usize,
    pub recursive: bool,
    /// Leave other `*.sfv` files out of the manifest.
    pub skip_sfv_files: bool,
    /// Glob patterns matched against relative paths.
    pub excludes: Vec<String>,
    pub parallel: bool,
    pub progress: bool,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            recursive: false,
            skip_sfv_files: true,
            excludes: Vec::new(),
            parallel: false,
            progress: false,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RecordReport {
    pub files: usize,
    pub bytes: u64,
    /// Entries that cannot be expressed as an SFV line.
    pub skipped: Vec<PathBuf>,
}

/// Hash every listed file, in listing order. Each task owns its engine.
pub(crate) fn digest_all<T, F>(
    items: &[T],
    path_of: F,
    buffer_size: usize,
    parallel: bool,
    prog: &Progress,
) -> Vec<Result<FileDigest>>
where
    T: Sync,
    F: Fn(&T) -> &Path + Sync,
{
    let one = |engine: &mut ChecksumEngine, item: &T| {
        let r = engine.digest_file(path_of(item));
        prog.file_done(r.as_ref().map(|d| d.len).unwrap_or(0));
        r
    };
    if parallel {
        items
            .par_iter()
            .map_init(|| ChecksumEngine::new(buffer_size), |engine, item| one(engine, item))
            .collect()
    } else {
        let mut engine = ChecksumEngine::new(buffer_size);
        items.iter().map(|item| one(&mut engine, item)).collect()
    }
}

/// Record checksums for the files in `source_dir` into a new manifest at
/// `manifest_path`, replacing any existing file there.
///
/// Fails if the directory cannot be listed, any file cannot be hashed, or the
/// manifest cannot be written. All hashing failures are reported before the
/// call fails, and nothing is written in that case.
pub fn record(
    source_dir: &Path,
    manifest_path: &Path,
    cfg: &RecordConfig,
    reporter: &dyn Reporter,
) -> Result<RecordReport> {
    reporter.info(&format!("Recording {:?} -> {:?}", source_dir, manifest_path));
    let opts = ListOptions {
        recursive: cfg.recursive,
        skip_sfv_files: cfg.skip_sfv_files,
        excludes: cfg.excludes.clone(),
        exclude_path: Some(manifest_path.to_path_buf()),
    };
    let listing = list_files(source_dir, &opts).map_err(|e| {
        reporter.error(&format!("cannot list {:?}: {:#}", source_dir, e));
        e
    })?;
    for s in &listing.skipped {
        reporter.warn(&format!("skipping {:?}: {}", s.path, s.reason));
    }

    let prog = Progress::new(cfg.progress);
    prog.set_stage("Recording");
    prog.set_files_total(listing.files.len());
    prog.start();
    let digests = digest_all(
        &listing.files,
        |f: &ListedFile| f.abs.as_path(),
        cfg.buffer_size,
        cfg.parallel,
        &prog,
    );
    prog.stop();

    let (manifest, bytes) = collect_records(&listing.files, digests, reporter)?;
    manifest.write(manifest_path).map_err(|e| {
        reporter.error(&format!("{:#}", e));
        e
    })?;
    reporter.info(&format!("Recorded {} files to {:?}", manifest.len(), manifest_path));
    Ok(RecordReport {
        files: manifest.len(),
        bytes,
        skipped: listing.skipped.into_iter().map(|s| s.path).collect(),
    })
}

/// Pair listed files with their digests. Every failure is reported; any
/// failure makes the whole recording fail.
fn collect_records(
    files: &[ListedFile],
    digests: Vec<Result<FileDigest>>,
    reporter: &dyn Reporter,
) -> Result<(Manifest, u64)> {
    let mut records = Vec::with_capacity(digests.len());
    let mut failures = 0usize;
    let mut bytes = 0u64;
    for (file, digest) in files.iter().zip(digests) {
        match digest {
            Ok(d) => {
                tracing::debug!(path = %file.rel, crc = d.crc, len = d.len, "hashed");
                bytes += d.len;
                records.push(FileRecord { path: file.rel.clone(), crc: d.crc });
            }
            Err(e) => {
                reporter.error(&format!("cannot checksum {}: {:#}", file.rel, e));
                failures += 1;
            }
        }
    }
    if failures > 0 {
        return Err(anyhow!("{} file(s) could not be checksummed; manifest not written", failures));
    }
    Ok((Manifest::new(records), bytes))
}

/// Boolean form of [`record`] with default settings.
pub fn record_ok(source_dir: &Path, manifest_path: &Path, reporter: &dyn Reporter) -> bool {
    record(source_dir, manifest_path, &RecordConfig::default(), reporter).is_ok()
}
