use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::checksum::format_crc;
use crate::path_safety::validate_rel_path;

/// Generator written into manifests produced by this crate.
pub const TOOL_ID: &str = "keeper";

const GENERATED_PREFIX: &str = "; Generated by ";

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub crc: u32,
}

/// A data line that could not be turned into a [`FileRecord`].
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FormatError {
    /// 1-based.
    pub line_no: usize,
    pub line: String,
    pub reason: String,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed line {}: {}: {}", self.line_no, self.reason, self.line)
    }
}

/// In-memory SFV manifest. Records are always sorted by path (byte order)
/// with no duplicates, so serialization is canonical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Manifest {
    generator: String,
    records: Vec<FileRecord>,
}

/// Result of decoding: whatever parsed, plus one error per rejected line.
#[derive(Clone, Debug)]
pub struct Decoded {
    pub manifest: Manifest,
    pub errors: Vec<FormatError>,
}

impl Manifest {
    /// Build from records in any order. Later duplicates of a path are dropped.
    pub fn new(records: Vec<FileRecord>) -> Self {
        Self::with_generator(TOOL_ID, records)
    }

    pub fn with_generator(generator: &str, records: Vec<FileRecord>) -> Self {
        let mut by_path: BTreeMap<String, u32> = BTreeMap::new();
        for r in records {
            by_path.entry(r.path).or_insert(r.crc);
        }
        let records = by_path.into_iter().map(|(path, crc)| FileRecord { path, crc }).collect();
        Self { generator: generator.to_string(), records }
    }

    pub fn generator(&self) -> &str {
        &self.generator
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.records.binary_search_by(|r| r.path.as_str().cmp(path)).is_ok()
    }

    pub fn to_sfv_string(&self) -> String {
        let mut out = String::with_capacity(32 + self.records.len() * 32);
        out.push_str(GENERATED_PREFIX);
        out.push_str(&self.generator);
        out.push('\n');
        out.push_str(";\n");
        for r in &self.records {
            out.push_str(&r.path);
            out.push(' ');
            out.push_str(&format_crc(r.crc));
            out.push('\n');
        }
        out
    }

    /// Create or truncate `path` and write the manifest to it.
    pub fn write(&self, path: &Path) -> Result<()> {
        let f = File::create(path).with_context(|| format!("create {:?}", path))?;
        let mut w = BufWriter::new(f);
        w.write_all(self.to_sfv_string().as_bytes())
            .and_then(|_| w.flush())
            .with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Decode SFV text. Never fails as a whole; bad lines land in `errors`.
    pub fn parse(text: &str) -> Decoded {
        Self::parse_bytes(text.as_bytes())
    }

    /// Like [`Manifest::parse`], but each line is decoded on its own so a
    /// line that is not UTF-8 is one `FormatError` rather than a lost file.
    pub fn parse_bytes(bytes: &[u8]) -> Decoded {
        let mut generator: Option<String> = None;
        let mut records: Vec<FileRecord> = Vec::new();
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut errors = Vec::new();

        for (i, raw) in bytes.split(|&b| b == b'\n').enumerate() {
            let line_no = i + 1;
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() || raw[0] == b';' {
                if generator.is_none() {
                    if let Some(g) = raw.strip_prefix(GENERATED_PREFIX.as_bytes()) {
                        generator = Some(String::from_utf8_lossy(g).into_owned());
                    }
                }
                continue;
            }
            let line = match std::str::from_utf8(raw) {
                Ok(l) => l,
                Err(_) => {
                    errors.push(FormatError {
                        line_no,
                        line: String::from_utf8_lossy(raw).into_owned(),
                        reason: "not valid UTF-8".to_string(),
                    });
                    continue;
                }
            };
            let reject = |reason: String| FormatError {
                line_no,
                line: line.to_string(),
                reason,
            };
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 2 {
                errors.push(reject(format!("expected 2 fields, found {}", tokens.len())));
                continue;
            }
            let (path, hex) = (tokens[0], tokens[1]);
            let crc = match parse_crc(hex) {
                Some(c) => c,
                None => {
                    errors.push(reject(format!("invalid checksum {:?}", hex)));
                    continue;
                }
            };
            if let Err(e) = validate_rel_path(path) {
                errors.push(reject(e.to_string()));
                continue;
            }
            if let Some(first) = seen.get(path) {
                errors.push(reject(format!("duplicate path, first seen on line {}", first)));
                continue;
            }
            seen.insert(path.to_string(), line_no);
            records.push(FileRecord { path: path.to_string(), crc });
        }

        let generator = generator.unwrap_or_else(|| TOOL_ID.to_string());
        Decoded { manifest: Manifest::with_generator(&generator, records), errors }
    }

    pub fn load(path: &Path) -> Result<Decoded> {
        let bytes = fs::read(path).with_context(|| format!("read {:?}", path))?;
        Ok(Self::parse_bytes(&bytes))
    }
}

fn parse_crc(hex: &str) -> Option<u32> {
    if hex.is_empty() || hex.len() > 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str, crc: u32) -> FileRecord {
        FileRecord { path: path.to_string(), crc }
    }

    #[test]
    fn empty_manifest_still_has_header() {
        assert_eq!(Manifest::new(vec![]).to_sfv_string(), "; Generated by keeper\n;\n");
    }

    #[test]
    fn sort_is_bytewise() {
        let m = Manifest::new(vec![rec("b", 2), rec("B", 1), rec("10_x", 3), rec("1_x", 4)]);
        let paths: Vec<&str> = m.records().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["10_x", "1_x", "B", "b"]);
    }

    #[test]
    fn crc_parsing_rules() {
        assert_eq!(parse_crc("7D14DDDD"), Some(0x7D14DDDD));
        assert_eq!(parse_crc("7d14dddd"), Some(0x7D14DDDD));
        assert_eq!(parse_crc("0"), Some(0));
        assert_eq!(parse_crc("+1"), None);
        assert_eq!(parse_crc("123456789"), None);
        assert_eq!(parse_crc("XYZ"), None);
    }

    #[test]
    fn generator_survives_reload() {
        let text = "; Generated by other-tool 1.2\n;\na.bin 00000001\n";
        let d = Manifest::parse(text);
        assert!(d.errors.is_empty());
        assert_eq!(d.manifest.generator(), "other-tool 1.2");
        assert_eq!(d.manifest.to_sfv_string(), text);
    }

    #[test]
    fn invalid_utf8_line_is_one_error() {
        let d = Manifest::parse_bytes(b"; Generated by keeper\n;\na 00000001\ncaf\xe9 00000000\nb 00000002\n");
        assert_eq!(d.errors.len(), 1);
        assert_eq!(d.errors[0].line_no, 4);
        assert_eq!(d.errors[0].reason, "not valid UTF-8");
        assert_eq!(d.errors[0].line, "caf\u{FFFD} 00000000");
        assert_eq!(d.manifest.records(), &[rec("a", 1), rec("b", 2)]);
    }

    #[test]
    fn crlf_lines_are_accepted() {
        let d = Manifest::parse("; Generated by keeper\r\n;\r\na 0000000A\r\n");
        assert!(d.errors.is_empty());
        assert_eq!(d.manifest.records(), &[rec("a", 10)]);
    }
}
