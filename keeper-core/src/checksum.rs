use anyhow::{Context, Result};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read size used by record/verify unless configured otherwise.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// CRC32 plus the number of bytes it covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileDigest {
    pub crc: u32,
    pub len: u64,
}

/// Streaming CRC32 (ISO-HDLC) over files, holding one reusable read buffer.
///
/// Memory use is bounded by the buffer size regardless of file length, and the
/// result does not depend on how large the buffer is.
pub struct ChecksumEngine {
    buf: Vec<u8>,
}

impl ChecksumEngine {
    /// A `buffer_size` of 0 is treated as 1.
    pub fn new(buffer_size: usize) -> Self {
        Self { buf: vec![0u8; buffer_size.max(1)] }
    }

    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// Checksum a file. Any open or read failure is an error; an empty file
    /// is `Ok` with crc 0.
    pub fn digest_file(&mut self, path: &Path) -> Result<FileDigest> {
        let f = File::open(path).with_context(|| format!("open {:?}", path))?;
        self.digest_reader(f).with_context(|| format!("read {:?}", path))
    }

    pub fn digest_reader<R: Read>(&mut self, mut reader: R) -> Result<FileDigest> {
        let mut hasher = crc32fast::Hasher::new();
        let mut len = 0u64;
        loop {
            let n = match reader.read(&mut self.buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&self.buf[..n]);
            len += n as u64;
        }
        Ok(FileDigest { crc: hasher.finalize(), len })
    }
}

/// One-shot checksum of `path` read in chunks of at most `buffer_size` bytes.
pub fn compute_file_checksum(path: &Path, buffer_size: usize) -> Result<u32> {
    ChecksumEngine::new(buffer_size).digest_file(path).map(|d| d.crc)
}

/// Checksum of any reader, for callers that already hold a stream.
pub fn checksum_reader<R: Read>(reader: R, buffer_size: usize) -> Result<u32> {
    ChecksumEngine::new(buffer_size).digest_reader(reader).map(|d| d.crc)
}

/// Render a checksum the way SFV files carry it.
pub fn format_crc(crc: u32) -> String {
    format!("{:08X}", crc)
}
