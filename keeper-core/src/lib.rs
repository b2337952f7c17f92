//! keeper core: CRC32 checksums of files, SFV manifests, and the record and
//! verify workflows built on them.

pub mod checksum;
pub mod listing;
pub mod manifest;
pub mod path_safety;
pub mod progress;
pub mod record;
pub mod report;
pub mod verify;

pub use checksum::{compute_file_checksum, ChecksumEngine, FileDigest, DEFAULT_BUFFER_SIZE};
pub use manifest::{Decoded, FileRecord, FormatError, Manifest};
pub use record::{record, record_ok, RecordConfig, RecordReport};
pub use report::{NullReporter, Reporter};
pub use verify::{verify, verify_errors, Outcome, VerifyConfig, VerifyReport};
