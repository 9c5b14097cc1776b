//! Size and member accounting for a rewrite.
//!
//! Both file mode and buffer mode report raw byte counts. Decimal megabyte
//! figures (bytes / 1,000,000 rounded to two decimals) are derived on demand
//! for display and never replace the raw values.

use serde::Serialize;

const BYTES_PER_MEGABYTE: f64 = 1_000_000.0;

/// Byte accounting of a rewrite. `savings_bytes == original_bytes - new_bytes`
/// always holds, and may be negative when re-compression grows the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeStats {
    original_bytes: u64,
    new_bytes: u64,
    savings_bytes: i64,
}

impl SizeStats {
    pub fn new(original_bytes: u64, new_bytes: u64) -> Self {
        Self {
            original_bytes,
            new_bytes,
            savings_bytes: original_bytes as i64 - new_bytes as i64,
        }
    }

    pub fn original_bytes(&self) -> u64 {
        self.original_bytes
    }

    pub fn new_bytes(&self) -> u64 {
        self.new_bytes
    }

    pub fn savings_bytes(&self) -> i64 {
        self.savings_bytes
    }

    pub fn original_megabytes(&self) -> f64 {
        to_megabytes(self.original_bytes as i64)
    }

    pub fn new_megabytes(&self) -> f64 {
        to_megabytes(self.new_bytes as i64)
    }

    pub fn savings_megabytes(&self) -> f64 {
        to_megabytes(self.savings_bytes)
    }
}

/// Decimal megabytes rounded to two places.
pub fn to_megabytes(bytes: i64) -> f64 {
    (bytes as f64 / BYTES_PER_MEGABYTE * 100.0).round() / 100.0
}

/// Per-member counters collected while walking the source archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemberStats {
    /// Every entry encountered, including non-file entries.
    pub seen: usize,
    /// Members written to the output.
    pub kept: usize,
    /// Members dropped because their name is in the exclusion set.
    pub excluded: usize,
    /// Members dropped because their name ends with `.gz`.
    pub nested_archives: usize,
    /// Directories, devices, unresolved links and other entries without
    /// content.
    pub non_file: usize,
    /// Link members written with the content of the member they point at.
    pub links_resolved: usize,
    /// `.log` members that were tail-truncated.
    pub truncated: usize,
}

/// A `.log` member that could not be decoded as UTF-8 and was passed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingWarning {
    pub member: String,
    /// Byte offset of the first invalid sequence.
    pub valid_up_to: usize,
}

impl std::fmt::Display for EncodingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to decode {} as UTF-8 (invalid byte at offset {}); kept unmodified",
            self.member, self.valid_up_to
        )
    }
}
