//! Runtime settings shared by the listing source, the extraction bridge and
//! the filesystem driver.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::FsError;

/// Longest volume label the driver accepts.
pub const MAX_VOLUME_LABEL: usize = 31;

/// Files below this size are extracted automatically on read (30 MB).
pub const DEFAULT_CACHE_CEILING: u64 = 30_000_000;

/// Total bytes of materialized files kept around before eviction (512 MiB).
pub const DEFAULT_CACHE_BUDGET: u64 = 512 * 1024 * 1024;

pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(300);

/// What a read does when an entry was already materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractPolicy {
    /// Run the archive tool again on every read.
    #[default]
    Always,
    /// Reuse a successful extraction until it is evicted.
    ReuseSuccess,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Command used to run the archive tool.
    pub tool: String,
    pub archive: PathBuf,
    /// Root directory for materialized entries.
    pub cache_dir: PathBuf,
    pub cache_ceiling: u64,
    pub cache_budget: u64,
    pub extraction_timeout: Duration,
    pub volume_label: String,
    pub extract_policy: ExtractPolicy,
    /// Switch the volume to read-only once population finishes.
    pub read_only_after_populate: bool,
}

impl Config {
    pub fn new(tool: impl Into<String>, archive: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            archive: archive.into(),
            cache_dir: std::env::temp_dir().join("zpaqfs"),
            cache_ceiling: DEFAULT_CACHE_CEILING,
            cache_budget: DEFAULT_CACHE_BUDGET,
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
            volume_label: "zpaqfs".to_string(),
            extract_policy: ExtractPolicy::default(),
            read_only_after_populate: true,
        }
    }

    pub fn validate(&self) -> Result<(), FsError> {
        if self.volume_label.chars().count() > MAX_VOLUME_LABEL {
            return Err(FsError::InvalidVolumeLabel(self.volume_label.chars().count()));
        }
        Ok(())
    }
}
