//! Extraction bridge to the external archive tool.
//!
//! The rest of the crate never parses archive data. When bytes are needed,
//! an [`Extractor`] runs the archive tool to materialize one entry (a file or
//! a whole directory subtree) on local storage.
//!
//! Failures are process-level: the tool is missing, it exited with an error,
//! or the destination cannot be written. All of them come back as
//! [`ExtractError`] values, never as panics.

mod zpaq;

pub use zpaq::ZpaqExtractor;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ExtractError;

/// One extraction job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    pub archive: PathBuf,
    /// Entry path inside the archive, no leading or trailing slash.
    pub entry: String,
    /// Directory the entry is placed in.
    pub destination: PathBuf,
    pub is_directory: bool,
}

impl ExtractRequest {
    pub fn new(archive: &Path, entry: &str, destination: &Path, is_directory: bool) -> Self {
        Self {
            archive: archive.to_path_buf(),
            entry: entry.trim_matches('/').to_string(),
            destination: destination.to_path_buf(),
            is_directory,
        }
    }

    /// Last segment of the entry path.
    pub fn name(&self) -> &str {
        self.entry.rsplit('/').next().unwrap_or(&self.entry)
    }

    /// Where the entry ends up: `<destination>/<name>`.
    pub fn target(&self) -> PathBuf {
        self.destination.join(self.name())
    }
}

/// Something that can materialize archive entries.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Run one extraction. On success returns whatever the tool printed.
    async fn extract(&self, request: &ExtractRequest) -> Result<String, ExtractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_target() {
        let request = ExtractRequest::new(
            Path::new("a.zpaq"),
            "/C:/data/report.txt",
            Path::new("/tmp/out"),
            false,
        );
        assert_eq!(request.entry, "C:/data/report.txt");
        assert_eq!(request.name(), "report.txt");
        assert_eq!(request.target(), PathBuf::from("/tmp/out/report.txt"));
    }
}
