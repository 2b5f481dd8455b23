//! Error types for listing ingestion, extraction and the virtual filesystem.
//!
//! Each layer has its own enum. [`FsError`] is the one callers of the driver
//! see; it converts into [`std::io::Error`] at the outer boundary.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while reading and ingesting an archive listing.
#[derive(Error, Debug)]
pub enum ListingError {
    /// A line did not match the entry pattern. Never fatal: the builder skips it.
    #[error("malformed listing line: {0:?}")]
    MalformedInput(String),

    #[error("archive not found: {0}")]
    ArchiveNotFound(String),

    #[error("archive tool rejected the invocation: {0}")]
    InvocationError(String),

    #[error("failed to read listing: {0}")]
    Io(#[from] io::Error),
}

/// Failure of one archive tool invocation.
///
/// `Clone` so that a single in-flight result can be shared by every reader
/// waiting on the same path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("archive tool not found: {0}")]
    ToolNotFound(String),

    #[error("archive tool exited with {status}: {output}")]
    ToolFailed { status: String, output: String },

    #[error("destination {path:?} is not writable: {reason}")]
    Destination { path: PathBuf, reason: String },

    #[error("extraction did not finish within {0:?}")]
    Timeout(Duration),

    #[error("extraction failed: {0}")]
    Other(String),
}

/// Errors surfaced by the node store and the filesystem driver.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("no such entry: {0}")]
    NameNotFound(String),

    #[error("entry already exists: {0}")]
    NameCollision(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    #[error("volume is read-only")]
    ReadOnlyViolation,

    #[error("read at offset {offset} is past end of file ({size} bytes)")]
    EndOfRange { offset: u64, size: u64 },

    #[error("{path} is {size} bytes, at or above the {ceiling} byte cache ceiling; extract it explicitly")]
    ExtractionRequired { path: String, size: u64, ceiling: u64 },

    #[error(transparent)]
    ExtractionFailure(#[from] ExtractError),

    #[error("operation not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("volume label must be 31 characters or fewer, got {0}")]
    InvalidVolumeLabel(usize),

    #[error("filesystem is not serving requests (state: {0})")]
    NotServing(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FsError>;

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = match &err {
            FsError::NameNotFound(_) => io::ErrorKind::NotFound,
            FsError::NameCollision(_) => io::ErrorKind::AlreadyExists,
            FsError::NotADirectory(_) => io::ErrorKind::NotADirectory,
            FsError::NotAFile(_) => io::ErrorKind::IsADirectory,
            FsError::DirectoryNotEmpty(_) => io::ErrorKind::DirectoryNotEmpty,
            FsError::ReadOnlyViolation => io::ErrorKind::ReadOnlyFilesystem,
            FsError::EndOfRange { .. } => io::ErrorKind::UnexpectedEof,
            FsError::ExtractionRequired { .. } => io::ErrorKind::FileTooLarge,
            FsError::ExtractionFailure(ExtractError::Timeout(_)) => io::ErrorKind::TimedOut,
            FsError::ExtractionFailure(ExtractError::ToolNotFound(_)) => io::ErrorKind::NotFound,
            FsError::ExtractionFailure(_) => io::ErrorKind::Other,
            FsError::NotImplemented(_) => io::ErrorKind::Unsupported,
            FsError::InvalidVolumeLabel(_) => io::ErrorKind::InvalidInput,
            FsError::NotServing(_) => io::ErrorKind::NotConnected,
            FsError::Io(e) => e.kind(),
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_mapping() {
        let err: io::Error = FsError::NameNotFound("/a".into()).into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let err: io::Error = FsError::ReadOnlyViolation.into();
        assert_eq!(err.kind(), io::ErrorKind::ReadOnlyFilesystem);

        let err: io::Error =
            FsError::ExtractionFailure(ExtractError::Timeout(Duration::from_secs(1))).into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
