//! Line-level parser for `zpaqfranz l` output.
//!
//! ## Parsing Strategy
//!
//! A listing is a tool banner, a `<N> files` line, then entry records mixed
//! with status lines. The parser runs in two phases:
//! 1. Header: look for fatal signals (missing archive, usage errors) and the
//!    files marker. Nothing is turned into an entry in this phase.
//! 2. Entries: every line is matched against the entry pattern. A line that
//!    does not match comes back as [`ListingError::MalformedInput`], which the
//!    tree builder treats as noise.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ListingError;

use super::structures::*;

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ENTRY_PATTERN).expect("entry pattern is valid"));

static FILES_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FILES_MARKER_PATTERN).expect("files marker pattern is valid"));

static ARCHIVE_ECHO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ARCHIVE_ECHO_PATTERN).expect("archive echo pattern is valid"));

static ARCHIVE_MISSING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ARCHIVE_MISSING_PATTERN).expect("archive missing pattern is valid")
});

static USAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(USAGE_PATTERN).expect("usage pattern is valid"));

/// Which half of the listing the parser is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Entries,
}

/// Stateful parser fed one listing line at a time.
#[derive(Debug)]
pub struct ListingParser {
    phase: Phase,
    expected: Option<u64>,
}

impl Default for ListingParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingParser {
    pub fn new() -> Self {
        Self {
            phase: Phase::Header,
            expected: None,
        }
    }

    /// Entry count announced by the files marker, once seen.
    pub fn expected_entries(&self) -> Option<u64> {
        self.expected
    }

    /// Classify a single line without touching parser state.
    pub fn classify(line: &str) -> ListingLine {
        if let Ok(record) = Self::parse_entry(line) {
            return ListingLine::Entry(record);
        }
        if ARCHIVE_ECHO_RE.is_match(line) {
            return ListingLine::Other;
        }
        if ARCHIVE_MISSING_RE.is_match(line) {
            return ListingLine::ArchiveMissing(line.trim().to_string());
        }
        if USAGE_RE.is_match(line) {
            return ListingLine::UsageError(line.trim().to_string());
        }
        if let Some(caps) = FILES_MARKER_RE.captures(line) {
            if let Some(count) = parse_size(&caps["count"]) {
                return ListingLine::FilesMarker(count);
            }
        }
        ListingLine::Other
    }

    /// Parse one entry record line.
    ///
    /// Truncated or garbled lines (including empty ones) are reported as
    /// [`ListingError::MalformedInput`] rather than panicking.
    pub fn parse_entry(line: &str) -> Result<EntryRecord, ListingError> {
        let line = line.trim_end();
        if !line.starts_with('-') {
            return Err(ListingError::MalformedInput(line.to_string()));
        }
        let caps = ENTRY_RE
            .captures(line)
            .ok_or_else(|| ListingError::MalformedInput(line.to_string()))?;
        let size = parse_size(&caps["size"])
            .ok_or_else(|| ListingError::MalformedInput(line.to_string()))?;
        let path = caps["path"].trim_start();
        if path.trim_matches('/').is_empty() {
            return Err(ListingError::MalformedInput(line.to_string()));
        }
        Ok(EntryRecord::new(path, size, &caps["stamp"], &caps["attribute"]))
    }

    /// Feed the next line.
    ///
    /// Returns `Ok(Some(record))` for an accepted entry and `Ok(None)` for
    /// header lines. Fatal header signals abort with
    /// [`ListingError::ArchiveNotFound`] or [`ListingError::InvocationError`].
    pub fn feed(&mut self, line: &str) -> Result<Option<EntryRecord>, ListingError> {
        match self.phase {
            Phase::Header => match Self::classify(line) {
                ListingLine::ArchiveMissing(msg) => Err(ListingError::ArchiveNotFound(msg)),
                ListingLine::UsageError(msg) => Err(ListingError::InvocationError(msg)),
                ListingLine::FilesMarker(count) => {
                    self.expected = Some(count);
                    self.phase = Phase::Entries;
                    Ok(None)
                }
                ListingLine::Entry(_) | ListingLine::Other => Ok(None),
            },
            Phase::Entries => Self::parse_entry(line).map(Some),
        }
    }
}
