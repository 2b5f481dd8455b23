use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::NaiveDateTime;

/// Attribute code given to the implicit tree root.
pub const ROOT_ATTRIBUTE: &str = "root";

/// Attribute code given to directories synthesized for paths never listed.
pub const PLACEHOLDER_ATTRIBUTE: &str = "unknown";

/// Timestamp layout used by `zpaqfranz l`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One entry record line:
/// `- 2024-01-01 10:00:00   1.024 A   some/path/with spaces.txt`
pub const ENTRY_PATTERN: &str = r"^-\s+(?P<stamp>[0-9]{4}-[0-9]{2}-[0-9]{2}\s[0-9]{2}:[0-9]{2}:[0-9]{2})\s+(?P<size>[0-9]+(?:[.,][0-9]+)*)\s+(?P<attribute>[A-Za-z0-9]+)\s+(?P<path>.+)$";

/// The `<N> files` line announcing how many entries follow.
pub const FILES_MARKER_PATTERN: &str = r"(?P<count>[0-9]+(?:[.,][0-9]+)*)\s+files\b";

/// The tool echoing the archive it opened: `/srv/backups/set.zpaq:`. Never
/// a fatal signal, whatever words the path happens to contain.
pub const ARCHIVE_ECHO_PATTERN: &str = r#"(?i)\.zpaq"?:\s*$"#;

/// Tool message for a missing archive; the phrase ends the line.
pub const ARCHIVE_MISSING_PATTERN: &str = r"(?i)\b(?:not found|does not exist)[.!]?\s*$";

/// Usage dump or rejected command; the keyword starts the line.
pub const USAGE_PATTERN: &str = r"(?i)^\s*(?:usage\b|unknown command\b)";

/// Parsed representation of one archive listing line.
///
/// `full_path` never carries leading, trailing or doubled slashes, so the
/// parent of a node is always its path minus the last segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Slash separated path, empty segments dropped.
    pub full_path: String,
    /// Last non-empty segment of `full_path`.
    pub name: String,
    pub size: u64,
    /// Timestamp text exactly as listed.
    pub last_modified: String,
    pub attribute: String,
    /// The raw listing path ended with `/`.
    pub listed_as_directory: bool,
}

impl EntryRecord {
    pub fn new(raw_path: &str, size: u64, last_modified: &str, attribute: &str) -> Self {
        let listed_as_directory = raw_path.ends_with('/');
        let full_path = raw_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            name: last_segment(&full_path).to_string(),
            full_path,
            size,
            last_modified: last_modified.to_string(),
            attribute: attribute.to_string(),
            listed_as_directory,
        }
    }

    /// Stand-in record for an intermediate directory the listing omitted.
    pub fn placeholder(full_path: &str) -> Self {
        Self {
            full_path: full_path.to_string(),
            name: last_segment(full_path).to_string(),
            size: 0,
            last_modified: String::new(),
            attribute: PLACEHOLDER_ATTRIBUTE.to_string(),
            listed_as_directory: false,
        }
    }

    pub fn root() -> Self {
        Self {
            full_path: String::new(),
            name: String::new(),
            size: 0,
            last_modified: String::new(),
            attribute: ROOT_ATTRIBUTE.to_string(),
            listed_as_directory: true,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.attribute == PLACEHOLDER_ATTRIBUTE && self.last_modified.is_empty()
    }

    /// Listing timestamp as a [`SystemTime`], if it parses.
    pub fn modified_time(&self) -> Option<SystemTime> {
        let stamp = NaiveDateTime::parse_from_str(&self.last_modified, TIMESTAMP_FORMAT).ok()?;
        let secs = u64::try_from(stamp.and_utc().timestamp()).ok()?;
        Some(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

impl std::fmt::Display for EntryRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{:>14} {:10}\t {}",
            self.last_modified, self.size, self.attribute, self.full_path
        )
    }
}

/// Classification of one raw listing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingLine {
    FilesMarker(u64),
    ArchiveMissing(String),
    UsageError(String),
    Entry(EntryRecord),
    Other,
}

/// Parent path of a slash separated path, `None` for a top-level segment.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("")
}

/// Parse a size that may carry thousands separators (`1.234.567`, `1,024`).
pub fn parse_size(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| !matches!(c, '.' | ',')).collect();
    digits.parse().ok()
}
