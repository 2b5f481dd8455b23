//! File and directory objects held by the [`NodeStore`](super::NodeStore).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{FsError, Result};
use crate::listing::EntryRecord;

/// Granularity files grow their allocation in.
pub const ALLOCATION_UNIT: u64 = 4096;

/// Owner/group Administrators, full access for System, Administrators and
/// Everyone.
pub const DEFAULT_SDDL: &str = "O:BAG:BAD:P(A;;FA;;;SY)(A;;FA;;;BA)(A;;FA;;;WD)";

/// Windows style file attribute bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileAttributes(pub u32);

impl FileAttributes {
    pub const READONLY: Self = Self(0x0000_0001);
    pub const DIRECTORY: Self = Self(0x0000_0010);
    pub const ARCHIVE: Self = Self(0x0000_0020);
    pub const NORMAL: Self = Self(0x0000_0080);
    /// Sentinel meaning "leave attributes unchanged".
    pub const INVALID: Self = Self(0xFFFF_FFFF);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for FileAttributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FileAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileAttributes({:#x})", self.0)
    }
}

/// Security descriptor in SDDL form. Nodes share one instance through `Arc`
/// unless a caller supplies its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDescriptor {
    sddl: String,
}

impl SecurityDescriptor {
    pub fn from_sddl(sddl: &str) -> Self {
        Self {
            sddl: sddl.to_string(),
        }
    }

    pub fn sddl(&self) -> &str {
        &self.sddl
    }

    pub fn size(&self) -> usize {
        self.sddl.len()
    }
}

impl Default for SecurityDescriptor {
    fn default() -> Self {
        Self::from_sddl(DEFAULT_SDDL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    pub creation: SystemTime,
    pub last_access: SystemTime,
    pub last_write: SystemTime,
    pub change: SystemTime,
}

impl FileTimes {
    pub fn now() -> Self {
        let now = SystemTime::now();
        Self {
            creation: now,
            last_access: now,
            last_write: now,
            change: now,
        }
    }

    /// Times for a node backed by `record`: the listed modification time
    /// when there is one, otherwise now.
    fn for_record(record: Option<&EntryRecord>) -> Self {
        let mut times = Self::now();
        if let Some(modified) = record.and_then(EntryRecord::modified_time) {
            times.last_write = modified;
            times.change = modified;
        }
        times
    }
}

/// Metadata returned by info queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub attributes: FileAttributes,
    pub allocation_size: u64,
    pub file_size: u64,
    pub times: FileTimes,
    pub index_number: u64,
}

/// Partial update for [`VfsNode::set_basic_info`]. `None` fields stay as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicInfo {
    pub attributes: Option<FileAttributes>,
    pub creation: Option<SystemTime>,
    pub last_access: Option<SystemTime>,
    pub last_write: Option<SystemTime>,
    pub change: Option<SystemTime>,
}

/// In-memory body of a file node.
///
/// Only bytes actually stored are kept in `data`; anything between
/// `data.len()` and `file_size` reads as zero. Listing-backed files therefore
/// cost nothing until written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileData {
    data: Vec<u8>,
    allocation_size: u64,
    file_size: u64,
}

impl FileData {
    pub fn new(allocation_size: u64) -> Self {
        Self {
            data: Vec::new(),
            allocation_size,
            file_size: 0,
        }
    }

    #[cfg(test)]
    pub fn with_contents(bytes: &[u8]) -> Self {
        let mut file = Self::new(0);
        file.set_file_size(bytes.len() as u64);
        file.data = bytes.to_vec();
        file
    }

    pub fn allocation_size(&self) -> u64 {
        self.allocation_size
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn set_allocation_size(&mut self, allocation_size: u64) {
        if allocation_size < self.data.len() as u64 {
            self.data.truncate(allocation_size as usize);
        }
        self.allocation_size = allocation_size;
        self.file_size = self.file_size.min(allocation_size);
    }

    /// Grow the allocation to whole units covering `file_size`.
    fn adapt_allocation_size(&mut self, file_size: u64) {
        let units = file_size.div_ceil(ALLOCATION_UNIT);
        self.set_allocation_size(units * ALLOCATION_UNIT);
    }

    /// Set the logical size. Shrinking discards the cut-off tail so a later
    /// grow exposes zeros, not stale bytes.
    pub fn set_file_size(&mut self, file_size: u64) {
        if file_size < self.file_size && file_size < self.data.len() as u64 {
            self.data.truncate(file_size as usize);
        }
        if file_size > self.allocation_size {
            self.adapt_allocation_size(file_size);
        }
        self.file_size = file_size;
    }

    pub fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        if offset >= self.file_size {
            return Err(FsError::EndOfRange {
                offset,
                size: self.file_size,
            });
        }
        let end = self.file_size.min(offset.saturating_add(length as u64));
        let mut out = vec![0u8; (end - offset) as usize];
        let stored_end = end.min(self.data.len() as u64);
        if offset < stored_end {
            out[..(stored_end - offset) as usize]
                .copy_from_slice(&self.data[offset as usize..stored_end as usize]);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File(FileData),
}

/// One file or directory in the virtual volume.
#[derive(Debug, Clone)]
pub struct VfsNode {
    /// Absolute virtual path, `/` for the root.
    pub path: String,
    pub attributes: FileAttributes,
    pub security: Arc<SecurityDescriptor>,
    pub times: FileTimes,
    pub index_number: u64,
    /// Listing record this node was built from.
    pub record: Option<EntryRecord>,
    pub kind: NodeKind,
}

impl VfsNode {
    pub fn directory(
        path: &str,
        attributes: FileAttributes,
        security: Arc<SecurityDescriptor>,
        record: Option<EntryRecord>,
    ) -> Self {
        Self {
            path: path.to_string(),
            attributes: attributes | FileAttributes::DIRECTORY,
            security,
            times: FileTimes::for_record(record.as_ref()),
            index_number: 0,
            record,
            kind: NodeKind::Directory,
        }
    }

    pub fn file(
        path: &str,
        attributes: FileAttributes,
        security: Arc<SecurityDescriptor>,
        record: Option<EntryRecord>,
        allocation_size: u64,
    ) -> Self {
        Self {
            path: path.to_string(),
            attributes: attributes.without(FileAttributes::DIRECTORY) | FileAttributes::ARCHIVE,
            security,
            times: FileTimes::for_record(record.as_ref()),
            index_number: 0,
            record,
            kind: NodeKind::File(FileData::new(allocation_size)),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    /// Last path segment; empty for the root.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    pub fn file_size(&self) -> u64 {
        match &self.kind {
            NodeKind::Directory => 0,
            NodeKind::File(data) => data.file_size(),
        }
    }

    pub fn file_info(&self) -> FileInfo {
        let (allocation_size, file_size) = match &self.kind {
            NodeKind::Directory => (0, 0),
            NodeKind::File(data) => (data.allocation_size(), data.file_size()),
        };
        FileInfo {
            attributes: self.attributes,
            allocation_size,
            file_size,
            times: self.times,
            index_number: self.index_number,
        }
    }

    pub fn set_basic_info(&mut self, info: &BasicInfo) {
        if let Some(attributes) = info.attributes.filter(|a| *a != FileAttributes::INVALID) {
            self.attributes = attributes;
        }
        if let Some(t) = info.creation {
            self.times.creation = t;
        }
        if let Some(t) = info.last_access {
            self.times.last_access = t;
        }
        if let Some(t) = info.last_write {
            self.times.last_write = t;
        }
        if let Some(t) = info.change {
            self.times.change = t;
        }
    }

    pub fn file_data_mut(&mut self) -> Result<&mut FileData> {
        match &mut self.kind {
            NodeKind::File(data) => Ok(data),
            NodeKind::Directory => Err(FsError::NotAFile(self.path.clone())),
        }
    }

    pub fn file_data(&self) -> Result<&FileData> {
        match &self.kind {
            NodeKind::File(data) => Ok(data),
            NodeKind::Directory => Err(FsError::NotAFile(self.path.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes() {
        let attrs = FileAttributes::NORMAL | FileAttributes::ARCHIVE;
        assert!(attrs.contains(FileAttributes::ARCHIVE));
        assert!(!attrs.contains(FileAttributes::DIRECTORY));
        assert_eq!(attrs.without(FileAttributes::NORMAL), FileAttributes::ARCHIVE);
    }

    #[test]
    fn test_grow_rounds_allocation() {
        let mut file = FileData::new(0);
        file.set_file_size(10_000);
        assert_eq!(file.file_size(), 10_000);
        assert_eq!(file.allocation_size(), 12_288);
    }

    #[test]
    fn test_shrink_then_grow_reads_zeros() {
        let mut file = FileData::with_contents(&[0xAB; 10_000]);
        file.set_file_size(100);
        file.set_file_size(10_000);

        let bytes = file.read(0, 10_000).unwrap();
        assert_eq!(bytes.len(), 10_000);
        assert!(bytes[..100].iter().all(|b| *b == 0xAB));
        assert!(bytes[100..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_allocation_shrink_clamps_size() {
        let mut file = FileData::with_contents(&[1; 5000]);
        file.set_allocation_size(4096);
        assert_eq!(file.file_size(), 4096);
        assert_eq!(file.read(4000, 500).unwrap().len(), 96);
    }

    #[test]
    fn test_read_past_end() {
        let file = FileData::with_contents(b"hello");
        assert_eq!(file.read(1, 3).unwrap(), b"ell");
        assert!(matches!(
            file.read(5, 1),
            Err(FsError::EndOfRange { offset: 5, size: 5 })
        ));
    }

    #[test]
    fn test_node_kinds() {
        let security = Arc::new(SecurityDescriptor::default());
        let dir = VfsNode::directory("/a", FileAttributes::NORMAL, security.clone(), None);
        assert!(dir.attributes.contains(FileAttributes::DIRECTORY));
        assert_eq!(dir.file_info().allocation_size, 0);
        assert_eq!(dir.name(), "a");

        let file = VfsNode::file(
            "/a/f",
            FileAttributes::DIRECTORY,
            security,
            None,
            0,
        );
        assert!(!file.attributes.contains(FileAttributes::DIRECTORY));
        assert!(file.attributes.contains(FileAttributes::ARCHIVE));
    }

    #[test]
    fn test_times_from_record() {
        let record = EntryRecord::new("f", 1, "2001-02-03 04:05:06", "A");
        let security = Arc::new(SecurityDescriptor::default());
        let node = VfsNode::file("/f", FileAttributes::NORMAL, security, Some(record.clone()), 0);
        assert_eq!(Some(node.times.last_write), record.modified_time());
    }
}
