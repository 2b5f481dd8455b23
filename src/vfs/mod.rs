//! Virtual filesystem over an archive listing.
//!
//! ## Architecture
//!
//! - [`node`]: node payloads, attributes, security descriptors
//! - [`store`]: the path-keyed node table
//! - [`cache`]: byte budget over materialized entries
//! - [`driver`]: [`ArchiveFileSystem`], the operation surface
//!
//! Paths are absolute and `/`-separated. The archive entry `C:/data/x.txt`
//! is served at `/C:/data/x.txt`; the archive root is `/`.

mod cache;
mod driver;
mod node;
pub mod path;
mod store;

pub use cache::{CacheLedger, CachedEntry};
pub use driver::{ArchiveFileSystem, MountState, OpenedNode, VolumeInfo};
pub use node::{
    ALLOCATION_UNIT, BasicInfo, DEFAULT_SDDL, FileAttributes, FileData, FileInfo, FileTimes,
    NodeKind, SecurityDescriptor, VfsNode,
};
pub use store::{DirEntry, NodeStore};
