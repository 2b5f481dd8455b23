//! Path-indexed table of virtual filesystem nodes.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use log::debug;

use crate::error::{FsError, Result};
use crate::listing::{ArchiveTree, EntryRecord, ROOT_ID};

use super::node::{BasicInfo, FileAttributes, FileInfo, SecurityDescriptor, VfsNode};
use super::path;

/// One row of a directory enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub info: FileInfo,
}

/// All nodes of one mounted volume, keyed by absolute virtual path.
///
/// A node is only ever inserted below an existing directory, so every
/// non-root path always has its parent in the table.
#[derive(Debug)]
pub struct NodeStore {
    nodes: BTreeMap<String, VfsNode>,
    read_only: bool,
    next_index: u64,
}

impl NodeStore {
    pub fn new(security: SecurityDescriptor) -> Self {
        let root = VfsNode::directory(
            path::ROOT,
            FileAttributes::DIRECTORY,
            Arc::new(security),
            Some(EntryRecord::root()),
        );
        let mut nodes = BTreeMap::new();
        nodes.insert(path::ROOT.to_string(), root);
        Self {
            nodes,
            read_only: false,
            next_index: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Descriptor shared by nodes created without one of their own.
    pub fn root_security(&self) -> Arc<SecurityDescriptor> {
        self.nodes[path::ROOT].security.clone()
    }

    pub fn lookup(&self, path: &str) -> Result<&VfsNode> {
        self.nodes
            .get(path)
            .ok_or_else(|| FsError::NameNotFound(path.to_string()))
    }

    fn lookup_mut(&mut self, path: &str) -> Result<&mut VfsNode> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| FsError::NameNotFound(path.to_string()))
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(FsError::ReadOnlyViolation);
        }
        Ok(())
    }

    /// Insert a new node at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::ReadOnlyViolation`] in read-only mode
    /// - [`FsError::NameNotFound`] if the parent does not exist
    /// - [`FsError::NotADirectory`] if the parent is a file
    /// - [`FsError::NameCollision`] if `path` is taken
    pub fn create(
        &mut self,
        path: &str,
        is_directory: bool,
        attributes: FileAttributes,
        security: Option<Arc<SecurityDescriptor>>,
        allocation_size: u64,
        record: Option<EntryRecord>,
    ) -> Result<&VfsNode> {
        self.check_writable()?;

        let parent = path::parent(path).ok_or_else(|| FsError::NameCollision(path.to_string()))?;
        match self.nodes.get(parent) {
            None => return Err(FsError::NameNotFound(parent.to_string())),
            Some(node) if !node.is_directory() => {
                return Err(FsError::NotADirectory(parent.to_string()));
            }
            Some(_) => {}
        }
        if self.nodes.contains_key(path) {
            return Err(FsError::NameCollision(path.to_string()));
        }

        let security = security.unwrap_or_else(|| self.root_security());
        let mut node = if is_directory {
            VfsNode::directory(path, attributes, security, record)
        } else {
            VfsNode::file(path, attributes, security, record, allocation_size)
        };
        node.index_number = self.next_index;
        self.next_index += 1;

        Ok(self.nodes.entry(path.to_string()).or_insert(node))
    }

    /// Apply a partial attribute/time update.
    pub fn set_attributes(&mut self, path: &str, info: &BasicInfo) -> Result<FileInfo> {
        self.check_writable()?;
        let node = self.lookup_mut(path)?;
        node.set_basic_info(info);
        Ok(node.file_info())
    }

    /// Change the logical size, or the allocation size when
    /// `is_allocation_size` is set.
    pub fn resize(&mut self, path: &str, new_size: u64, is_allocation_size: bool) -> Result<FileInfo> {
        self.check_writable()?;
        let node = self.lookup_mut(path)?;
        let data = node.file_data_mut()?;
        if is_allocation_size {
            data.set_allocation_size(new_size);
        } else {
            data.set_file_size(new_size);
        }
        Ok(node.file_info())
    }

    /// Direct children of the directory at `path`, sorted by name.
    fn children(&self, dir: &str) -> impl Iterator<Item = &VfsNode> {
        let prefix = path::child_prefix(dir);
        let start = prefix.clone();
        let prefix_len = prefix.len();
        self.nodes
            .range::<str, _>((Bound::Excluded(start.as_str()), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .filter(move |(key, _)| !key[prefix_len..].contains('/'))
            .map(|(_, node)| node)
    }

    pub fn has_children(&self, dir: &str) -> bool {
        self.children(dir).next().is_some()
    }

    /// Enumerate a directory.
    ///
    /// Non-root directories start with `.` and `..`. With a `marker`, only
    /// entries after the one named `marker` are returned; an unknown marker
    /// yields nothing.
    pub fn list_children(&self, dir: &str, marker: Option<&str>) -> Result<Vec<DirEntry>> {
        let node = self.lookup(dir)?;
        if !node.is_directory() {
            return Err(FsError::NotADirectory(dir.to_string()));
        }

        let mut entries = Vec::new();
        if let Some(parent) = path::parent(dir) {
            let parent_node = self.lookup(parent)?;
            entries.push(DirEntry {
                name: ".".to_string(),
                info: node.file_info(),
            });
            entries.push(DirEntry {
                name: "..".to_string(),
                info: parent_node.file_info(),
            });
        }

        let mut children: Vec<DirEntry> = self
            .children(dir)
            .map(|child| DirEntry {
                name: child.name().to_string(),
                info: child.file_info(),
            })
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        entries.extend(children);

        let Some(marker) = marker else {
            return Ok(entries);
        };
        let position = entries.iter().position(|e| e.name == marker);
        match position {
            Some(idx) => Ok(entries.split_off(idx + 1)),
            None => Ok(Vec::new()),
        }
    }

    /// Read stored bytes of a file node.
    pub fn read(&self, path: &str, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.lookup(path)?.file_data()?.read(offset, length)
    }

    /// Mirror an [`ArchiveTree`] into the store.
    ///
    /// Tree directories become directory nodes, everything else becomes a
    /// file node sized from its listing record. Returns the number of nodes
    /// added.
    pub fn flatten(&mut self, tree: &ArchiveTree) -> Result<usize> {
        let security = self.root_security();
        let mut added = 0;
        for node in tree.depth_first() {
            if node.id == ROOT_ID {
                continue;
            }
            let vpath = path::from_archive(&node.id);
            if tree.is_directory(&node.id) {
                self.create(
                    &vpath,
                    true,
                    FileAttributes::DIRECTORY,
                    Some(security.clone()),
                    0,
                    Some(node.record.clone()),
                )?;
            } else {
                self.create(
                    &vpath,
                    false,
                    FileAttributes::NORMAL,
                    Some(security.clone()),
                    0,
                    Some(node.record.clone()),
                )?;
                self.lookup_mut(&vpath)?
                    .file_data_mut()?
                    .set_file_size(node.record.size);
            }
            added += 1;
        }
        debug!("flattened {added} tree nodes into the node store");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::TreeBuilder;

    fn store() -> NodeStore {
        NodeStore::new(SecurityDescriptor::default())
    }

    fn mkdir(store: &mut NodeStore, path: &str) {
        store
            .create(path, true, FileAttributes::DIRECTORY, None, 0, None)
            .unwrap();
    }

    fn mkfile(store: &mut NodeStore, path: &str) {
        store
            .create(path, false, FileAttributes::NORMAL, None, 0, None)
            .unwrap();
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_create_errors() {
        let mut store = store();
        mkdir(&mut store, "/a");
        mkfile(&mut store, "/a/f");

        assert!(matches!(
            store.create("/a", true, FileAttributes::DIRECTORY, None, 0, None),
            Err(FsError::NameCollision(_))
        ));
        assert!(matches!(
            store.create("/a/f/g", false, FileAttributes::NORMAL, None, 0, None),
            Err(FsError::NotADirectory(_))
        ));
        assert!(matches!(
            store.create("/missing/g", false, FileAttributes::NORMAL, None, 0, None),
            Err(FsError::NameNotFound(_))
        ));
    }

    #[test]
    fn test_shared_security() {
        let mut store = store();
        mkfile(&mut store, "/f");
        let file = store.lookup("/f").unwrap();
        assert!(Arc::ptr_eq(&file.security, &store.root_security()));
    }

    #[test]
    fn test_read_only_blocks_mutation() {
        let mut store = store();
        mkfile(&mut store, "/f");
        store.set_read_only(true);

        assert!(matches!(
            store.create("/g", false, FileAttributes::NORMAL, None, 0, None),
            Err(FsError::ReadOnlyViolation)
        ));
        assert!(matches!(store.resize("/f", 10, false), Err(FsError::ReadOnlyViolation)));
        assert!(matches!(
            store.set_attributes("/f", &BasicInfo::default()),
            Err(FsError::ReadOnlyViolation)
        ));

        store.set_read_only(false);
        assert_eq!(store.resize("/f", 10, false).unwrap().file_size, 10);
    }

    #[test]
    fn test_list_children_sorted_with_dots() {
        let mut store = store();
        mkdir(&mut store, "/d");
        mkfile(&mut store, "/d/b");
        mkfile(&mut store, "/d/a");
        mkdir(&mut store, "/d/c");
        mkfile(&mut store, "/d/c/deep");
        mkfile(&mut store, "/d-sibling");

        let entries = store.list_children("/d", None).unwrap();
        assert_eq!(names(&entries), [".", "..", "a", "b", "c"]);

        let root = store.list_children("/", None).unwrap();
        assert_eq!(names(&root), ["d", "d-sibling"]);
    }

    #[test]
    fn test_list_children_marker() {
        let mut store = store();
        mkdir(&mut store, "/d");
        mkfile(&mut store, "/d/a");
        mkfile(&mut store, "/d/b");

        assert_eq!(names(&store.list_children("/d", Some("a")).unwrap()), ["b"]);
        assert!(store.list_children("/d", Some("b")).unwrap().is_empty());
        assert!(store.list_children("/d", Some("zzz")).unwrap().is_empty());
        assert!(matches!(
            store.list_children("/d/a", None),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_set_attributes_partial() {
        let mut store = store();
        mkfile(&mut store, "/f");
        let before = store.lookup("/f").unwrap().file_info();

        let info = BasicInfo {
            attributes: Some(FileAttributes::INVALID),
            last_write: Some(std::time::UNIX_EPOCH),
            ..Default::default()
        };
        let after = store.set_attributes("/f", &info).unwrap();
        assert_eq!(after.attributes, before.attributes);
        assert_eq!(after.times.last_write, std::time::UNIX_EPOCH);
        assert_eq!(after.times.creation, before.times.creation);
    }

    #[test]
    fn test_resize_round_trip_zeroes_tail() {
        let mut store = store();
        mkfile(&mut store, "/f");
        store.resize("/f", 10_000, false).unwrap();
        store.resize("/f", 100, false).unwrap();
        let info = store.resize("/f", 10_000, false).unwrap();
        assert_eq!(info.file_size, 10_000);

        let bytes = store.read("/f", 100, 10_000).unwrap();
        assert_eq!(bytes.len(), 9_900);
        assert!(bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_flatten_mirrors_root_children() {
        let mut tree = ArchiveTree::new();
        TreeBuilder::build(
            &mut tree,
            [
                "3 files",
                "- 2024-01-01 10:00:00 1.024 A b/c.txt",
                "- 2024-01-01 10:00:00 7 A a.txt",
                "- 2024-01-01 10:00:00 0 D empty/",
            ],
        )
        .unwrap();

        let mut store = store();
        assert_eq!(store.flatten(&tree).unwrap(), tree.len() - 1);

        let mut expected: Vec<String> = tree.children(ROOT_ID).map(|n| n.label.clone()).collect();
        expected.sort();
        let listed: Vec<String> = store
            .list_children("/", None)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(listed, expected);

        assert!(store.lookup("/b").unwrap().is_directory());
        assert!(store.lookup("/empty").unwrap().is_directory());
        assert_eq!(store.lookup("/b/c.txt").unwrap().file_size(), 1024);
    }
}
