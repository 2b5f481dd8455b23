//! Hierarchical view of a flat archive listing.
//!
//! Nodes are keyed by their full archive path. The root has the empty path
//! and every other node hangs off the node whose path is its own minus the
//! last segment. Intermediate directories the listing never mentions get a
//! placeholder [`EntryRecord`] until (and unless) a real record shows up.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info};

use crate::error::ListingError;

use super::parser::ListingParser;
use super::structures::{EntryRecord, parent_path};

/// Identity of the root node.
pub const ROOT_ID: &str = "";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub label: String,
    pub record: EntryRecord,
    pub parent: Option<String>,
    pub children: BTreeSet<String>,
}

/// Archive contents as a tree of [`TreeNode`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveTree {
    nodes: HashMap<String, TreeNode>,
}

impl Default for ArchiveTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveTree {
    pub fn new() -> Self {
        Self::with_root_label("/")
    }

    /// Create an empty tree whose root displays as `label`.
    pub fn with_root_label(label: &str) -> Self {
        let root = TreeNode {
            id: ROOT_ID.to_string(),
            label: label.to_string(),
            record: EntryRecord::root(),
            parent: None,
            children: BTreeSet::new(),
        };
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_ID.to_string(), root);
        Self { nodes }
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[ROOT_ID]
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.values()
    }

    pub fn parent(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)?.parent.as_deref().and_then(|p| self.nodes.get(p))
    }

    pub fn children(&self, id: &str) -> impl Iterator<Item = &TreeNode> {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .filter_map(|child| self.nodes.get(child))
    }

    /// A node is a directory if it is the root, has children, or was listed
    /// with a trailing slash.
    pub fn is_directory(&self, id: &str) -> bool {
        self.nodes.get(id).is_some_and(|node| {
            node.id == ROOT_ID || !node.children.is_empty() || node.record.listed_as_directory
        })
    }

    /// Display label of a node.
    pub fn label(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|node| node.label.as_str())
    }

    /// Entry record carried by a node.
    pub fn payload(&self, id: &str) -> Option<&EntryRecord> {
        self.nodes.get(id).map(|node| &node.record)
    }

    /// Children ordered for display: directories first, then by
    /// case-insensitive name.
    pub fn sorted_children(&self, id: &str) -> Vec<&TreeNode> {
        let mut children: Vec<&TreeNode> = self.children(id).collect();
        children.sort_by_cached_key(|node| (!self.is_directory(&node.id), node.label.to_lowercase()));
        children
    }

    /// All nodes in depth-first order starting at the root.
    pub fn depth_first(&self) -> Vec<&TreeNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev().filter_map(|c| self.nodes.get(c)));
        }
        out
    }

    /// Insert a record, creating any missing ancestors first.
    pub fn insert(&mut self, record: EntryRecord) {
        if let Some(parent) = parent_path(&record.full_path) {
            self.ensure_directory(parent);
        }
        self.attach(record);
    }

    /// Make sure `path` and all its ancestors exist.
    ///
    /// Walks upwards until an existing node is found, then creates the
    /// missing segments top-down.
    fn ensure_directory(&mut self, path: &str) {
        let mut missing = Vec::new();
        let mut cursor = Some(path);
        while let Some(p) = cursor {
            if self.nodes.contains_key(p) {
                break;
            }
            missing.push(p.to_string());
            cursor = parent_path(p);
        }
        for p in missing.into_iter().rev() {
            self.attach(EntryRecord::placeholder(&p));
        }
    }

    /// Link a record whose parent already exists. An existing node keeps its
    /// identity and children and only has its payload replaced.
    fn attach(&mut self, record: EntryRecord) {
        if let Some(existing) = self.nodes.get_mut(&record.full_path) {
            let listed_as_directory =
                existing.record.listed_as_directory || record.listed_as_directory;
            existing.record = record;
            existing.record.listed_as_directory = listed_as_directory;
            return;
        }

        let parent = parent_path(&record.full_path).unwrap_or(ROOT_ID).to_string();
        let id = record.full_path.clone();
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.insert(id.clone());
        }
        self.nodes.insert(
            id.clone(),
            TreeNode {
                id,
                label: record.name.clone(),
                record,
                parent: Some(parent),
                children: BTreeSet::new(),
            },
        );
    }
}

/// Counters from one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Count announced by the `<N> files` line.
    pub expected: Option<u64>,
    pub accepted: u64,
    pub skipped: u64,
}

/// Feeds listing lines into an [`ArchiveTree`].
pub struct TreeBuilder {
    parser: ListingParser,
    /// Parent directory of the previous record; consecutive records usually
    /// share it, which spares the ancestor walk.
    known_dir: Option<String>,
    stats: BuildStats,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            parser: ListingParser::new(),
            known_dir: None,
            stats: BuildStats::default(),
        }
    }

    /// Ingest all `lines` into `tree`.
    ///
    /// Malformed lines are counted and skipped. Only a fatal header signal
    /// (missing archive, usage error) aborts the pass.
    pub fn build<I, S>(tree: &mut ArchiveTree, lines: I) -> Result<BuildStats, ListingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = Self::new();
        for line in lines {
            builder.feed(tree, line.as_ref())?;
        }
        Ok(builder.finish())
    }

    pub fn feed(&mut self, tree: &mut ArchiveTree, line: &str) -> Result<(), ListingError> {
        match self.parser.feed(line) {
            Ok(Some(record)) => {
                self.insert(tree, record);
                self.stats.accepted += 1;
                if self.stats.accepted % 100_000 == 0 {
                    debug!(
                        "ingested {} of {} entries",
                        self.stats.accepted,
                        self.stats.expected.unwrap_or(0)
                    );
                }
            }
            Ok(None) => {
                if self.stats.expected.is_none() {
                    if let Some(expected) = self.parser.expected_entries() {
                        info!("listing announces {expected} files");
                        self.stats.expected = Some(expected);
                    }
                }
            }
            Err(ListingError::MalformedInput(_)) => self.stats.skipped += 1,
            Err(e) => return Err(e),
        }
        Ok(())
    }

    pub fn finish(self) -> BuildStats {
        debug!(
            "listing ingested: {} accepted, {} skipped",
            self.stats.accepted, self.stats.skipped
        );
        self.stats
    }

    fn insert(&mut self, tree: &mut ArchiveTree, record: EntryRecord) {
        let parent = parent_path(&record.full_path).map(str::to_string);
        match parent.as_deref() {
            Some(p) if self.known_dir.as_deref() == Some(p) && tree.contains(p) => {
                tree.attach(record)
            }
            _ => tree.insert(record),
        }
        self.known_dir = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(lines: &[&str]) -> ArchiveTree {
        let mut tree = ArchiveTree::new();
        TreeBuilder::build(&mut tree, lines.iter().copied()).unwrap();
        tree
    }

    #[test]
    fn test_synthesizes_ancestors() {
        let tree = build(&["1 files", "- 2024-01-01 10:00:00   1024 A   a/b/c.txt"]);
        assert_eq!(tree.len(), 4);
        assert!(tree.payload("a").unwrap().is_placeholder());
        assert!(tree.payload("a/b").unwrap().is_placeholder());
        assert_eq!(tree.payload("a/b/c.txt").unwrap().size, 1024);
        assert_eq!(tree.parent("a/b/c.txt").unwrap().id, "a/b");
        assert_eq!(tree.parent("a").unwrap().id, ROOT_ID);
        assert!(tree.is_directory("a"));
        assert!(!tree.is_directory("a/b/c.txt"));
    }

    #[test]
    fn test_explicit_directory_replaces_placeholder() {
        let tree = build(&[
            "2 files",
            "- 2024-01-01 10:00:00 10 A x/y.txt",
            "- 2024-01-01 10:00:00 0 DIR x",
        ]);
        let x = tree.get("x").unwrap();
        assert_eq!(x.record.attribute, "DIR");
        assert!(!x.record.is_placeholder());
        assert_eq!(x.children.len(), 1);
        assert!(x.children.contains("x/y.txt"));
        assert!(tree.is_directory("x"));
    }

    #[test]
    fn test_directory_stays_directory() {
        let tree = build(&[
            "3 files",
            "- 2024-01-01 10:00:00 0 D d/",
            "- 2024-01-01 10:00:00 5 A d/f",
            "- 2024-01-01 10:00:00 99 A d",
        ]);
        assert!(tree.is_directory("d"));
        assert_eq!(tree.payload("d").unwrap().size, 99);
    }

    #[test]
    fn test_root_level_entry() {
        let tree = build(&["1 files", "- 2024-01-01 10:00:00 3 A top.txt"]);
        assert_eq!(tree.parent("top.txt").unwrap().id, ROOT_ID);
        assert!(tree.root().children.contains("top.txt"));
    }

    #[test]
    fn test_sorted_children_dirs_first() {
        let tree = build(&[
            "3 files",
            "- 2024-01-01 10:00:00 1 A b.txt",
            "- 2024-01-01 10:00:00 1 A Zeta/inner",
            "- 2024-01-01 10:00:00 1 A a.txt",
        ]);
        let labels: Vec<&str> = tree
            .sorted_children(ROOT_ID)
            .iter()
            .map(|n| n.label.as_str())
            .collect();
        assert_eq!(labels, ["Zeta", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_depth_first_visits_everything() {
        let tree = build(&["2 files", "- 2024-01-01 10:00:00 1 A a/b/c", "- 2024-01-01 10:00:00 1 A d"]);
        let order: Vec<&str> = tree.depth_first().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, ["", "a", "a/b", "a/b/c", "d"]);
    }

    #[test]
    fn test_fatal_header_aborts() {
        let mut tree = ArchiveTree::new();
        let result = TreeBuilder::build(&mut tree, ["zpaqfranz v58", "archive x.zpaq not found"]);
        assert!(matches!(result, Err(ListingError::ArchiveNotFound(_))));
    }

    #[test]
    fn test_stats() {
        let mut tree = ArchiveTree::new();
        let stats = TreeBuilder::build(
            &mut tree,
            ["banner", "2 files", "- 2024-01-01 10:00:00 1 A f", "noise", ""],
        )
        .unwrap();
        assert_eq!(stats.expected, Some(2));
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.skipped, 2);
    }
}
