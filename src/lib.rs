//! # zpaqfs
//!
//! Browse zpaq archives as a read-only virtual filesystem.
//!
//! The archive tool (`zpaqfranz` by default) is the only thing that ever
//! touches archive bytes. This crate parses its listing output into a tree,
//! serves that tree through filesystem-style operations, and asks the tool
//! to extract an entry the first time somebody reads it.
//!
//! ## Features
//!
//! - Tolerant listing ingestion: banners, status lines and malformed entries
//!   are skipped, missing parent directories are synthesized
//! - Path-keyed node store with sorted, resumable directory enumeration
//! - Extract-on-read for files below a size ceiling, with one extraction per
//!   path in flight and a bounded wait
//! - Explicit extraction of large files and whole directory subtrees
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zpaqfs::{ArchiveFileSystem, ArchiveTree, Config, ListingSource, ToolListing, TreeBuilder, ZpaqExtractor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("zpaqfranz", "backup.zpaq");
//!
//!     // Build the tree from the tool's listing
//!     let lines = ToolListing::new(&config).read_lines().await?;
//!     let mut tree = ArchiveTree::with_root_label("backup.zpaq");
//!     TreeBuilder::build(&mut tree, &lines)?;
//!
//!     // Serve it
//!     let fs = ArchiveFileSystem::new(config.clone(), Arc::new(ZpaqExtractor::new(&config)))?;
//!     fs.populate(&tree).await?;
//!
//!     let file = fs.open("/C:/data/report.txt").await?;
//!     let head = fs.read(&file, 0, 64).await?;
//!     println!("{}", String::from_utf8_lossy(&head));
//!
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod listing;
pub mod vfs;

pub use bridge::{ExtractRequest, Extractor, ZpaqExtractor};
pub use cli::Cli;
pub use config::{Config, ExtractPolicy};
pub use error::{ExtractError, FsError, ListingError};
pub use io::{ListingSource, TextListing, ToolListing};
pub use listing::{ArchiveTree, EntryRecord, TreeBuilder, TreeNode};
pub use vfs::{ArchiveFileSystem, MountState, OpenedNode};
