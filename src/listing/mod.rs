//! Archive listing ingestion.
//!
//! Turns the line-oriented output of `zpaqfranz l <archive> -longpath` into
//! an [`ArchiveTree`].
//!
//! ## Architecture
//!
//! - [`structures`]: [`EntryRecord`], line patterns and small path helpers
//! - [`parser`]: per-line classification and entry parsing
//! - [`tree`]: the tree itself and the [`TreeBuilder`] ingestion pass
//!
//! ## Listing Format
//!
//! ```text
//! zpaqfranz v58.10-JIT-L archiver, (C) 2023 Franco Corbelli
//! 3 files
//! - 2024-01-01 10:00:00           1.024 A     C:/data/report.txt
//! - 2024-01-01 10:00:00               0 D     C:/data/empty/
//! ```
//!
//! Entry records start with `-` and carry a timestamp, a size (possibly with
//! thousands separators), an attribute code and the path as the rest of the
//! line. Anything else is banner or status output and is ignored.

mod parser;
mod structures;
mod tree;

pub use parser::ListingParser;
pub use structures::*;
pub use tree::{ArchiveTree, BuildStats, ROOT_ID, TreeBuilder, TreeNode};
