mod local;
mod tool;

pub use local::TextListing;
pub use tool::ToolListing;

use async_trait::async_trait;

use crate::error::ListingError;

/// Trait for anything that can produce the lines of an archive listing
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Read the complete listing, one entry per line
    async fn read_lines(&self) -> Result<Vec<String>, ListingError>;

    /// Short description used in log messages
    fn describe(&self) -> String;
}
