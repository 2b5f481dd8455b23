use super::ListingSource;
use crate::error::ListingError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Listing previously saved to a text file (`zpaqfranz l a.zpaq > a.txt`)
pub struct TextListing {
    path: PathBuf,
}

impl TextListing {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ListingSource for TextListing {
    async fn read_lines(&self) -> Result<Vec<String>, ListingError> {
        let bytes = tokio::fs::read(&self.path).await?;
        // Listings of archives made on other systems are not always valid UTF-8
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.lines().map(str::to_string).collect())
    }

    fn describe(&self) -> String {
        format!("listing file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_lines_lossily() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"1 files\n- 2024-01-01 10:00:00 1 A caf\xe9.txt\n")
            .unwrap();

        let lines = TextListing::new(file.path()).read_lines().await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "1 files");
        assert!(lines[1].starts_with("- 2024-01-01"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = TextListing::new(Path::new("/nonexistent/listing.txt"))
            .read_lines()
            .await;
        assert!(matches!(result, Err(ListingError::Io(_))));
    }
}
