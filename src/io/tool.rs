use async_trait::async_trait;
use log::{debug, warn};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::process::Command;

use super::ListingSource;
use crate::config::Config;
use crate::error::ListingError;

/// Listing produced by running `<tool> l <archive> -longpath`
pub struct ToolListing {
    tool: String,
    archive: PathBuf,
}

impl ToolListing {
    pub fn new(config: &Config) -> Self {
        Self {
            tool: config.tool.clone(),
            archive: config.archive.clone(),
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "l".to_string(),
            self.archive.to_string_lossy().into_owned(),
            "-longpath".to_string(),
        ]
    }
}

#[async_trait]
impl ListingSource for ToolListing {
    async fn read_lines(&self) -> Result<Vec<String>, ListingError> {
        let args = self.args();
        debug!("running {} {}", self.tool, args.join(" "));

        let output = match Command::new(&self.tool).args(&args).output().await {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ListingError::InvocationError(format!(
                    "archive tool {:?} not available: {}",
                    self.tool, e
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = Vec::new();

        // A failing tool explains itself on stderr; put that first so the
        // parser sees it while still looking at header lines
        if !output.status.success() {
            warn!("{} exited with {}", self.tool, output.status);
            let stderr = String::from_utf8_lossy(&output.stderr);
            lines.extend(stderr.lines().map(str::to_string));
        }
        lines.extend(stdout.lines().map(str::to_string));

        Ok(lines)
    }

    fn describe(&self) -> String {
        format!("{} listing of {}", self.tool, self.archive.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let listing = ToolListing::new(&Config::new("zpaqfranz", "backup.zpaq"));
        assert_eq!(listing.args(), ["l", "backup.zpaq", "-longpath"]);
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let listing = ToolListing::new(&Config::new("/nonexistent/zpaqfranz", "backup.zpaq"));
        assert!(matches!(
            listing.read_lines().await,
            Err(ListingError::InvocationError(_))
        ));
    }
}
