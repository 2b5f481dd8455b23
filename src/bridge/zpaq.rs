use async_trait::async_trait;
use log::{debug, warn};
use std::io::ErrorKind;
use tokio::fs;
use tokio::process::Command;

use super::{ExtractRequest, Extractor};
use crate::config::Config;
use crate::error::ExtractError;

/// Extractor driving `zpaqfranz x`.
pub struct ZpaqExtractor {
    tool: String,
}

impl ZpaqExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            tool: config.tool.clone(),
        }
    }

    /// Build the argument list for one request.
    ///
    /// Directories are passed with a trailing slash so the tool takes the
    /// whole subtree, and `-find` strips the leading path so the entry lands
    /// directly under the destination.
    pub fn args(request: &ExtractRequest) -> Vec<String> {
        let archive = request.archive.to_string_lossy().into_owned();
        let target = request.target().to_string_lossy().replace('\\', "/");

        if request.is_directory {
            let entry = format!("{}/", request.entry);
            let to = format!("{}/", target.trim_end_matches('/'));
            vec![
                "x".to_string(),
                archive,
                entry.clone(),
                "-to".to_string(),
                to,
                "-longpath".to_string(),
                "-find".to_string(),
                entry,
            ]
        } else {
            let destination = request.destination.to_string_lossy().replace('\\', "/");
            let to = destination.trim_end_matches('/').to_string();
            let scope = match request.entry.rfind('/') {
                Some(idx) => format!("{}/", &request.entry[..idx]),
                None => "/".to_string(),
            };
            let mut args = vec![
                "x".to_string(),
                archive,
                request.entry.clone(),
                "-to".to_string(),
                to.clone(),
                "-longpath".to_string(),
                "-find".to_string(),
                scope,
            ];
            // Extracting straight into a drive root needs -space
            if to.ends_with(':') {
                args.push("-space".to_string());
            }
            args
        }
    }
}

#[async_trait]
impl Extractor for ZpaqExtractor {
    async fn extract(&self, request: &ExtractRequest) -> Result<String, ExtractError> {
        fs::create_dir_all(&request.destination)
            .await
            .map_err(|e| ExtractError::Destination {
                path: request.destination.clone(),
                reason: e.to_string(),
            })?;

        let args = Self::args(request);
        debug!("running {} {}", self.tool, args.join(" "));

        let output = Command::new(&self.tool)
            .args(&args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ExtractError::ToolNotFound(self.tool.clone()),
                _ => ExtractError::Other(e.to_string()),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("{} failed on {}: {}", self.tool, request.entry, output.status);
            return Err(ExtractError::ToolFailed {
                status: output.status.to_string(),
                output: format!("{}{}", stderr, stdout).trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_file_args() {
        let request = ExtractRequest::new(
            Path::new("backup.zpaq"),
            "C:/data/report.txt",
            Path::new("/tmp/cache/C:/data/"),
            false,
        );
        assert_eq!(
            ZpaqExtractor::args(&request),
            [
                "x",
                "backup.zpaq",
                "C:/data/report.txt",
                "-to",
                "/tmp/cache/C:/data",
                "-longpath",
                "-find",
                "C:/data/",
            ]
        );
    }

    #[test]
    fn test_directory_args() {
        let request = ExtractRequest::new(Path::new("b.zpaq"), "C:/data", Path::new("/out"), true);
        assert_eq!(
            ZpaqExtractor::args(&request),
            ["x", "b.zpaq", "C:/data/", "-to", "/out/data/", "-longpath", "-find", "C:/data/"]
        );
    }

    #[test]
    fn test_drive_root_adds_space() {
        let request = ExtractRequest::new(Path::new("b.zpaq"), "top.txt", Path::new("D:"), false);
        let args = ZpaqExtractor::args(&request);
        assert_eq!(args[7], "/");
        assert_eq!(args.last().map(String::as_str), Some("-space"));
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = ZpaqExtractor::new(&Config::new("/nonexistent/zpaqfranz", "b.zpaq"));
        let request = ExtractRequest::new(Path::new("b.zpaq"), "f", dir.path(), false);
        assert_eq!(
            extractor.extract(&request).await,
            Err(ExtractError::ToolNotFound("/nonexistent/zpaqfranz".to_string()))
        );
    }
}
