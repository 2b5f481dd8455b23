use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{
    Config, DEFAULT_CACHE_BUDGET, DEFAULT_CACHE_CEILING, DEFAULT_EXTRACTION_TIMEOUT, ExtractPolicy,
};
use crate::error::FsError;

#[derive(Parser, Debug)]
#[command(name = "zpaqfs")]
#[command(version)]
#[command(about = "Browse zpaq archives as a virtual filesystem", long_about = None)]
#[command(after_help = "Examples:\n  \
  zpaqfs -l backup.zpaq                      show the archive as a tree\n  \
  zpaqfs -x C:/data/report.txt -d out backup.zpaq   extract one entry into out/\n  \
  zpaqfs -b --listing saved.txt backup.zpaq  browse using a saved listing")]
pub struct Cli {
    /// zpaq archive
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Read the listing from a saved text file instead of running the tool
    #[arg(long, value_name = "FILE")]
    pub listing: Option<PathBuf>,

    /// Archive tool command
    #[arg(long, env = "ZPAQFS_TOOL", default_value = "zpaqfranz")]
    pub tool: String,

    /// Show the archive contents as a tree
    #[arg(short = 'l')]
    pub list: bool,

    /// Extract ENTRY (a file or a directory) from the archive
    #[arg(short = 'x', value_name = "ENTRY")]
    pub extract: Option<String>,

    /// Extract into DIR
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub extract_dir: PathBuf,

    /// Browse the mounted archive interactively
    #[arg(short = 'b')]
    pub browse: bool,

    /// Directory for files extracted on read
    #[arg(short = 'c', long = "cache-dir", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Files of this size or more are never extracted on read
    #[arg(short = 's', long = "ceiling", value_name = "BYTES", default_value_t = DEFAULT_CACHE_CEILING)]
    pub cache_ceiling: u64,

    /// Bytes of extracted files kept before the oldest are evicted
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CACHE_BUDGET)]
    pub cache_budget: u64,

    /// Seconds a read waits for an extraction
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_EXTRACTION_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Volume label
    #[arg(long, default_value = "zpaqfs")]
    pub label: String,

    /// Keep successful extractions instead of re-extracting on every read
    #[arg(long)]
    pub reuse_extracted: bool,

    /// Leave the volume writable after it is populated
    #[arg(long)]
    pub read_write: bool,

    /// Verbose logging (-vv => debug)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    }

    /// Label for the tree root: the archive's file name.
    pub fn archive_name(&self) -> String {
        self.archive
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.archive.to_string_lossy().into_owned())
    }

    pub fn config(&self) -> Result<Config, FsError> {
        let mut config = Config::new(self.tool.clone(), self.archive.clone());
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        config.cache_ceiling = self.cache_ceiling;
        config.cache_budget = self.cache_budget;
        config.extraction_timeout = Duration::from_secs(self.timeout);
        config.volume_label = self.label.clone();
        config.extract_policy = if self.reuse_extracted {
            ExtractPolicy::ReuseSuccess
        } else {
            ExtractPolicy::Always
        };
        config.read_only_after_populate = !self.read_write;
        config.validate()?;
        Ok(config)
    }
}
