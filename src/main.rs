//! Command line front end for zpaqfs.
//!
//! Lists an archive as a tree, extracts single entries, or mounts the
//! archive in-process and opens a small shell over the virtual filesystem.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::Parser;
use log::info;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use zpaqfs::listing::ROOT_ID;
use zpaqfs::vfs::{FileAttributes, FileInfo, path};
use zpaqfs::{
    ArchiveFileSystem, ArchiveTree, Cli, ListingSource, TextListing, ToolListing, TreeBuilder,
    TreeNode, ZpaqExtractor,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let config = cli.config()?;

    let source: Box<dyn ListingSource> = match &cli.listing {
        Some(listing) => Box::new(TextListing::new(listing)),
        None => Box::new(ToolListing::new(&config)),
    };
    info!("reading listing from {}", source.describe());
    let lines = source.read_lines().await?;

    let mut tree = ArchiveTree::with_root_label(&cli.archive_name());
    let stats = TreeBuilder::build(&mut tree, &lines)?;
    info!(
        "{} entries accepted, {} lines skipped, {} nodes",
        stats.accepted,
        stats.skipped,
        tree.len()
    );

    if cli.list || (cli.extract.is_none() && !cli.browse) {
        render_tree(&tree);
        return Ok(());
    }

    let fs = ArchiveFileSystem::new(config.clone(), Arc::new(ZpaqExtractor::new(&config)))?;
    fs.populate(&tree).await?;

    if let Some(entry) = &cli.extract {
        let handle = fs
            .open(&path::resolve(path::ROOT, entry))
            .await
            .with_context(|| format!("{entry} is not in the archive"))?;
        println!("  extracting: {entry}");
        let target = fs.extract_to(&handle, &cli.extract_dir).await?;
        println!("  placed at: {}", target.display());
    }

    if cli.browse {
        browse(&fs).await?;
    }

    fs.stop().await;
    Ok(())
}

/// Print the tree with directories first, one entry per line.
fn render_tree(tree: &ArchiveTree) {
    for line in tree_lines(tree) {
        println!("{line}");
    }
}

/// Walks with an explicit stack so deep archives cannot overflow the call stack.
fn tree_lines(tree: &ArchiveTree) -> Vec<String> {
    let mut lines = vec![tree.root().label.clone()];
    let mut stack = Vec::new();
    push_children(tree, ROOT_ID, "", &mut stack);
    while let Some((node, prefix, last)) = stack.pop() {
        let branch = if last { "└── " } else { "├── " };
        if tree.is_directory(&node.id) {
            lines.push(format!("{prefix}{branch}{}/", node.label));
        } else {
            lines.push(format!(
                "{prefix}{branch}{}  ({})",
                node.label,
                format_size(node.record.size)
            ));
        }
        let next = format!("{prefix}{}", if last { "    " } else { "│   " });
        push_children(tree, &node.id, &next, &mut stack);
    }
    lines
}

/// Queue the children of `id` so the first sorted child is popped first.
fn push_children<'a>(
    tree: &'a ArchiveTree,
    id: &str,
    prefix: &str,
    stack: &mut Vec<(&'a TreeNode, String, bool)>,
) {
    let children = tree.sorted_children(id);
    let count = children.len();
    for (i, child) in children.into_iter().enumerate().rev() {
        stack.push((child, prefix.to_string(), i + 1 == count));
    }
}

/// Interactive shell over a mounted archive.
async fn browse(fs: &ArchiveFileSystem<ZpaqExtractor>) -> Result<()> {
    let mut cwd = path::ROOT.to_string();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(format!("{cwd}> ").as_bytes()).await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let arg = words.next();

        let outcome = match command {
            "quit" | "exit" => break,
            "ls" => list_directory(fs, &path::resolve(&cwd, arg.unwrap_or("."))).await,
            "cd" => {
                let target = path::resolve(&cwd, arg.unwrap_or("/"));
                change_directory(fs, &target).await.map(|_| cwd = target)
            }
            "stat" => stat(fs, &path::resolve(&cwd, arg.unwrap_or("."))).await,
            "cat" => match arg {
                Some(arg) => cat(fs, &path::resolve(&cwd, arg)).await,
                None => Err(anyhow::anyhow!("usage: cat FILE")),
            },
            "get" => match arg {
                Some(arg) => {
                    let dest = words.next().unwrap_or(".");
                    get(fs, &path::resolve(&cwd, arg), Path::new(dest)).await
                }
                None => Err(anyhow::anyhow!("usage: get ENTRY [DIR]")),
            },
            "ro" => fs.set_read_only(true).await.map_err(Into::into),
            "help" => {
                println!("ls [DIR]  cd DIR  stat PATH  cat FILE  get ENTRY [DIR]  ro  quit");
                Ok(())
            }
            other => Err(anyhow::anyhow!("unknown command {other:?}, try help")),
        };
        if let Err(e) = outcome {
            eprintln!("{command}: {e:#}");
        }
    }
    Ok(())
}

async fn list_directory(fs: &ArchiveFileSystem<ZpaqExtractor>, dir: &str) -> Result<()> {
    let handle = fs.open(dir).await?;
    let entries = fs.read_directory(&handle, None).await?;
    for entry in entries {
        if entry.info.attributes.contains(FileAttributes::DIRECTORY) {
            println!("{:>12}  {}/", "<DIR>", entry.name);
        } else {
            println!("{:>12}  {}", entry.info.file_size, entry.name);
        }
    }
    fs.close(handle).await;
    Ok(())
}

async fn change_directory(fs: &ArchiveFileSystem<ZpaqExtractor>, dir: &str) -> Result<()> {
    let handle = fs.open(dir).await?;
    let info = fs.get_file_info(&handle).await?;
    fs.close(handle).await;
    if !info.attributes.contains(FileAttributes::DIRECTORY) {
        bail!("{dir} is not a directory");
    }
    Ok(())
}

async fn stat(fs: &ArchiveFileSystem<ZpaqExtractor>, target: &str) -> Result<()> {
    let handle = fs.open(target).await?;
    let info = fs.get_file_info(&handle).await?;
    fs.close(handle).await;
    print_info(target, &info);
    Ok(())
}

fn print_info(target: &str, info: &FileInfo) {
    let modified: DateTime<Local> = info.times.last_write.into();
    println!("  path:       {target}");
    println!("  attributes: {:?}", info.attributes);
    println!("  size:       {} ({})", info.file_size, format_size(info.file_size));
    println!("  allocated:  {}", info.allocation_size);
    println!("  modified:   {}", modified.format("%Y-%m-%d %H:%M:%S"));
    println!("  index:      {}", info.index_number);
}

async fn cat(fs: &ArchiveFileSystem<ZpaqExtractor>, file: &str) -> Result<()> {
    let handle = fs.open(file).await?;
    let bytes = fs.read_all(&handle).await?;
    let mut stdout = tokio::io::stdout();
    stdout.write_all(&bytes).await?;
    stdout.flush().await?;
    fs.close(handle).await;
    Ok(())
}

async fn get(fs: &ArchiveFileSystem<ZpaqExtractor>, entry: &str, dest: &Path) -> Result<()> {
    let handle = fs.open(entry).await?;
    let target = fs.extract_to(&handle, dest).await?;
    fs.close(handle).await;
    println!("  extracted: {}", target.display());
    Ok(())
}

/// Format a byte size into a human-readable string.
///
/// Picks bytes, KB, MB or GB depending on magnitude.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
