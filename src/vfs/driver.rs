//! Filesystem operation surface for one mounted archive.
//!
//! ## Locking
//!
//! All node table state sits behind one mutex, held for the duration of an
//! operation. Extraction is the exception: the read path copies what it needs
//! out of the table, drops the lock, and then goes through a per-path
//! registry of in-flight extractions so that concurrent readers of the same
//! file share a single archive tool run while unrelated paths proceed.
//!
//! ## Lifecycle
//!
//! `Initializing -> Populating -> Serving { read_only: false } ->
//! Serving { read_only: true } -> Stopped`

use std::collections::HashMap;
use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{Mutex, watch};
use tokio::time::timeout;

use crate::bridge::{ExtractRequest, Extractor};
use crate::config::{Config, ExtractPolicy, MAX_VOLUME_LABEL};
use crate::error::{ExtractError, FsError, Result};
use crate::listing::{ArchiveTree, EntryRecord, parent_path};

use super::cache::{CacheLedger, CachedEntry};
use super::node::{BasicInfo, FileAttributes, FileInfo, SecurityDescriptor};
use super::path;
use super::store::{DirEntry, NodeStore};

/// Nominal volume geometry reported to clients: 1024 nodes of 16 MiB.
const VOLUME_TOTAL_SIZE: u64 = 1024 * 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Initializing,
    Populating,
    Serving { read_only: bool },
    Stopped,
}

impl fmt::Display for MountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountState::Initializing => write!(f, "initializing"),
            MountState::Populating => write!(f, "populating"),
            MountState::Serving { read_only: true } => write!(f, "serving (read-only)"),
            MountState::Serving { read_only: false } => write!(f, "serving"),
            MountState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_size: u64,
    pub free_size: u64,
    pub volume_label: String,
}

/// Handle for an opened file or directory.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenedNode {
    path: String,
}

impl OpenedNode {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for OpenedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenedNode:{}", self.path)
    }
}

/// Result slot shared by everyone waiting on one extraction.
type Outcome = Option<std::result::Result<PathBuf, ExtractError>>;

type Registry = Arc<Mutex<HashMap<String, watch::Receiver<Outcome>>>>;

struct Mount {
    state: MountState,
    store: NodeStore,
    volume: VolumeInfo,
}

fn log_op<T: fmt::Debug, E: fmt::Display>(
    op: &str,
    head: &dyn fmt::Debug,
    result: &std::result::Result<T, E>,
) {
    match result {
        Ok(value) => info!(" OK! | {op:20} | {head:?} | {value:?}"),
        Err(e) => info!(" NOK | {op:20} | {head:?} | {e}"),
    }
}

/// Serves an archive tree through filesystem operations, extracting file
/// contents on demand.
pub struct ArchiveFileSystem<E: Extractor + 'static> {
    config: Config,
    extractor: Arc<E>,
    mount: Mutex<Mount>,
    in_flight: Registry,
    ledger: Arc<StdMutex<CacheLedger>>,
}

impl<E: Extractor + 'static> ArchiveFileSystem<E> {
    pub fn new(config: Config, extractor: Arc<E>) -> Result<Self> {
        config.validate()?;
        let volume = VolumeInfo {
            total_size: VOLUME_TOTAL_SIZE,
            free_size: 0,
            volume_label: config.volume_label.clone(),
        };
        let ledger = CacheLedger::new(config.cache_budget);
        Ok(Self {
            config,
            extractor,
            mount: Mutex::new(Mount {
                state: MountState::Initializing,
                store: NodeStore::new(SecurityDescriptor::default()),
                volume,
            }),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            ledger: Arc::new(StdMutex::new(ledger)),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn state(&self) -> MountState {
        self.mount.lock().await.state
    }

    fn ensure_serving(mount: &Mount) -> Result<()> {
        match mount.state {
            MountState::Serving { .. } => Ok(()),
            state => Err(FsError::NotServing(state.to_string())),
        }
    }

    // Lifecycle

    /// Build the node table from a finished archive tree and start serving.
    pub async fn populate(&self, tree: &ArchiveTree) -> Result<usize> {
        let mut mount = self.mount.lock().await;
        if mount.state != MountState::Initializing {
            return Err(FsError::NotServing(mount.state.to_string()));
        }
        mount.state = MountState::Populating;
        info!("populating volume from {} tree nodes", tree.len());

        match mount.store.flatten(tree) {
            Ok(added) => {
                if self.config.read_only_after_populate {
                    mount.store.set_read_only(true);
                }
                let read_only = mount.store.is_read_only();
                mount.state = MountState::Serving { read_only };
                info!("volume ready with {} nodes", mount.store.len());
                Ok(added)
            }
            Err(e) => {
                mount.state = MountState::Stopped;
                Err(e)
            }
        }
    }

    /// Flip the read-only flag of a serving volume.
    pub async fn set_read_only(&self, read_only: bool) -> Result<()> {
        let mut mount = self.mount.lock().await;
        Self::ensure_serving(&mount)?;
        mount.store.set_read_only(read_only);
        mount.state = MountState::Serving { read_only };
        info!("volume is now {}", mount.state);
        Ok(())
    }

    pub async fn stop(&self) {
        let mut mount = self.mount.lock().await;
        mount.state = MountState::Stopped;
        info!("volume stopped");
    }

    // Volume

    pub async fn volume_info(&self) -> Result<VolumeInfo> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount).map(|_| mount.volume.clone());
        log_op("get_volume_info", &"", &result);
        result
    }

    pub async fn set_volume_label(&self, label: &str) -> Result<()> {
        let mut mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount).and_then(|_| {
            let len = label.chars().count();
            if len > MAX_VOLUME_LABEL {
                return Err(FsError::InvalidVolumeLabel(len));
            }
            mount.volume.volume_label = label.to_string();
            Ok(())
        });
        log_op("set_volume_label", &label, &result);
        result
    }

    // Security

    pub async fn get_security_by_name(
        &self,
        path: &str,
    ) -> Result<(FileAttributes, Arc<SecurityDescriptor>)> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount)
            .and_then(|_| mount.store.lookup(path))
            .map(|node| (node.attributes, node.security.clone()));
        log_op("get_security_by_name", &path, &result);
        result
    }

    pub async fn get_security(&self, handle: &OpenedNode) -> Result<Arc<SecurityDescriptor>> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount)
            .and_then(|_| mount.store.lookup(&handle.path))
            .map(|node| node.security.clone());
        log_op("get_security", handle, &result);
        result
    }

    pub async fn set_security(&self, handle: &OpenedNode, _descriptor: &SecurityDescriptor) -> Result<()> {
        let result = Err(FsError::NotImplemented("set_security"));
        log_op::<(), _>("set_security", handle, &result);
        result
    }

    // Open / create

    pub async fn create(
        &self,
        path: &str,
        is_directory: bool,
        attributes: FileAttributes,
        security: Option<Arc<SecurityDescriptor>>,
        allocation_size: u64,
        record: Option<EntryRecord>,
    ) -> Result<OpenedNode> {
        let mut mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount).and_then(|_| {
            mount
                .store
                .create(path, is_directory, attributes, security, allocation_size, record)
                .map(|node| OpenedNode {
                    path: node.path.clone(),
                })
        });
        log_op("create", &path, &result);
        result
    }

    pub async fn open(&self, path: &str) -> Result<OpenedNode> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount)
            .and_then(|_| mount.store.lookup(path))
            .map(|node| OpenedNode {
                path: node.path.clone(),
            });
        log_op("open", &path, &result);
        result
    }

    pub async fn close(&self, handle: OpenedNode) {
        log_op::<(), FsError>("close", &handle, &Ok(()));
    }

    // Metadata

    pub async fn get_file_info(&self, handle: &OpenedNode) -> Result<FileInfo> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount)
            .and_then(|_| mount.store.lookup(&handle.path))
            .map(|node| node.file_info());
        log_op("get_file_info", handle, &result);
        result
    }

    pub async fn set_basic_info(&self, handle: &OpenedNode, info: &BasicInfo) -> Result<FileInfo> {
        let mut mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount)
            .and_then(|_| mount.store.set_attributes(&handle.path, info));
        log_op("set_basic_info", handle, &result);
        result
    }

    pub async fn set_file_size(
        &self,
        handle: &OpenedNode,
        new_size: u64,
        set_allocation_size: bool,
    ) -> Result<FileInfo> {
        let mut mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount)
            .and_then(|_| mount.store.resize(&handle.path, new_size, set_allocation_size));
        log_op("set_file_size", handle, &result);
        result
    }

    // Directories

    pub async fn read_directory(&self, handle: &OpenedNode, marker: Option<&str>) -> Result<Vec<DirEntry>> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount)
            .and_then(|_| mount.store.list_children(&handle.path, marker));
        log_op("read_directory", handle, &result.as_ref().map(Vec::len));
        result
    }

    pub async fn get_dir_info_by_name(&self, handle: &OpenedNode, name: &str) -> Result<DirEntry> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount)
            .and_then(|_| mount.store.lookup(&path::join(&handle.path, name)))
            .map(|node| DirEntry {
                name: name.to_string(),
                info: node.file_info(),
            });
        log_op("get_dir_info_by_name", handle, &result);
        result
    }

    // Unsupported mutations

    pub async fn write(&self, handle: &OpenedNode, _buffer: &[u8], _offset: u64) -> Result<usize> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount).and_then(|_| {
            if mount.store.is_read_only() {
                Err(FsError::ReadOnlyViolation)
            } else {
                Err(FsError::NotImplemented("write"))
            }
        });
        log_op("write", handle, &result);
        result
    }

    pub async fn rename(&self, handle: &OpenedNode, new_path: &str, _replace_if_exists: bool) -> Result<()> {
        let result = Err(FsError::NotImplemented("rename"));
        log_op::<(), _>("rename", &(handle, new_path), &result);
        result
    }

    /// Deletion is not supported; this only reports why.
    pub async fn can_delete(&self, handle: &OpenedNode) -> Result<()> {
        let mount = self.mount.lock().await;
        let result = Self::ensure_serving(&mount).and_then(|_| {
            if mount.store.is_read_only() {
                return Err(FsError::ReadOnlyViolation);
            }
            let node = mount.store.lookup(&handle.path)?;
            if node.is_directory() && mount.store.has_children(&handle.path) {
                return Err(FsError::DirectoryNotEmpty(handle.path.clone()));
            }
            Err(FsError::NotImplemented("delete"))
        });
        log_op("can_delete", handle, &result);
        result
    }

    pub async fn cleanup(&self, handle: &OpenedNode) -> Result<()> {
        let result = Err(FsError::NotImplemented("cleanup"));
        log_op::<(), _>("cleanup", handle, &result);
        result
    }

    pub async fn overwrite(&self, handle: &OpenedNode, _attributes: FileAttributes, _allocation_size: u64) -> Result<()> {
        let result = Err(FsError::NotImplemented("overwrite"));
        log_op::<(), _>("overwrite", handle, &result);
        result
    }

    pub async fn flush(&self, handle: &OpenedNode) -> Result<()> {
        log_op::<(), FsError>("flush", handle, &Ok(()));
        Ok(())
    }

    // Reading

    /// Read `length` bytes at `offset`.
    ///
    /// Files below the cache ceiling are materialized from the archive and
    /// read from their local copy. Larger files need [`Self::extract_to`].
    pub async fn read(&self, handle: &OpenedNode, offset: u64, length: usize) -> Result<Vec<u8>> {
        let result = self.read_materialized(handle, offset, length).await;
        log_op("read", &(handle, offset, length), &result.as_ref().map(Vec::len));
        result
    }

    /// Read a whole file with a single extraction.
    ///
    /// An empty file is returned as no bytes without touching the archive.
    pub async fn read_all(&self, handle: &OpenedNode) -> Result<Vec<u8>> {
        let size = self.get_file_info(handle).await?.file_size;
        if size == 0 {
            return Ok(Vec::new());
        }
        let length = usize::try_from(size).unwrap_or(usize::MAX);
        self.read(handle, 0, length).await
    }

    async fn read_materialized(&self, handle: &OpenedNode, offset: u64, length: usize) -> Result<Vec<u8>> {
        let (entry, size) = {
            let mount = self.mount.lock().await;
            Self::ensure_serving(&mount)?;
            let node = mount.store.lookup(&handle.path)?;
            let size = node.file_data()?.file_size();
            (path::to_archive(&node.path).to_string(), size)
        };

        if offset >= size {
            return Err(FsError::EndOfRange { offset, size });
        }
        if size >= self.config.cache_ceiling {
            return Err(FsError::ExtractionRequired {
                path: handle.path.clone(),
                size,
                ceiling: self.config.cache_ceiling,
            });
        }

        let request = ExtractRequest::new(
            &self.config.archive,
            &entry,
            &self.cache_destination(&entry),
            false,
        );
        // Held until the bytes are read so the copy cannot be evicted under us
        let _pin = CachePin::new(&self.ledger, &handle.path);
        let location = self
            .materialize(&handle.path, request, Some(size))
            .await?;
        read_local(&location, offset, length).await
    }

    /// Directory under the cache root that receives `entry`.
    fn cache_destination(&self, entry: &str) -> PathBuf {
        let mut destination = self.config.cache_dir.clone();
        if let Some(parent) = parent_path(entry) {
            // Drive letters like `C:` are not valid path components everywhere
            for segment in parent.split('/') {
                destination.push(segment.replace(':', "_"));
            }
        }
        destination
    }

    /// Extract `request` unless an extraction of `key` is already running or
    /// (with [`ExtractPolicy::ReuseSuccess`]) already succeeded, then wait a
    /// bounded time for the shared result.
    ///
    /// `cached_size` is set for cache materializations, which are admitted
    /// to the cache ledger once extracted. Explicit extractions pass `None`.
    async fn materialize(&self, key: &str, request: ExtractRequest, cached_size: Option<u64>) -> Result<PathBuf> {
        let mut rx = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(key) {
                Some(rx) => {
                    debug!("joining extraction of {key}");
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    in_flight.insert(key.to_string(), rx.clone());
                    self.spawn_extraction(key.to_string(), request, cached_size, tx);
                    rx
                }
            }
        };

        let limit = self.config.extraction_timeout;
        let outcome = match timeout(limit, rx.wait_for(Option::is_some)).await {
            Err(_) => return Err(ExtractError::Timeout(limit).into()),
            Ok(Err(_)) => None,
            Ok(Ok(value)) => (*value).clone(),
        };
        match outcome {
            Some(Ok(location)) => Ok(location),
            Some(Err(e)) => Err(e.into()),
            None => Err(ExtractError::Other(format!("extraction of {key} was abandoned")).into()),
        }
    }

    /// Run one extraction on its own task so it finishes even if every
    /// waiter times out.
    fn spawn_extraction(
        &self,
        key: String,
        request: ExtractRequest,
        cached_size: Option<u64>,
        tx: watch::Sender<Outcome>,
    ) {
        let extractor = self.extractor.clone();
        let in_flight = self.in_flight.clone();
        let ledger = self.ledger.clone();
        let reusable = cached_size.is_some() && self.config.extract_policy == ExtractPolicy::ReuseSuccess;
        // The previous copy of this key must survive while the tool rewrites it
        let pin = cached_size.map(|_| CachePin::new(&self.ledger, &key));

        tokio::spawn(async move {
            debug!("extracting {} to {}", request.entry, request.destination.display());
            let outcome = match extractor.extract(&request).await {
                Ok(output) => {
                    debug!("extracted {}: {}", request.entry, output.trim());
                    Ok(request.target())
                }
                Err(e) => {
                    warn!("extraction of {} failed: {}", request.entry, e);
                    Err(e)
                }
            };

            // Readers pin before they look at the registry, so deciding and
            // deleting under the registry lock never removes a copy that
            // somebody is about to read
            let mut registry = in_flight.lock().await;
            if let (Ok(location), Some(size)) = (&outcome, cached_size) {
                let evicted = lock_ledger(&ledger).admit(CachedEntry {
                    key: key.clone(),
                    location: location.clone(),
                    size,
                });
                for entry in evicted {
                    registry.remove(&entry.key);
                    evict(&entry).await;
                }
            }

            // Failures are never remembered; a later read tries again
            if !(reusable && outcome.is_ok()) {
                registry.remove(&key);
            }
            drop(registry);
            drop(pin);
            tx.send_replace(Some(outcome));
        });
    }

    /// Extract the entry behind `handle` into `destination`, bypassing the
    /// cache ceiling. Returns where the entry was placed.
    ///
    /// The tool runs on its own task like a cache materialization: a caller
    /// that gives up after the timeout does not cancel it, and a second
    /// request for the same entry and destination joins the running one.
    pub async fn extract_to(&self, handle: &OpenedNode, destination: &Path) -> Result<PathBuf> {
        let result = self.extract_explicit(handle, destination).await;
        log_op("extract_to", &(handle, destination), &result);
        result
    }

    async fn extract_explicit(&self, handle: &OpenedNode, destination: &Path) -> Result<PathBuf> {
        let (entry, is_directory) = {
            let mount = self.mount.lock().await;
            Self::ensure_serving(&mount)?;
            let node = mount.store.lookup(&handle.path)?;
            (path::to_archive(&node.path).to_string(), node.is_directory())
        };
        if entry.is_empty() {
            return Err(FsError::NotImplemented("extracting the whole archive"));
        }

        let request = ExtractRequest::new(&self.config.archive, &entry, destination, is_directory);
        let key = format!("{} => {}", handle.path, destination.display());
        self.materialize(&key, request, None).await
    }
}

fn lock_ledger(ledger: &StdMutex<CacheLedger>) -> MutexGuard<'_, CacheLedger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps a key out of eviction for as long as it lives.
struct CachePin {
    ledger: Arc<StdMutex<CacheLedger>>,
    key: String,
}

impl CachePin {
    fn new(ledger: &Arc<StdMutex<CacheLedger>>, key: &str) -> Self {
        lock_ledger(ledger).pin(key);
        Self {
            ledger: ledger.clone(),
            key: key.to_string(),
        }
    }
}

impl Drop for CachePin {
    fn drop(&mut self) {
        lock_ledger(&self.ledger).unpin(&self.key);
    }
}

/// Delete one evicted materialization.
async fn evict(entry: &CachedEntry) {
    debug!("evicting {} ({} bytes)", entry.location.display(), entry.size);
    match fs::remove_file(&entry.location).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to evict {}: {}", entry.location.display(), e),
    }
}

async fn read_local(location: &Path, offset: u64, length: usize) -> Result<Vec<u8>> {
    let mut file = fs::File::open(location).await.map_err(|e| {
        ExtractError::Other(format!(
            "materialized copy {} unavailable: {}",
            location.display(),
            e
        ))
    })?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = Vec::with_capacity(length);
    file.take(length as u64).read_to_end(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::TreeBuilder;

    struct NoopExtractor;

    #[async_trait::async_trait]
    impl Extractor for NoopExtractor {
        async fn extract(&self, _request: &ExtractRequest) -> std::result::Result<String, ExtractError> {
            Ok(String::new())
        }
    }

    fn writable_config() -> Config {
        let mut config = Config::new("zpaqfranz", "a.zpaq");
        config.read_only_after_populate = false;
        config
    }

    async fn mounted() -> ArchiveFileSystem<NoopExtractor> {
        let mut tree = ArchiveTree::new();
        TreeBuilder::build(
            &mut tree,
            [
                "2 files",
                "- 2024-01-01 10:00:00 40.000.000 A big/huge.iso",
                "- 2024-01-01 10:00:00 5 A big/small.txt",
            ],
        )
        .unwrap();
        let fs = ArchiveFileSystem::new(writable_config(), Arc::new(NoopExtractor)).unwrap();
        fs.populate(&tree).await.unwrap();
        fs
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let fs = ArchiveFileSystem::new(writable_config(), Arc::new(NoopExtractor)).unwrap();
        assert_eq!(fs.state().await, MountState::Initializing);
        assert!(matches!(fs.open("/").await, Err(FsError::NotServing(_))));

        fs.populate(&ArchiveTree::new()).await.unwrap();
        assert_eq!(fs.state().await, MountState::Serving { read_only: false });
        assert!(fs.populate(&ArchiveTree::new()).await.is_err());

        fs.set_read_only(true).await.unwrap();
        assert_eq!(fs.state().await, MountState::Serving { read_only: true });

        fs.stop().await;
        assert!(matches!(fs.open("/").await, Err(FsError::NotServing(_))));
    }

    #[tokio::test]
    async fn test_large_file_needs_explicit_extraction() {
        let fs = mounted().await;
        let handle = fs.open("/big/huge.iso").await.unwrap();
        assert!(matches!(
            fs.read(&handle, 0, 10).await,
            Err(FsError::ExtractionRequired { size: 40_000_000, .. })
        ));

        let dest = Path::new("/tmp/out");
        assert_eq!(fs.extract_to(&handle, dest).await.unwrap(), dest.join("huge.iso"));
    }

    #[tokio::test]
    async fn test_read_past_end_and_directories() {
        let fs = mounted().await;
        let file = fs.open("/big/small.txt").await.unwrap();
        assert!(matches!(
            fs.read(&file, 5, 1).await,
            Err(FsError::EndOfRange { offset: 5, size: 5 })
        ));

        let dir = fs.open("/big").await.unwrap();
        assert!(matches!(fs.read(&dir, 0, 1).await, Err(FsError::NotAFile(_))));
        assert!(matches!(fs.can_delete(&dir).await, Err(FsError::DirectoryNotEmpty(_))));
    }

    #[tokio::test]
    async fn test_write_errors_depend_on_mode() {
        let fs = mounted().await;
        let file = fs.open("/big/small.txt").await.unwrap();
        assert!(matches!(
            fs.write(&file, b"x", 0).await,
            Err(FsError::NotImplemented("write"))
        ));
        fs.set_read_only(true).await.unwrap();
        assert!(matches!(fs.write(&file, b"x", 0).await, Err(FsError::ReadOnlyViolation)));
        assert!(matches!(
            fs.set_file_size(&file, 1, false).await,
            Err(FsError::ReadOnlyViolation)
        ));
    }

    #[tokio::test]
    async fn test_volume_label() {
        let fs = mounted().await;
        fs.set_volume_label("archive").await.unwrap();
        assert_eq!(fs.volume_info().await.unwrap().volume_label, "archive");
        assert!(matches!(
            fs.set_volume_label(&"x".repeat(40)).await,
            Err(FsError::InvalidVolumeLabel(40))
        ));
    }

    #[tokio::test]
    async fn test_dir_info_by_name() {
        let fs = mounted().await;
        let dir = fs.open("/big").await.unwrap();
        let entry = fs.get_dir_info_by_name(&dir, "small.txt").await.unwrap();
        assert_eq!(entry.info.file_size, 5);
        assert!(matches!(
            fs.get_dir_info_by_name(&dir, "nope").await,
            Err(FsError::NameNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_populate_can_finish_read_only() {
        let fs = ArchiveFileSystem::new(Config::new("zpaqfranz", "a.zpaq"), Arc::new(NoopExtractor)).unwrap();
        fs.populate(&ArchiveTree::new()).await.unwrap();
        assert_eq!(fs.state().await, MountState::Serving { read_only: true });
    }

    #[test]
    fn test_cache_destination_sanitizes_drive() {
        let mut config = Config::new("zpaqfranz", "a.zpaq");
        config.cache_dir = PathBuf::from("/cache");
        let fs = ArchiveFileSystem::new(config, Arc::new(NoopExtractor)).unwrap();
        assert_eq!(
            fs.cache_destination("C:/data/f.txt"),
            PathBuf::from("/cache/C_/data")
        );
        assert_eq!(fs.cache_destination("top.txt"), PathBuf::from("/cache"));
    }
}
