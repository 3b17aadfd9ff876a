/*!
 * Filesystem Facade
 * Search-path resolution, descriptor tracking, and I/O dispatch
 */

use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use path_clean::PathClean;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::arena::{DescriptorArena, FileDescriptor};
use crate::driver::{DiskDriver, Driver, PackDriverFactory};
use crate::registry::SearchPathRegistry;
use crate::stats::{FsStats, StatsSnapshot};
use crate::types::{
    AddType, DriverId, FileHandle, FileKind, FindHandle, OpenMode, VfsError, VfsResult, Whence,
};

/// Facade configuration, injected at construction
#[derive(Clone)]
pub struct FsConfig {
    /// Extensions treated as archive containers during search-path
    /// registration
    pub archive_extensions: Vec<String>,
    /// Constructor hook for archive drivers; archive paths are ignored
    /// with a warning when absent
    pub pack_factory: Option<Arc<dyn PackDriverFactory>>,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            archive_extensions: vec!["vpk".to_string(), "bsp".to_string()],
            pack_factory: None,
        }
    }
}

/// Directory iteration cursor
struct FindState {
    matches: Vec<String>,
    cursor: usize,
}

/// Search-path-based virtual filesystem
///
/// Multiplexes plain directory mounts, absolute-path access, and archive
/// drivers behind one logical file API. Construct one per host and pass
/// it by reference; there is no global instance.
pub struct SearchFs {
    registry: RwLock<SearchPathRegistry>,
    arena: RwLock<DescriptorArena>,
    finds: DashMap<FindHandle, FindState, RandomState>,
    next_driver: AtomicU32,
    next_find: AtomicU32,
    root: Arc<dyn Driver>,
    archive_extensions: Vec<String>,
    pack_factory: Option<Arc<dyn PackDriverFactory>>,
    stats: FsStats,
}

impl SearchFs {
    pub fn new() -> Self {
        Self::with_config(FsConfig::default())
    }

    pub fn with_config(config: FsConfig) -> Self {
        Self {
            registry: RwLock::new(SearchPathRegistry::new()),
            arena: RwLock::new(DescriptorArena::new()),
            finds: DashMap::with_hasher(RandomState::new()),
            // Id 0 belongs to the root driver
            next_driver: AtomicU32::new(1),
            next_find: AtomicU32::new(1),
            root: Arc::new(DiskDriver::root(DriverId(0))),
            archive_extensions: config.archive_extensions,
            pack_factory: config.pack_factory,
            stats: FsStats::new(),
        }
    }

    // ------------------------------------------------------------------
    // Search path registration
    // ------------------------------------------------------------------

    /// Mount a path under a path-ID.
    ///
    /// Directories become plain drivers; files with a recognized archive
    /// extension go through the pack factory. A nonexistent path is
    /// ignored (best-effort mounting), with one recovery: a missing
    /// archive is retried with its `_dir`-suffixed sibling, the
    /// chunked-archive naming convention.
    pub fn add_search_path(&self, path: &str, path_id: &str, add: AddType) {
        let mut resolved = self.normalize(path);

        if !resolved.exists() {
            let sibling = self.is_archive(&resolved).then(|| dir_sibling(&resolved));
            match sibling.flatten().filter(|s| s.exists()) {
                Some(s) => resolved = s,
                None => {
                    warn!(path = %resolved.display(), path_id, "search path does not exist, ignoring");
                    return;
                }
            }
        }

        let id = DriverId(self.next_driver.fetch_add(1, Ordering::Relaxed));
        let driver: Arc<dyn Driver> = if resolved.is_dir() {
            Arc::new(DiskDriver::plain(id, resolved.clone(), PathBuf::from(path)))
        } else if self.is_archive(&resolved) {
            match &self.pack_factory {
                Some(factory) => match factory.create(id, &resolved, Path::new(path)) {
                    Ok(driver) => driver,
                    Err(e) => {
                        warn!(path = %resolved.display(), error = %e, "pack driver construction failed, ignoring");
                        return;
                    }
                },
                None => {
                    warn!(path = %resolved.display(), "archive search path with no pack factory, ignoring");
                    return;
                }
            }
        } else {
            panic!("unsupported search path entry: {}", resolved.display());
        };

        info!(path = %resolved.display(), path_id, id = %id, kind = driver.kind(), "adding search path");
        self.mount_driver(path_id, driver, add);
    }

    /// Register an externally built driver under a path-ID. Used by
    /// `add_search_path` and by hosts mounting their own archive drivers.
    pub fn mount_driver(&self, path_id: &str, driver: Arc<dyn Driver>, add: AddType) {
        self.registry.write().insert_driver(path_id, driver, add);
    }

    /// Allocate an identifier for an externally built driver
    pub fn next_driver_id(&self) -> DriverId {
        DriverId(self.next_driver.fetch_add(1, Ordering::Relaxed))
    }

    /// Remove one mount from a path-ID by native path equality
    pub fn remove_search_path(&self, path: &str, path_id: &str) -> bool {
        let resolved = self.normalize(path);
        match self.registry.write().remove_driver(path_id, &resolved) {
            Some(driver) => {
                driver.shutdown();
                info!(path = %resolved.display(), path_id, "removed search path");
                true
            }
            None => false,
        }
    }

    /// Remove a whole path-ID: closes every descriptor opened through
    /// its drivers, then shuts the drivers down
    pub fn remove_search_paths(&self, path_id: &str) {
        let Some(removed) = self.registry.write().remove_path(path_id) else {
            return;
        };

        let stale: Vec<FileHandle> = {
            let arena = self.arena.read();
            arena
                .handles()
                .into_iter()
                .filter(|h| {
                    arena
                        .get(*h)
                        .map_or(false, |d| removed.client_ids.contains(&d.driver_id()))
                })
                .collect()
        };
        for handle in stale {
            let _ = self.close(handle);
        }

        for driver in &removed.drivers {
            driver.shutdown();
        }
        info!(path_id, drivers = removed.drivers.len(), "removed search paths");
    }

    /// Full teardown: closes all descriptors, resets the arena, and
    /// releases every mount. Safe to call on an empty registry.
    pub fn remove_all_search_paths(&self) {
        let paths = self.registry.write().take_all();
        let descriptors = self.arena.write().clear();

        for desc in descriptors {
            let FileDescriptor { driver, file, .. } = desc;
            driver.close(file);
        }
        for search_path in &paths {
            for driver in &search_path.drivers {
                driver.shutdown();
            }
        }

        if !paths.is_empty() {
            info!(count = paths.len(), "removed all search paths");
        }
    }

    /// Exclude a path-ID from no-path-ID lookups; creates the entry if
    /// it does not exist yet
    pub fn mark_path_id_request_only(&self, path_id: &str, flag: bool) {
        self.registry.write().mark_request_only(path_id, flag);
    }

    /// Serialize a path-ID's mounts, `;`-separated, optionally skipping
    /// archive mounts
    pub fn get_search_path(&self, path_id: &str, include_pack: bool) -> String {
        let registry = self.registry.read();
        let Some(search_path) = registry.get(path_id) else {
            return String::new();
        };
        search_path
            .drivers
            .iter()
            .filter(|d| include_pack || d.kind() != "pack")
            .map(|d| d.abs_path().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(";")
    }

    // ------------------------------------------------------------------
    // Open / close
    // ------------------------------------------------------------------

    /// Resolve and open a logical path.
    ///
    /// Absolute paths go straight to the root driver. With a path-ID,
    /// that entry's drivers are tried in search order; without one, every
    /// non-request-only path-ID is consulted in registration order and
    /// the first successful open wins.
    pub fn open(&self, file_name: &str, options: &str, path_id: Option<&str>) -> VfsResult<FileHandle> {
        let mode = OpenMode::parse(options);
        assert!(
            !(file_name.starts_with("//") || file_name.starts_with("\\\\")),
            "doubled leading separator in path: {}",
            file_name
        );

        if Path::new(file_name).is_absolute() {
            let file = self.root.open(file_name, mode)?;
            return Ok(self.register(Arc::clone(&self.root), file_name, file));
        }

        let opened = {
            let registry = self.registry.read();
            match path_id {
                Some(pid) => {
                    let search_path = registry.get(pid).ok_or_else(|| {
                        warn!(path_id = pid, "open against unknown path ID");
                        VfsError::UnknownPathId(pid.to_string())
                    })?;
                    try_drivers(&search_path.drivers, file_name, mode)
                }
                None => registry
                    .iter()
                    .filter(|sp| !sp.request_only)
                    .find_map(|sp| try_drivers(&sp.drivers, file_name, mode)),
            }
        };

        match opened {
            Some((driver, file)) => Ok(self.register(driver, file_name, file)),
            None => Err(VfsError::NotFound(file_name.to_string())),
        }
    }

    /// Close a handle, releasing its driver reference and returning the
    /// descriptor slot to the arena
    pub fn close(&self, handle: FileHandle) -> VfsResult<()> {
        let desc = self
            .arena
            .write()
            .free(handle)
            .ok_or(VfsError::InvalidHandle(handle.0))?;
        debug!(handle = %handle, path = desc.path(), "closing file");
        let FileDescriptor { driver, file, .. } = desc;
        driver.close(file);
        Ok(())
    }

    // ------------------------------------------------------------------
    // I/O dispatch
    // ------------------------------------------------------------------

    pub fn read(&self, handle: FileHandle, buf: &mut [u8]) -> VfsResult<usize> {
        let mut arena = self.arena.write();
        let desc = arena
            .get_mut(handle)
            .ok_or(VfsError::InvalidHandle(handle.0))?;
        let n = desc.driver.read(&desc.file, buf, desc.offset)?;
        if n > 0 {
            desc.offset += n as u64;
            self.stats.record_read(n as u64);
        }
        Ok(n)
    }

    pub fn write(&self, handle: FileHandle, buf: &[u8]) -> VfsResult<usize> {
        let mut arena = self.arena.write();
        let desc = arena
            .get_mut(handle)
            .ok_or(VfsError::InvalidHandle(handle.0))?;
        // Zero-length writes succeed immediately without dispatching;
        // callers use them to probe writability without a buffer.
        if buf.is_empty() {
            return Ok(0);
        }
        let n = desc.driver.write(&desc.file, buf, desc.offset)?;
        if n > 0 {
            desc.offset += n as u64;
            self.stats.record_write(n as u64);
        }
        Ok(n)
    }

    pub fn flush(&self, handle: FileHandle) -> VfsResult<()> {
        let arena = self.arena.read();
        let desc = arena.get(handle).ok_or(VfsError::InvalidHandle(handle.0))?;
        desc.driver.flush(&desc.file)
    }

    /// Move the offset; the result is always clamped into `[0, size]`
    /// using a fresh stat
    pub fn seek(&self, handle: FileHandle, pos: i64, whence: Whence) -> VfsResult<u64> {
        let mut arena = self.arena.write();
        let desc = arena
            .get_mut(handle)
            .ok_or(VfsError::InvalidHandle(handle.0))?;
        let stat = desc.driver.stat(&desc.file)?;
        let size = stat.size as i64;
        let target = match whence {
            Whence::Head => pos,
            Whence::Current => desc.offset as i64 + pos,
            Whence::Tail => size - pos,
        };
        desc.offset = target.clamp(0, size) as u64;
        desc.size = size;
        self.stats.record_seek();
        Ok(desc.offset)
    }

    pub fn tell(&self, handle: FileHandle) -> VfsResult<u64> {
        let arena = self.arena.read();
        let desc = arena.get(handle).ok_or(VfsError::InvalidHandle(handle.0))?;
        Ok(desc.offset)
    }

    /// File size, cached after the first successful stat
    pub fn size(&self, handle: FileHandle) -> VfsResult<u64> {
        let mut arena = self.arena.write();
        let desc = arena
            .get_mut(handle)
            .ok_or(VfsError::InvalidHandle(handle.0))?;
        if desc.size >= 0 {
            return Ok(desc.size as u64);
        }
        let stat = desc.driver.stat(&desc.file)?;
        desc.size = stat.size as i64;
        Ok(stat.size)
    }

    /// Open, measure, close
    pub fn size_of(&self, file_name: &str, path_id: Option<&str>) -> VfsResult<u64> {
        let handle = self.open(file_name, "r", path_id)?;
        let size = self.size(handle);
        let _ = self.close(handle);
        size
    }

    /// Existence check. Relative paths perform a full open/close cycle
    /// with search-path resolution, not a lightweight stat.
    pub fn file_exists(&self, file_name: &str, path_id: Option<&str>) -> bool {
        if Path::new(file_name).is_absolute() {
            return Path::new(file_name).exists();
        }
        match self.open(file_name, "r", path_id) {
            Ok(handle) => {
                let _ = self.close(handle);
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_directory(&self, file_name: &str, path_id: Option<&str>) -> bool {
        let Ok(handle) = self.open(file_name, "r", path_id) else {
            return false;
        };
        // Pin the driver across the stat so concurrent mount teardown
        // cannot drop it mid-call.
        let stat = {
            let arena = self.arena.read();
            match arena.get(handle) {
                Some(desc) => {
                    let driver = Arc::clone(&desc.driver);
                    driver.stat(&desc.file)
                }
                None => Err(VfsError::InvalidHandle(handle.0)),
            }
        };
        let _ = self.close(handle);
        matches!(stat, Ok(s) if s.kind == FileKind::Directory)
    }

    // ------------------------------------------------------------------
    // Directory iteration
    // ------------------------------------------------------------------

    /// Run the pattern across the relevant drivers and return the first
    /// match with a cursor handle, or None when nothing matched (no
    /// iteration state is created in that case)
    pub fn find_first(&self, pattern: &str, path_id: Option<&str>) -> Option<(FindHandle, String)> {
        let mut matches = Vec::new();

        if Path::new(pattern).is_absolute() {
            self.root.list_dir(pattern, &mut matches);
        } else {
            let registry = self.registry.read();
            match path_id {
                Some(pid) => {
                    let Some(search_path) = registry.get(pid) else {
                        warn!(path_id = pid, "find against unknown path ID");
                        return None;
                    };
                    for driver in &search_path.drivers {
                        driver.list_dir(pattern, &mut matches);
                    }
                }
                None => {
                    for search_path in registry.iter().filter(|sp| !sp.request_only) {
                        for driver in &search_path.drivers {
                            driver.list_dir(pattern, &mut matches);
                        }
                    }
                }
            }
        }

        if matches.is_empty() {
            return None;
        }
        let first = matches[0].clone();
        let handle = FindHandle(self.next_find.fetch_add(1, Ordering::Relaxed));
        self.finds.insert(handle, FindState { matches, cursor: 0 });
        Some((handle, first))
    }

    /// Advance the cursor. Exhaustion is terminal: further calls keep
    /// returning None without mutating state.
    pub fn find_next(&self, handle: FindHandle) -> Option<String> {
        let mut state = self.finds.get_mut(&handle)?;
        if state.cursor + 1 < state.matches.len() {
            state.cursor += 1;
            Some(state.matches[state.cursor].clone())
        } else {
            None
        }
    }

    /// Re-open and stat the entry at the current cursor
    pub fn find_is_directory(&self, handle: FindHandle) -> bool {
        let path = match self.finds.get(&handle) {
            Some(state) => state.matches[state.cursor].clone(),
            None => return false,
        };
        // Listing results are composed absolute paths
        let Ok(file) = self.root.open(&path, OpenMode::parse("r")) else {
            return false;
        };
        let is_dir = matches!(self.root.stat(&file), Ok(s) if s.kind == FileKind::Directory);
        self.root.close(file);
        is_dir
    }

    pub fn find_close(&self, handle: FindHandle) {
        self.finds.remove(&handle);
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Currently open descriptors
    pub fn open_count(&self) -> usize {
        self.arena.read().live()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn register(&self, driver: Arc<dyn Driver>, path: &str, file: File) -> FileHandle {
        self.arena
            .write()
            .alloc(FileDescriptor::new(driver, path, file))
    }

    fn normalize(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf().clean()
        } else {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(p)
                .clean()
        }
    }

    fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.archive_extensions.iter().any(|a| *a == ext)
            })
            .unwrap_or(false)
    }
}

impl Default for SearchFs {
    fn default() -> Self {
        Self::new()
    }
}

/// First successful open wins
fn try_drivers(
    drivers: &[Arc<dyn Driver>],
    file_name: &str,
    mode: OpenMode,
) -> Option<(Arc<dyn Driver>, File)> {
    drivers.iter().find_map(|driver| {
        driver
            .open(file_name, mode)
            .ok()
            .map(|file| (Arc::clone(driver), file))
    })
}

/// foo.vpk -> foo_dir.vpk, the chunked-archive index convention
fn dir_sibling(path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{}_dir.{}", stem, ext)))
}
