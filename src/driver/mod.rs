/*!
 * Driver Abstraction
 * Capability contract for mounted physical locations
 */

pub mod disk;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::types::{DriverId, OpenMode, StatData, VfsError, VfsResult};

pub use disk::DiskDriver;

/// One mounted backing store (directory, root passthrough, or archive).
///
/// Drivers are shared between the registry entry that owns the mount and
/// every descriptor currently open against them; lifetime is managed by
/// `Arc`. `shutdown` is called exactly once when the mount is removed,
/// before the registry drops its reference.
pub trait Driver: Send + Sync {
    /// Construct a native handle for a logical path
    fn open(&self, path: &str, mode: OpenMode) -> VfsResult<File>;

    /// Positioned read at `offset`. Never moves descriptor offsets;
    /// the facade advances them on success.
    fn read(&self, file: &File, buf: &mut [u8], offset: u64) -> VfsResult<usize>;

    /// Positioned write at `offset`, same offset contract as `read`
    fn write(&self, file: &File, buf: &[u8], offset: u64) -> VfsResult<usize>;

    /// Flush buffered data
    fn flush(&self, file: &File) -> VfsResult<()>;

    /// Release the native handle. The descriptor record itself belongs
    /// to the facade.
    fn close(&self, file: File);

    /// Split `pattern` into directory and glob, list the directory, and
    /// push every entry whose composed path matches into `out`. Returns
    /// false only if the directory itself cannot be opened.
    fn list_dir(&self, pattern: &str, out: &mut Vec<String>) -> bool;

    /// Explicit stub: file creation is not part of this layer
    fn create(&self, path: &str) -> VfsResult<()> {
        Err(VfsError::NotSupported(format!(
            "create is not implemented by the {} driver: {}",
            self.kind(),
            path
        )))
    }

    /// Explicit stub: file removal is not part of this layer
    fn remove(&self, path: &str) -> VfsResult<()> {
        Err(VfsError::NotSupported(format!(
            "remove is not implemented by the {} driver: {}",
            self.kind(),
            path
        )))
    }

    /// Query OS metadata for an open handle
    fn stat(&self, file: &File) -> VfsResult<StatData>;

    /// Called exactly once when the mount is removed from the registry
    fn shutdown(&self);

    /// Mount identifier, stable for the driver's lifetime
    fn id(&self) -> DriverId;

    /// Native mount path as supplied at registration
    fn base_path(&self) -> &Path;

    /// Absolute, normalized mount path
    fn abs_path(&self) -> &Path;

    /// Human-readable type tag: "plain", "root", or "pack"
    fn kind(&self) -> &'static str;
}

/// Constructor hook for archive drivers.
///
/// The facade calls this when a search path resolves to a file with a
/// recognized archive extension; the returned driver is registered
/// exactly like a plain one and must satisfy the full `Driver` contract.
pub trait PackDriverFactory: Send + Sync {
    fn create(
        &self,
        id: DriverId,
        abs_path: &Path,
        base_path: &Path,
    ) -> VfsResult<Arc<dyn Driver>>;
}
