/*!
 * Disk Driver
 * std::fs-backed driver covering plain (mount-relative) and root
 * (absolute-passthrough) mounts behind one path resolution strategy
 */

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::Driver;
use crate::types::{DriverId, FileKind, OpenMode, StatData, VfsError, VfsResult};
use crate::wildcard::wildcard_match;

/// How logical paths map onto the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathStyle {
    /// Compose mount-absolute + relative path; input must be relative
    Relative,
    /// Caller supplies an absolute path, passed through unchanged
    Passthrough,
}

/// Driver for one OS-directory mount or for raw absolute-path access
#[derive(Debug)]
pub struct DiskDriver {
    id: DriverId,
    base: PathBuf,
    abs: PathBuf,
    style: PathStyle,
}

impl DiskDriver {
    /// Mount an OS directory; opens resolve relative to `abs`
    pub fn plain(id: DriverId, abs: PathBuf, base: PathBuf) -> Self {
        Self {
            id,
            base,
            abs,
            style: PathStyle::Relative,
        }
    }

    /// Absolute-path passthrough driver
    pub fn root(id: DriverId) -> Self {
        Self {
            id,
            base: PathBuf::from("/"),
            abs: PathBuf::from("/"),
            style: PathStyle::Passthrough,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match self.style {
            PathStyle::Relative => {
                assert!(
                    !Path::new(path).is_absolute(),
                    "plain driver requires a relative path: {}",
                    path
                );
                self.abs.join(path)
            }
            PathStyle::Passthrough => {
                assert!(
                    Path::new(path).is_absolute(),
                    "root driver requires an absolute path: {}",
                    path
                );
                PathBuf::from(path)
            }
        }
    }

    fn classify(ft: fs::FileType) -> FileKind {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if ft.is_socket() {
                return FileKind::Socket;
            }
        }
        if ft.is_dir() {
            FileKind::Directory
        } else if ft.is_file() {
            FileKind::Regular
        } else {
            FileKind::Unknown
        }
    }
}

impl Driver for DiskDriver {
    fn open(&self, path: &str, mode: OpenMode) -> VfsResult<File> {
        let full = self.resolve(path);
        mode.to_open_options()
            .open(&full)
            .map_err(|e| VfsError::from_io(e, format!("open {}", full.display())))
    }

    fn read(&self, file: &File, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            file.read_at(buf, offset)
                .map_err(|e| VfsError::from_io(e, "read"))
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            file.seek_read(buf, offset)
                .map_err(|e| VfsError::from_io(e, "read"))
        }
    }

    fn write(&self, file: &File, buf: &[u8], offset: u64) -> VfsResult<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            file.write_at(buf, offset)
                .map_err(|e| VfsError::from_io(e, "write"))
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            file.seek_write(buf, offset)
                .map_err(|e| VfsError::from_io(e, "write"))
        }
    }

    fn flush(&self, _file: &File) -> VfsResult<()> {
        // Data is durable at the syscall boundary on POSIX; nothing
        // buffered at this layer.
        #[cfg(unix)]
        {
            Ok(())
        }
        #[cfg(not(unix))]
        {
            unimplemented!("flush is not implemented on this platform")
        }
    }

    fn close(&self, file: File) {
        drop(file);
    }

    fn list_dir(&self, pattern: &str, out: &mut Vec<String>) -> bool {
        let full_pattern = self.resolve(pattern).to_string_lossy().into_owned();
        let dir = match full_pattern.rfind(['/', '\\']) {
            Some(idx) => &full_pattern[..idx.max(1)],
            None => ".",
        };

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return false,
        };

        for entry in entries.flatten() {
            let composed = entry.path().to_string_lossy().into_owned();
            if wildcard_match(&composed, &full_pattern, false) {
                out.push(composed);
            }
        }
        true
    }

    fn stat(&self, file: &File) -> VfsResult<StatData> {
        let md = file
            .metadata()
            .map_err(|e| VfsError::from_io(e, "stat"))?;
        Ok(StatData {
            kind: Self::classify(md.file_type()),
            size: md.len(),
        })
    }

    fn shutdown(&self) {
        debug!(id = %self.id, kind = self.kind(), "driver shutdown");
    }

    fn id(&self) -> DriverId {
        self.id
    }

    fn base_path(&self) -> &Path {
        &self.base
    }

    fn abs_path(&self) -> &Path {
        &self.abs
    }

    fn kind(&self) -> &'static str {
        match self.style {
            PathStyle::Relative => "plain",
            PathStyle::Passthrough => "root",
        }
    }
}
