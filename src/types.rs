/*!
 * Core Types
 * Handles, file kinds, errors, and open-mode parsing
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use thiserror::Error;

/// Filesystem operation result
pub type VfsResult<T> = Result<T, VfsError>;

/// Filesystem errors
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum VfsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(u32),

    #[error("Unknown path ID: {0}")]
    UnknownPathId(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl VfsError {
    /// Classify a std::io::Error with context
    pub fn from_io(e: std::io::Error, context: impl Into<String>) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => VfsError::NotFound(context.into()),
            ErrorKind::PermissionDenied => VfsError::PermissionDenied(context.into()),
            _ => VfsError::IoError(format!("{}: {}", context.into(), e)),
        }
    }
}

/// Driver identifier, unique per mount (32-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(pub u32);

/// Open file handle, opaque outside the facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileHandle(pub u32);

/// Directory iteration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindHandle(pub u32);

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FindHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// File type classification from stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Unknown,
    Directory,
    Regular,
    Socket,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FileKind::Unknown => write!(f, "unknown"),
            FileKind::Directory => write!(f, "directory"),
            FileKind::Regular => write!(f, "regular"),
            FileKind::Socket => write!(f, "socket"),
        }
    }
}

/// File metadata from a driver stat
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatData {
    pub kind: FileKind,
    pub size: u64,
}

impl StatData {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_regular(&self) -> bool {
        self.kind == FileKind::Regular
    }
}

/// Parsed open-mode flags
///
/// Built from fopen-style mode strings. Recognized letters:
/// `r` read, `w` write, `b` binary, `t` truncate, `a` append,
/// `c` close-on-exec, `+` update (read and write). Anything else
/// is a caller bug and panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub binary: bool,
    pub truncate: bool,
    pub append: bool,
    pub close_on_exec: bool,
}

impl OpenMode {
    /// Scan a mode string character by character
    pub fn parse(mode: &str) -> Self {
        let mut parsed = Self::default();
        for ch in mode.chars() {
            match ch {
                'r' => parsed.read = true,
                'w' => parsed.write = true,
                'b' => parsed.binary = true,
                't' => parsed.truncate = true,
                'a' => parsed.append = true,
                'c' => parsed.close_on_exec = true,
                '+' => {
                    parsed.read = true;
                    parsed.write = true;
                }
                other => panic!("unrecognized open mode character {:?} in {:?}", other, mode),
            }
        }
        parsed
    }

    /// Write intent: files are auto-created on write or append
    pub fn wants_write(&self) -> bool {
        self.write || self.append
    }

    /// Map to std OpenOptions
    ///
    /// Rust's std opens files with O_CLOEXEC on every supported unix,
    /// so the `c` flag needs no extra work here.
    pub(crate) fn to_open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.read);
        options.write(self.write && !self.append);
        options.append(self.append);
        options.truncate(self.truncate);
        options.create(self.wants_write());
        options
    }
}

/// Where a new search path lands within its path-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddType {
    Head,
    Tail,
}

/// Seek origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute from start of file
    Head,
    /// Relative to current offset
    Current,
    /// Relative to end of file, computed as size - pos
    Tail,
}
