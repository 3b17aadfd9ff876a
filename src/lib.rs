/*!
 * searchfs
 * Search-path-based virtual filesystem layer with driver-polymorphic
 * backing stores and pooled descriptor allocation
 */

pub mod arena;
pub mod driver;
pub mod facade;
pub mod interface;
pub mod registry;
pub mod stats;
pub mod types;
pub mod wildcard;

// Re-exports
pub use arena::DescriptorArena;
pub use driver::{DiskDriver, Driver, PackDriverFactory};
pub use facade::{FsConfig, SearchFs};
pub use interface::{InterfaceRegistry, FILESYSTEM_INTERFACE_VERSION};
pub use stats::StatsSnapshot;
pub use types::{
    AddType, DriverId, FileHandle, FileKind, FindHandle, OpenMode, StatData, VfsError, VfsResult,
    Whence,
};
pub use wildcard::wildcard_match;
