/*!
 * Interface Lookup
 * Thin version-string factory adapter for plugin-style hosts
 */

use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::facade::SearchFs;

/// Version name under which the filesystem registers itself
pub const FILESYSTEM_INTERFACE_VERSION: &str = "SearchFileSystem001";

/// Name-keyed lookup for shared filesystem instances.
///
/// Hosts that load this crate as a plugin resolve the facade by version
/// string instead of linking against the concrete type. The facade
/// itself stays an explicit object; this adapter only hands out shared
/// references.
pub struct InterfaceRegistry {
    entries: RwLock<HashMap<String, Arc<SearchFs>, RandomState>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    pub fn register(&self, version: &str, fs: Arc<SearchFs>) {
        self.entries.write().insert(version.to_string(), fs);
    }

    pub fn query(&self, version: &str) -> Option<Arc<SearchFs>> {
        self.entries.read().get(version).cloned()
    }
}

impl Default for InterfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
