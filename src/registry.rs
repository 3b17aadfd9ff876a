/*!
 * Search Path Registry
 * Ordered mapping from path-ID to the drivers mounted under it
 */

use std::path::Path;
use std::sync::Arc;

use crate::driver::Driver;
use crate::types::{AddType, DriverId};

/// Drivers registered under one path-ID
pub struct SearchPath {
    /// Case-folded key
    pub id: String,
    /// Search order; head inserts take priority
    pub drivers: Vec<Arc<dyn Driver>>,
    /// Identifiers of member drivers, for bulk descriptor cleanup
    pub client_ids: Vec<DriverId>,
    /// Excluded from the no-path-ID fan-out when set
    pub request_only: bool,
}

impl SearchPath {
    fn new(id: String) -> Self {
        Self {
            id,
            drivers: Vec::new(),
            client_ids: Vec::new(),
            request_only: false,
        }
    }
}

/// Registry of search paths in registration order
pub struct SearchPathRegistry {
    paths: Vec<SearchPath>,
}

impl SearchPathRegistry {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    pub fn get(&self, path_id: &str) -> Option<&SearchPath> {
        let key = path_id.to_ascii_lowercase();
        self.paths.iter().find(|p| p.id == key)
    }

    /// Lazily create the entry for a new path-ID
    fn get_or_insert(&mut self, path_id: &str) -> &mut SearchPath {
        let key = path_id.to_ascii_lowercase();
        if let Some(idx) = self.paths.iter().position(|p| p.id == key) {
            return &mut self.paths[idx];
        }
        self.paths.push(SearchPath::new(key));
        self.paths.last_mut().unwrap()
    }

    /// Register a driver at the head or tail of its path-ID's list
    pub fn insert_driver(&mut self, path_id: &str, driver: Arc<dyn Driver>, add: AddType) {
        let entry = self.get_or_insert(path_id);
        entry.client_ids.push(driver.id());
        match add {
            AddType::Head => entry.drivers.insert(0, driver),
            AddType::Tail => entry.drivers.push(driver),
        }
    }

    /// Remove one driver from a path-ID by native path equality
    pub fn remove_driver(&mut self, path_id: &str, abs_path: &Path) -> Option<Arc<dyn Driver>> {
        let key = path_id.to_ascii_lowercase();
        let entry = self.paths.iter_mut().find(|p| p.id == key)?;
        let idx = entry.drivers.iter().position(|d| d.abs_path() == abs_path)?;
        let driver = entry.drivers.remove(idx);
        entry.client_ids.retain(|id| *id != driver.id());
        Some(driver)
    }

    /// Remove a whole path-ID entry
    pub fn remove_path(&mut self, path_id: &str) -> Option<SearchPath> {
        let key = path_id.to_ascii_lowercase();
        let idx = self.paths.iter().position(|p| p.id == key)?;
        Some(self.paths.remove(idx))
    }

    /// Drain every entry for teardown
    pub fn take_all(&mut self) -> Vec<SearchPath> {
        std::mem::take(&mut self.paths)
    }

    pub fn mark_request_only(&mut self, path_id: &str, flag: bool) {
        self.get_or_insert(path_id).request_only = flag;
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchPath> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Default for SearchPathRegistry {
    fn default() -> Self {
        Self::new()
    }
}
