/*!
 * Descriptor Arena
 * Pooled allocation for open-file descriptor records
 */

use std::fs::File;
use std::sync::Arc;

use crate::driver::Driver;
use crate::types::{DriverId, FileHandle};

/// Slots added per growth step. Growth is incremental rather than
/// doubling: descriptor churn is bounded by concurrently open files,
/// so expansion is rare in steady state.
const GROW_CHUNK: usize = 32;

/// One open file
///
/// Only ever constructed by the facade and stored in the arena; the
/// handle returned to callers is the slot index.
pub struct FileDescriptor {
    /// Owning driver, shared with the registry entry
    pub(crate) driver: Arc<dyn Driver>,
    /// Logical path the file was opened under
    pub(crate) path: String,
    /// Native OS handle
    pub(crate) file: File,
    /// Current byte offset, advanced by the facade on successful I/O
    pub(crate) offset: u64,
    /// Cached size, -1 until the first successful size query
    pub(crate) size: i64,
}

impl FileDescriptor {
    pub(crate) fn new(driver: Arc<dyn Driver>, path: &str, file: File) -> Self {
        Self {
            driver,
            path: path.to_string(),
            file,
            offset: 0,
            size: -1,
        }
    }

    pub(crate) fn driver_id(&self) -> DriverId {
        self.driver.id()
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }
}

/// Growable pool of descriptor slots with free-list recycling
pub struct DescriptorArena {
    slots: Vec<Option<FileDescriptor>>,
    free: Vec<u32>,
    live: usize,
}

impl DescriptorArena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Store a descriptor, reusing a freed slot before growing the pool
    pub fn alloc(&mut self, desc: FileDescriptor) -> FileHandle {
        if self.free.is_empty() {
            let start = self.slots.len();
            self.slots.extend((0..GROW_CHUNK).map(|_| None));
            // Reverse so low indices are handed out first
            self.free.extend((start..start + GROW_CHUNK).rev().map(|i| i as u32));
        }
        let idx = self.free.pop().unwrap();
        self.slots[idx as usize] = Some(desc);
        self.live += 1;
        FileHandle(idx)
    }

    /// Release a slot, returning the descriptor for the caller to close
    pub fn free(&mut self, handle: FileHandle) -> Option<FileDescriptor> {
        let slot = self.slots.get_mut(handle.0 as usize)?;
        let desc = slot.take()?;
        self.free.push(handle.0);
        self.live -= 1;
        Some(desc)
    }

    pub fn get(&self, handle: FileHandle) -> Option<&FileDescriptor> {
        self.slots.get(handle.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: FileHandle) -> Option<&mut FileDescriptor> {
        self.slots.get_mut(handle.0 as usize)?.as_mut()
    }

    /// Drain every live descriptor and reset the pool. Outstanding
    /// handles are invalid after this call.
    pub fn clear(&mut self) -> Vec<FileDescriptor> {
        let drained = self
            .slots
            .iter_mut()
            .filter_map(|slot| slot.take())
            .collect();
        self.slots.clear();
        self.free.clear();
        self.live = 0;
        drained
    }

    /// Handles of all live descriptors
    pub fn handles(&self) -> Vec<FileHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| FileHandle(i as u32))
            .collect()
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for DescriptorArena {
    fn default() -> Self {
        Self::new()
    }
}
