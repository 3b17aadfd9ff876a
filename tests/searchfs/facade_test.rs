/*!
 * Facade Tests
 * Search-path resolution, descriptor lifecycle, and driver sharing
 */

use pretty_assertions::assert_eq;
use searchfs::{
    AddType, DiskDriver, Driver, DriverId, OpenMode, SearchFs, StatData, VfsResult, Whence,
};
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Disk driver wrapper that counts stat calls
struct CountingDriver {
    inner: DiskDriver,
    stat_calls: AtomicUsize,
}

impl CountingDriver {
    fn plain(id: DriverId, root: &Path) -> Self {
        Self {
            inner: DiskDriver::plain(id, root.to_path_buf(), root.to_path_buf()),
            stat_calls: AtomicUsize::new(0),
        }
    }

    fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::Relaxed)
    }
}

impl Driver for CountingDriver {
    fn open(&self, path: &str, mode: OpenMode) -> VfsResult<File> {
        self.inner.open(path, mode)
    }

    fn read(&self, file: &File, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        self.inner.read(file, buf, offset)
    }

    fn write(&self, file: &File, buf: &[u8], offset: u64) -> VfsResult<usize> {
        self.inner.write(file, buf, offset)
    }

    fn flush(&self, file: &File) -> VfsResult<()> {
        self.inner.flush(file)
    }

    fn close(&self, file: File) {
        self.inner.close(file)
    }

    fn list_dir(&self, pattern: &str, out: &mut Vec<String>) -> bool {
        self.inner.list_dir(pattern, out)
    }

    fn stat(&self, file: &File) -> VfsResult<StatData> {
        self.stat_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.stat(file)
    }

    fn shutdown(&self) {
        self.inner.shutdown()
    }

    fn id(&self) -> DriverId {
        self.inner.id()
    }

    fn base_path(&self) -> &Path {
        self.inner.base_path()
    }

    fn abs_path(&self) -> &Path {
        self.inner.abs_path()
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }
}

#[test]
fn test_end_to_end_mount_open_read_close() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("hello.txt"), b"hello, world").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "TEST", AddType::Tail);

    let handle = fs.open("hello.txt", "r", Some("TEST")).unwrap();
    assert_eq!(fs.open_count(), 1);

    let mut buf = vec![0u8; 32];
    let n = fs.read(handle, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"hello, world");

    // A second read continues from the advanced offset
    assert_eq!(fs.read(handle, &mut buf).unwrap(), 0);

    fs.close(handle).unwrap();
    assert_eq!(fs.open_count(), 0);

    fs.remove_search_paths("TEST");
    assert!(fs.get_search_path("TEST", true).is_empty());
    assert!(fs.open("hello.txt", "r", Some("TEST")).is_err());
}

#[test]
fn test_driver_refcount_tracks_open_descriptors() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("f.txt"), b"data").unwrap();

    let fs = SearchFs::new();
    let driver = Arc::new(CountingDriver::plain(fs.next_driver_id(), temp.path()));
    fs.mount_driver("game", driver.clone() as Arc<dyn Driver>, AddType::Tail);

    // One count here, one in the registry
    assert_eq!(Arc::strong_count(&driver), 2);

    let h1 = fs.open("f.txt", "r", Some("game")).unwrap();
    let h2 = fs.open("f.txt", "r", Some("game")).unwrap();
    assert_eq!(Arc::strong_count(&driver), 4);

    fs.close(h1).unwrap();
    assert_eq!(Arc::strong_count(&driver), 3);

    // Bulk removal closes the remaining descriptor and drops the
    // registry's reference
    fs.remove_search_paths("game");
    assert_eq!(Arc::strong_count(&driver), 1);
    assert!(fs.close(h2).is_err());
    assert_eq!(fs.open_count(), 0);
}

#[test]
fn test_search_order_determinism() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let dir_c = TempDir::new().unwrap();
    std::fs::write(dir_b.path().join("x.txt"), b"from b").unwrap();
    std::fs::write(dir_c.path().join("x.txt"), b"from c").unwrap();

    let fs = SearchFs::new();
    for dir in [&dir_a, &dir_b, &dir_c] {
        fs.add_search_path(dir.path().to_str().unwrap(), "GAME", AddType::Tail);
    }

    // First match wins: B shadows C, A has no candidate
    for _ in 0..3 {
        let handle = fs.open("x.txt", "r", Some("GAME")).unwrap();
        let mut buf = [0u8; 6];
        fs.read(handle, &mut buf).unwrap();
        assert_eq!(&buf, b"from b");
        fs.close(handle).unwrap();
    }
}

#[test]
fn test_head_insert_takes_priority() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let dir_d = TempDir::new().unwrap();
    for (dir, content) in [(&dir_a, "a"), (&dir_b, "b"), (&dir_d, "d")] {
        std::fs::write(dir.path().join("x.txt"), content).unwrap();
    }

    let fs = SearchFs::new();
    fs.add_search_path(dir_a.path().to_str().unwrap(), "game", AddType::Tail);
    fs.add_search_path(dir_b.path().to_str().unwrap(), "game", AddType::Tail);
    fs.add_search_path(dir_d.path().to_str().unwrap(), "game", AddType::Head);

    let handle = fs.open("x.txt", "r", Some("game")).unwrap();
    let mut buf = [0u8; 1];
    fs.read(handle, &mut buf).unwrap();
    assert_eq!(&buf, b"d");
    fs.close(handle).unwrap();

    let joined = fs.get_search_path("game", false);
    let parts: Vec<&str> = joined.split(';').collect();
    assert_eq!(parts[0], dir_d.path().to_str().unwrap());
}

#[test]
fn test_seek_clamps_to_file_bounds() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("ten.bin"), b"0123456789").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "game", AddType::Tail);
    let handle = fs.open("ten.bin", "r", Some("game")).unwrap();

    assert_eq!(fs.seek(handle, 25, Whence::Head).unwrap(), 10);
    assert_eq!(fs.seek(handle, -5, Whence::Head).unwrap(), 0);
    assert_eq!(fs.seek(handle, 3, Whence::Tail).unwrap(), 7);
    assert_eq!(fs.seek(handle, 25, Whence::Tail).unwrap(), 0);
    assert_eq!(fs.seek(handle, 4, Whence::Head).unwrap(), 4);
    assert_eq!(fs.seek(handle, 100, Whence::Current).unwrap(), 10);
    assert_eq!(fs.tell(handle).unwrap(), 10);

    // Reads resume from the clamped offset
    fs.seek(handle, 2, Whence::Tail).unwrap();
    let mut buf = [0u8; 2];
    assert_eq!(fs.read(handle, &mut buf).unwrap(), 2);
    assert_eq!(&buf, b"89");

    fs.close(handle).unwrap();
}

#[test]
fn test_size_is_cached_after_first_stat() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("f.txt"), b"12345").unwrap();

    let fs = SearchFs::new();
    let driver = Arc::new(CountingDriver::plain(fs.next_driver_id(), temp.path()));
    fs.mount_driver("game", driver.clone() as Arc<dyn Driver>, AddType::Tail);

    let handle = fs.open("f.txt", "r", Some("game")).unwrap();
    assert_eq!(driver.stat_calls(), 0);

    assert_eq!(fs.size(handle).unwrap(), 5);
    assert_eq!(driver.stat_calls(), 1);

    // Second query answers from the cached value
    assert_eq!(fs.size(handle).unwrap(), 5);
    assert_eq!(driver.stat_calls(), 1);

    fs.close(handle).unwrap();
}

#[test]
fn test_size_of_by_name() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("f.txt"), b"1234567").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "game", AddType::Tail);

    assert_eq!(fs.size_of("f.txt", Some("game")).unwrap(), 7);
    assert_eq!(fs.open_count(), 0);
    assert!(fs.size_of("missing.txt", Some("game")).is_err());
}

#[test]
fn test_file_exists_and_is_directory() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("f.txt"), b"x").unwrap();
    std::fs::create_dir(temp.path().join("sub")).unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "game", AddType::Tail);

    assert!(fs.file_exists("f.txt", Some("game")));
    assert!(!fs.file_exists("missing.txt", Some("game")));
    assert!(fs.file_exists(temp.path().join("f.txt").to_str().unwrap(), None));

    assert!(fs.is_directory("sub", Some("game")));
    assert!(!fs.is_directory("f.txt", Some("game")));
    assert!(!fs.is_directory("missing", Some("game")));

    // Existence probes leave nothing open behind
    assert_eq!(fs.open_count(), 0);
}

#[test]
fn test_write_through_search_path() {
    let temp = TempDir::new().unwrap();
    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "game", AddType::Tail);

    let handle = fs.open("out.txt", "w", Some("game")).unwrap();
    assert_eq!(fs.write(handle, b"written").unwrap(), 7);
    fs.flush(handle).unwrap();
    fs.close(handle).unwrap();

    assert_eq!(std::fs::read(temp.path().join("out.txt")).unwrap(), b"written");
    assert_eq!(fs.stats().bytes_written, 7);
}

#[test]
fn test_remove_single_search_path() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    std::fs::write(dir_b.path().join("x.txt"), b"b").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(dir_a.path().to_str().unwrap(), "game", AddType::Tail);
    fs.add_search_path(dir_b.path().to_str().unwrap(), "game", AddType::Tail);

    assert!(fs.remove_search_path(dir_a.path().to_str().unwrap(), "game"));
    assert!(!fs.remove_search_path(dir_a.path().to_str().unwrap(), "game"));

    // The remaining mount still resolves
    let handle = fs.open("x.txt", "r", Some("game")).unwrap();
    fs.close(handle).unwrap();
}

#[test]
fn test_remove_all_search_paths_teardown() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("f.txt"), b"x").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "game", AddType::Tail);
    fs.add_search_path(temp.path().to_str().unwrap(), "hl2", AddType::Tail);

    let _h1 = fs.open("f.txt", "r", Some("game")).unwrap();
    let _h2 = fs.open("f.txt", "r", Some("hl2")).unwrap();
    assert_eq!(fs.open_count(), 2);

    fs.remove_all_search_paths();
    assert_eq!(fs.open_count(), 0);
    assert!(fs.get_search_path("game", true).is_empty());

    // Idempotent on an empty registry
    fs.remove_all_search_paths();
}

#[test]
fn test_path_id_case_insensitive_at_facade() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("f.txt"), b"x").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "GAME", AddType::Tail);

    let handle = fs.open("f.txt", "r", Some("game")).unwrap();
    fs.close(handle).unwrap();
    let handle = fs.open("f.txt", "r", Some("Game")).unwrap();
    fs.close(handle).unwrap();
}
