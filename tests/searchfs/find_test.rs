/*!
 * Find Iteration Tests
 * FindFirst/FindNext state machine and wildcard listing
 */

use pretty_assertions::assert_eq;
use searchfs::{AddType, SearchFs};
use tempfile::TempDir;

#[test]
fn test_find_iteration_terminal_behavior() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("a.map"), b"").unwrap();
    std::fs::write(temp.path().join("b.map"), b"").unwrap();
    std::fs::write(temp.path().join("c.txt"), b"").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "game", AddType::Tail);

    let (handle, first) = fs.find_first("*.map", Some("game")).unwrap();
    let second = fs.find_next(handle).unwrap();

    let mut found = vec![first, second];
    found.sort();
    assert!(found[0].ends_with("a.map"));
    assert!(found[1].ends_with("b.map"));

    // Exhaustion is terminal and idempotent
    assert_eq!(fs.find_next(handle), None);
    assert_eq!(fs.find_next(handle), None);

    fs.find_close(handle);
    assert_eq!(fs.find_next(handle), None);
}

#[test]
fn test_find_no_match_creates_no_state() {
    let temp = TempDir::new().unwrap();
    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "game", AddType::Tail);

    assert!(fs.find_first("*.nothing", Some("game")).is_none());
    assert!(fs.find_first("*.map", Some("unknown")).is_none());
}

#[test]
fn test_find_aggregates_across_search_paths() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    std::fs::write(dir_a.path().join("one.cfg"), b"").unwrap();
    std::fs::write(dir_b.path().join("two.cfg"), b"").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(dir_a.path().to_str().unwrap(), "game", AddType::Tail);
    fs.add_search_path(dir_b.path().to_str().unwrap(), "game", AddType::Tail);

    let (handle, first) = fs.find_first("*.cfg", Some("game")).unwrap();
    let mut found = vec![first];
    while let Some(next) = fs.find_next(handle) {
        found.push(next);
    }
    fs.find_close(handle);

    assert_eq!(found.len(), 2);
    // Drivers are consulted in search order, so the first mount's
    // matches lead the aggregate list
    assert!(found[0].ends_with("one.cfg"));
    assert!(found[1].ends_with("two.cfg"));
}

#[test]
fn test_find_is_directory() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("maps")).unwrap();
    // A star never matches a leading dot, so the sibling needs a
    // dot-free suffix to land in the same listing
    std::fs::write(temp.path().join("mapsrc"), b"").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(temp.path().to_str().unwrap(), "game", AddType::Tail);

    let (handle, first) = fs.find_first("maps*", Some("game")).unwrap();
    let mut entries = vec![(first.clone(), fs.find_is_directory(handle))];
    while let Some(next) = fs.find_next(handle) {
        entries.push((next, fs.find_is_directory(handle)));
    }
    fs.find_close(handle);

    entries.sort();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].0.ends_with("maps"));
    assert!(entries[0].1);
    assert!(entries[1].0.ends_with("mapsrc"));
    assert!(!entries[1].1);
}

#[test]
fn test_find_absolute_pattern_uses_root_driver() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("root.log"), b"").unwrap();

    let fs = SearchFs::new();
    let pattern = temp.path().join("*.log");
    let (handle, first) = fs.find_first(pattern.to_str().unwrap(), None).unwrap();
    assert!(first.ends_with("root.log"));
    assert_eq!(fs.find_next(handle), None);
    fs.find_close(handle);
}

#[test]
fn test_find_skips_request_only_in_fan_out() {
    let visible = TempDir::new().unwrap();
    let hidden = TempDir::new().unwrap();
    std::fs::write(visible.path().join("v.res"), b"").unwrap();
    std::fs::write(hidden.path().join("h.res"), b"").unwrap();

    let fs = SearchFs::new();
    fs.add_search_path(visible.path().to_str().unwrap(), "game", AddType::Tail);
    fs.add_search_path(hidden.path().to_str().unwrap(), "download", AddType::Tail);
    fs.mark_path_id_request_only("download", true);

    let (handle, first) = fs.find_first("*.res", None).unwrap();
    assert!(first.ends_with("v.res"));
    assert_eq!(fs.find_next(handle), None);
    fs.find_close(handle);

    // Still reachable when named explicitly
    let (handle, first) = fs.find_first("*.res", Some("download")).unwrap();
    assert!(first.ends_with("h.res"));
    fs.find_close(handle);
}
