use photosift_core::{FileOps, MoveOperation};
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tempfile::tempdir;

fn stat(path: &Path) -> (u64, SystemTime) {
    let meta = fs::metadata(path).unwrap();
    (meta.len(), meta.modified().unwrap())
}

#[test]
fn test_undo_restores_paths_sizes_and_mtimes() {
    let tmp = tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    fs::create_dir_all(&src).unwrap();

    let names = ["a.jpg", "b.jpg", "c.jpg"];
    let mut before = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let path = src.join(name);
        fs::write(&path, vec![i as u8; (i + 1) * 100]).unwrap();
        before.push((path.clone(), stat(&path)));
    }

    let ops = FileOps::new();
    let paths: Vec<String> = before
        .iter()
        .map(|(p, _)| p.to_string_lossy().into_owned())
        .collect();
    ops.move_files(&paths, &dst.to_string_lossy()).unwrap();

    for (path, _) in &before {
        assert!(!path.exists());
    }

    ops.undo().unwrap();

    for (path, (size, mtime)) in &before {
        assert!(path.exists(), "{} not restored", path.display());
        let (new_size, new_mtime) = stat(path);
        assert_eq!(new_size, *size);
        assert_eq!(new_mtime, *mtime);
    }
    for name in names {
        assert!(!dst.join(name).exists());
    }
}

#[test]
fn test_undo_entries_pop_in_reverse_order() {
    let tmp = tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst1 = tmp.path().join("dst1");
    let dst2 = tmp.path().join("dst2");
    fs::create_dir_all(&src).unwrap();

    let a = src.join("a.jpg");
    fs::write(&a, b"a").unwrap();

    let ops = FileOps::new();

    // Move to dst1, then from dst1 to dst2.
    let first = ops
        .move_files(&[a.to_string_lossy().into_owned()], &dst1.to_string_lossy())
        .unwrap();
    ops.move_files(&[first[0].to.clone()], &dst2.to_string_lossy())
        .unwrap();
    assert_eq!(ops.undo_depth(), 2);

    // First undo: back to dst1. Second: back to src.
    ops.undo().unwrap();
    assert!(dst1.join("a.jpg").exists());
    ops.undo().unwrap();
    assert!(a.exists());
}

#[test]
fn test_move_batch_replay_creates_parents() {
    let tmp = tempdir().unwrap();
    let a = tmp.path().join("a.jpg");
    fs::write(&a, b"bytes").unwrap();
    let target = tmp.path().join("deeply/nested/dir/a.jpg");

    let ops = FileOps::new();
    ops.move_batch(&[MoveOperation {
        from: a.to_string_lossy().into_owned(),
        to: target.to_string_lossy().into_owned(),
    }])
    .unwrap();

    assert!(target.exists());
    assert_eq!(fs::read(target).unwrap(), b"bytes");
}

#[test]
fn test_partial_failure_keeps_successes_undoable() {
    let tmp = tempdir().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    let a = src.join("a.jpg");
    fs::write(&a, b"a").unwrap();

    // Destination path exists as a *file*: create_dir_all fails up front.
    let bad_dest = tmp.path().join("not_a_dir");
    fs::write(&bad_dest, b"occupied").unwrap();

    let ops = FileOps::new();
    assert!(ops
        .move_files(&[a.to_string_lossy().into_owned()], &bad_dest.to_string_lossy())
        .is_err());
    assert!(a.exists(), "nothing moved, source intact");
    assert_eq!(ops.undo_depth(), 0, "no undo entry for an empty batch");
}
