use photosift_core::model::RelatedKind;
use photosift_core::progress::{ProgressReporter, ScanPhase, ScanProgress};
use photosift_core::select::{duplicate_groups, fully_selected_groups, SelectRules};
use photosift_core::{Error, LogicalPhoto, ScanEngine, SilentReporter};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn scan(engine: &ScanEngine, root: &Path) -> Vec<LogicalPhoto> {
    engine
        .scan(&[root.to_string_lossy().into_owned()], &SilentReporter)
        .unwrap()
}

/// `root/shoot/IMG_001.{ARW,JPG,xmp}` plus two copies of the same JPEG in
/// sibling folders.
fn create_photo_tree(root: &Path) {
    let shoot = root.join("shoot");
    let exports = root.join("exports");
    let backup = root.join("backup");
    fs::create_dir_all(&shoot).unwrap();
    fs::create_dir_all(&exports).unwrap();
    fs::create_dir_all(&backup).unwrap();

    fs::write(shoot.join("IMG_001.ARW"), vec![0x11u8; 10_000]).unwrap();
    fs::write(shoot.join("IMG_001.JPG"), vec![0x22u8; 2_000]).unwrap();
    fs::write(shoot.join("IMG_001.xmp"), b"<x:xmpmeta/>").unwrap();

    let vacation = vec![0x33u8; 4_096];
    fs::write(exports.join("vacation.jpg"), &vacation).unwrap();
    fs::write(backup.join("vacation_copy.jpg"), &vacation).unwrap();

    fs::write(exports.join("unique.png"), vec![0x44u8; 1_234]).unwrap();
}

#[test]
fn test_full_scan_pipeline() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_photo_tree(&root);

    let cache_dir = tempdir().unwrap();
    let engine = ScanEngine::new().with_cache_path(cache_dir.path().join("cache.db"));
    let photos = scan(&engine, &root);

    // IMG_001 collapses to one photo; vacation pair + unique.png stand alone.
    assert_eq!(photos.len(), 4);

    let img = photos.iter().find(|p| p.name == "IMG_001.ARW").unwrap();
    assert_eq!(img.related_files.len(), 2);
    assert!(img
        .related_files
        .iter()
        .any(|r| r.name == "IMG_001.JPG" && r.kind == RelatedKind::JpegPreview));
    assert!(img
        .related_files
        .iter()
        .any(|r| r.name == "IMG_001.xmp" && r.kind == RelatedKind::Sidecar));
    assert!(img.thumbnail_path.as_deref().unwrap().ends_with("IMG_001.JPG"));
    assert!(!img.is_duplicate);

    // The vacation pair is a confirmed duplicate group.
    let keeper = photos.iter().find(|p| p.name == "vacation.jpg").unwrap();
    let copy = photos
        .iter()
        .find(|p| p.name == "vacation_copy.jpg")
        .unwrap();
    assert!(!keeper.is_duplicate, "shortest path is the keeper");
    assert!(copy.is_duplicate);
    assert_eq!(copy.duplicate_of.as_deref(), Some(keeper.id.as_str()));
    assert_eq!(copy.hash, keeper.hash);
    assert!(keeper.hash.is_some());

    let unique = photos.iter().find(|p| p.name == "unique.png").unwrap();
    assert!(!unique.is_duplicate);
    assert!(unique.hash.is_none(), "singleton sizes are never hashed");
}

#[test]
fn test_emitted_paths_are_pairwise_disjoint() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_photo_tree(&root);

    let cache_dir = tempdir().unwrap();
    let engine = ScanEngine::new().with_cache_path(cache_dir.path().join("cache.db"));
    let photos = scan(&engine, &root);

    let mut seen: HashSet<&str> = HashSet::new();
    for photo in &photos {
        assert!(seen.insert(&photo.path), "duplicate path {}", photo.path);
        for related in &photo.related_files {
            assert!(seen.insert(&related.path), "duplicate path {}", related.path);
        }
    }
}

#[test]
fn test_second_scan_serves_hashes_from_cache() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    fs::create_dir_all(&root).unwrap();

    let content = vec![0xABu8; 8_192];
    let a = root.join("a.jpg");
    let b = root.join("b.jpg");
    fs::write(&a, &content).unwrap();
    fs::write(&b, &content).unwrap();

    let cache_dir = tempdir().unwrap();
    let engine = ScanEngine::new().with_cache_path(cache_dir.path().join("cache.db"));

    let first = scan(&engine, &root);
    let first_hash = first
        .iter()
        .find(|p| p.name == "a.jpg")
        .unwrap()
        .hash
        .clone()
        .unwrap();
    let original_mtime = fs::metadata(&a).unwrap().modified().unwrap();

    // Rewrite `a` with different bytes of the same size, then restore its
    // mtime. A cache-honoring engine must serve the old digest without
    // opening the file.
    fs::write(&a, vec![0xCDu8; 8_192]).unwrap();
    let f = fs::File::options().write(true).open(&a).unwrap();
    f.set_modified(original_mtime).unwrap();
    drop(f);

    let second = scan(&engine, &root);
    let second_hash = second
        .iter()
        .find(|p| p.name == "a.jpg")
        .unwrap()
        .hash
        .clone()
        .unwrap();
    assert_eq!(
        first_hash, second_hash,
        "unchanged (size, mtime) must not be re-read"
    );
}

#[test]
fn test_touched_file_is_rehashed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    fs::create_dir_all(&root).unwrap();

    // Three identical files: one duplicate group of three.
    let content = vec![0xABu8; 8_192];
    let a = root.join("a.jpg");
    fs::write(&a, &content).unwrap();
    fs::write(root.join("b.jpg"), &content).unwrap();
    fs::write(root.join("c.jpg"), &content).unwrap();

    let cache_dir = tempdir().unwrap();
    let engine = ScanEngine::new().with_cache_path(cache_dir.path().join("cache.db"));

    let first = scan(&engine, &root);
    assert_eq!(first.iter().filter(|p| p.is_duplicate).count(), 2);

    // Rewrite `a` with new content, same size, new mtime: the stale cache
    // row must be ignored and `a` must drop out of the group.
    fs::write(&a, vec![0xCDu8; 8_192]).unwrap();
    let f = fs::File::options().write(true).open(&a).unwrap();
    f.set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(10))
        .unwrap();
    drop(f);

    let second = scan(&engine, &root);
    let a_photo = second.iter().find(|p| p.name == "a.jpg").unwrap();
    assert!(
        !a_photo.is_duplicate && a_photo.duplicate_of.is_none(),
        "a stale cache entry was served for a modified file"
    );
    // b and c still form a group of two.
    assert_eq!(second.iter().filter(|p| p.is_duplicate).count(), 1);
}

struct ReentrantScanProbe {
    engine: Arc<ScanEngine>,
    root: String,
    result: Mutex<Option<bool>>,
}

impl ProgressReporter for ReentrantScanProbe {
    fn on_scan_progress(&self, progress: &ScanProgress) {
        if progress.phase != ScanPhase::Starting {
            return;
        }
        let mut slot = self.result.lock().unwrap();
        if slot.is_none() {
            let overlapping = self
                .engine
                .scan(&[self.root.clone()], &SilentReporter);
            *slot = Some(matches!(overlapping, Err(Error::ScanInProgress)));
        }
    }
}

#[test]
fn test_overlapping_scan_is_rejected() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.jpg"), b"x").unwrap();

    let cache_dir = tempdir().unwrap();
    let engine = Arc::new(
        ScanEngine::new().with_cache_path(cache_dir.path().join("cache.db")),
    );

    let probe = ReentrantScanProbe {
        engine: engine.clone(),
        root: root.to_string_lossy().into_owned(),
        result: Mutex::new(None),
    };

    engine
        .scan(&[root.to_string_lossy().into_owned()], &probe)
        .unwrap();

    assert_eq!(
        *probe.result.lock().unwrap(),
        Some(true),
        "a scan started while one is running must fail with ScanInProgress"
    );

    // The engine is usable again afterwards.
    engine
        .scan(&[root.to_string_lossy().into_owned()], &SilentReporter)
        .unwrap();
}

#[test]
fn test_progress_phases_bracket_the_scan() {
    struct PhaseCollector {
        phases: Mutex<Vec<ScanPhase>>,
    }
    impl ProgressReporter for PhaseCollector {
        fn on_scan_progress(&self, progress: &ScanProgress) {
            if progress.boundary {
                self.phases.lock().unwrap().push(progress.phase);
            }
        }
    }

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");
    create_photo_tree(&root);

    let cache_dir = tempdir().unwrap();
    let engine = ScanEngine::new().with_cache_path(cache_dir.path().join("cache.db"));
    let collector = PhaseCollector {
        phases: Mutex::new(Vec::new()),
    };
    engine
        .scan(&[root.to_string_lossy().into_owned()], &collector)
        .unwrap();

    let phases = collector.phases.lock().unwrap();
    assert_eq!(phases.first(), Some(&ScanPhase::Starting));
    assert_eq!(phases.last(), Some(&ScanPhase::Complete));
    for phase in [
        ScanPhase::Discovery,
        ScanPhase::Grouping,
        ScanPhase::Analyzing,
        ScanPhase::TrailingHash,
        ScanPhase::Hashing,
        ScanPhase::Duplicates,
        ScanPhase::Preparing,
        ScanPhase::Rendering,
    ] {
        assert!(phases.contains(&phase), "missing phase {}", phase);
    }
}

#[test]
fn test_smart_select_over_scan_results() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("library");

    // Three copies of one image across a Dropbox-like layout.
    let organized = root.join("Dropbox/Camera Uploads/2022");
    let uploads = root.join("Dropbox/Camera Uploads");
    let desktop = root.join("Desktop");
    fs::create_dir_all(&organized).unwrap();
    fs::create_dir_all(&desktop).unwrap();

    let content = vec![0x99u8; 2_048];
    fs::write(organized.join("2022-07-04 10.00.00.jpg"), &content).unwrap();
    fs::write(uploads.join("DSC001.JPG"), &content).unwrap();
    fs::write(desktop.join("random.jpg"), &content).unwrap();

    let cache_dir = tempdir().unwrap();
    let engine = ScanEngine::new().with_cache_path(cache_dir.path().join("cache.db"));
    let photos = scan(&engine, &root);

    let groups = duplicate_groups(&photos);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].members.len(), 3);

    let deletions = SelectRules::new().recommend_deletions(&groups);
    assert_eq!(deletions.len(), 2);

    let kept = photos
        .iter()
        .find(|p| p.name == "2022-07-04 10.00.00.jpg")
        .unwrap();
    assert!(!deletions.contains(&kept.id));

    // The recommendation never empties a group.
    assert_eq!(fully_selected_groups(&groups, &deletions), 0);
}
