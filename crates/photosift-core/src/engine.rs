use crate::cache::HashCache;
use crate::config;
use crate::detector;
use crate::error::{Error, Result};
use crate::model::LogicalPhoto;
use crate::progress::{ProgressReporter, ScanPhase, ScanProgress};
use crate::scanner;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Orchestrates one scan: discovery → collapsing → duplicate detection,
/// with the hash cache shared across phases and progress tapped at every
/// boundary.
///
/// Scans never interleave: a second call while one is running is rejected
/// with [`Error::ScanInProgress`]. Cancellation is cooperative; a
/// cancelled scan finishes its in-flight hash, emits the `cancelled`
/// phase, and returns whatever was classified so far.
pub struct ScanEngine {
    cache_path: PathBuf,
    cancel: Arc<AtomicBool>,
    scan_lock: Mutex<()>,
}

impl ScanEngine {
    pub fn new() -> Self {
        Self {
            cache_path: HashCache::default_path(),
            cancel: Arc::new(AtomicBool::new(false)),
            scan_lock: Mutex::new(()),
        }
    }

    /// Override the hash cache location (tests, portable installs).
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Token observed by discovery and detection. Store `true` to request
    /// cancellation; `scan` resets it at start.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Scan `roots` and return the annotated photo list.
    pub fn scan(
        &self,
        roots: &[String],
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<LogicalPhoto>> {
        let _guard = self.scan_lock.try_lock().map_err(|_| Error::ScanInProgress)?;
        self.cancel.store(false, Ordering::Relaxed);

        let emit = |progress: ScanProgress| reporter.on_scan_progress(&progress);
        let scan_start = Instant::now();

        emit(ScanProgress::boundary(ScanPhase::Starting, 0, 0, "Starting scan"));

        let roots = config::non_overlapping_directories(roots.to_vec());
        info!("scanning {} roots", roots.len());

        let cache = HashCache::open_at(&self.cache_path);

        // Discovery.
        emit(ScanProgress::boundary(
            ScanPhase::Discovery,
            0,
            0,
            "Discovering files",
        ));
        let files = match scanner::discover_files(&roots, &self.cancel) {
            Ok(files) => files,
            Err(Error::Cancelled) => {
                emit(ScanProgress::boundary(ScanPhase::Cancelled, 0, 0, "Scan cancelled"));
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let file_count = files.len();
        emit(ScanProgress::boundary(
            ScanPhase::Discovery,
            file_count,
            file_count,
            &format!("Found {} files", file_count),
        ));
        debug!("discovered {} files in {:.2}s", file_count, scan_start.elapsed().as_secs_f64());

        // Collapse into logical photos.
        emit(ScanProgress::boundary(
            ScanPhase::Grouping,
            0,
            file_count,
            "Grouping related files",
        ));
        emit(ScanProgress::boundary(
            ScanPhase::Analyzing,
            0,
            file_count,
            "Collapsing into photos",
        ));
        let mut photos = scanner::collapse_into_photos(files);
        let photo_count = photos.len();
        emit(ScanProgress::boundary(
            ScanPhase::Analyzing,
            file_count,
            file_count,
            &format!("{} photos", photo_count),
        ));

        // Duplicate detection (emits trailing_hash / hashing internally).
        let detect_start = Instant::now();
        let stats = detector::detect_duplicates(&mut photos, &cache, reporter, &self.cancel)?;
        debug!(
            "detection finished in {:.2}s ({} candidates)",
            detect_start.elapsed().as_secs_f64(),
            stats.candidates
        );

        if stats.cancelled {
            emit(ScanProgress::boundary(
                ScanPhase::Cancelled,
                photo_count,
                photo_count,
                "Scan cancelled",
            ));
            return Ok(photos);
        }

        emit(ScanProgress::boundary(
            ScanPhase::Duplicates,
            photo_count,
            photo_count,
            &format!(
                "{} duplicate groups, {} redundant files",
                stats.duplicate_groups, stats.duplicate_files
            ),
        ));

        emit(ScanProgress::boundary(
            ScanPhase::Preparing,
            photo_count,
            photo_count,
            "Preparing results",
        ));
        emit(ScanProgress::boundary(
            ScanPhase::Rendering,
            photo_count,
            photo_count,
            "Handing off to presentation",
        ));

        info!(
            "scan complete: {} photos, {} duplicate groups in {:.2}s",
            photo_count,
            stats.duplicate_groups,
            scan_start.elapsed().as_secs_f64()
        );
        emit(ScanProgress::boundary(
            ScanPhase::Complete,
            photo_count,
            photo_count,
            &format!(
                "Done: {} photos, {} duplicates",
                photo_count, stats.duplicate_files
            ),
        ));

        Ok(photos)
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new()
    }
}
