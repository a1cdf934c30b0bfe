use crate::cache::HashCache;
use crate::hasher::Hasher;
use crate::model::LogicalPhoto;
use crate::progress::{ProgressReporter, ScanPhase, ScanProgress};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Upper bound on hash workers; beyond this the disks, not the cores, are
/// the bottleneck.
const MAX_HASH_WORKERS: usize = 8;

#[derive(Debug, Default)]
pub struct DetectStats {
    pub candidates: usize,
    pub duplicate_groups: usize,
    pub duplicate_files: usize,
    pub cancelled: bool,
}

fn build_pool() -> std::io::Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get().min(MAX_HASH_WORKERS))
        .build()
        .map_err(std::io::Error::other)
}

/// Annotate `photos` with duplicate relationships.
///
/// Three passes: size buckets, trailing-hash pruning, full-hash
/// confirmation. Only the hash passes touch file content, parallelized
/// over a bounded pool. Cancellation is honored between sub-buckets and
/// between files, never mid-hash; groups fully hashed before the cancel
/// are still annotated.
pub fn detect_duplicates(
    photos: &mut [LogicalPhoto],
    cache: &HashCache,
    reporter: &dyn ProgressReporter,
    cancel: &AtomicBool,
) -> crate::Result<DetectStats> {
    let mut stats = DetectStats::default();

    // Pass A: partition by primary size. Singleton buckets are done.
    let mut size_buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    for (idx, photo) in photos.iter().enumerate() {
        size_buckets.entry(photo.size).or_default().push(idx);
    }
    let candidate_buckets: Vec<Vec<usize>> = size_buckets
        .into_values()
        .filter(|bucket| bucket.len() > 1)
        .collect();

    stats.candidates = candidate_buckets.iter().map(|b| b.len()).sum();
    debug!(
        "size pass: {} candidates in {} buckets",
        stats.candidates,
        candidate_buckets.len()
    );

    if stats.candidates == 0 {
        return Ok(stats);
    }

    let pool = build_pool()?;
    let hasher = Hasher::new(cache);

    // Pass B: trailing hash of every non-placeholder candidate,
    // sub-partitioning each size bucket. Placeholders drop out here and
    // stay non-duplicate.
    reporter.on_scan_progress(&ScanProgress::boundary(
        ScanPhase::TrailingHash,
        0,
        stats.candidates,
        &format!("Quick-hashing {} candidates", stats.candidates),
    ));

    let progress = AtomicUsize::new(0);
    let trailing_results: Vec<(usize, String)> = pool.install(|| {
        candidate_buckets
            .par_iter()
            .flat_map(|bucket| {
                if cancel.load(Ordering::Relaxed) {
                    return Vec::new();
                }
                bucket
                    .par_iter()
                    .filter_map(|&idx| {
                        if cancel.load(Ordering::Relaxed) {
                            return None;
                        }
                        let photo = &photos[idx];
                        if photo.is_cloud_placeholder {
                            return None;
                        }
                        let result = hasher.trailing_hash(photo);
                        let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                        reporter.on_scan_progress(&ScanProgress::tick(
                            ScanPhase::TrailingHash,
                            done,
                            stats.candidates,
                            &photo.name,
                        ));
                        match result {
                            Ok(hash) => Some((idx, hash)),
                            Err(e) => {
                                warn!("trailing hash failed for {}: {}", photo.path, e);
                                None
                            }
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    });

    if cancel.load(Ordering::Relaxed) {
        stats.cancelled = true;
        return Ok(stats);
    }

    reporter.on_scan_progress(&ScanProgress::boundary(
        ScanPhase::TrailingHash,
        stats.candidates,
        stats.candidates,
        "Quick hash complete",
    ));

    // Sub-partition by (size, trailing hash); singletons are done.
    let mut trailing_buckets: HashMap<(u64, String), Vec<usize>> = HashMap::new();
    for (idx, hash) in trailing_results {
        trailing_buckets
            .entry((photos[idx].size, hash))
            .or_default()
            .push(idx);
    }
    let full_hash_buckets: Vec<Vec<usize>> = trailing_buckets
        .into_values()
        .filter(|bucket| bucket.len() > 1)
        .collect();
    let full_total: usize = full_hash_buckets.iter().map(|b| b.len()).sum();
    debug!(
        "trailing pass: {} likely duplicates in {} buckets",
        full_total,
        full_hash_buckets.len()
    );

    // Pass C: full hash over the survivors.
    reporter.on_scan_progress(&ScanProgress::boundary(
        ScanPhase::Hashing,
        0,
        full_total,
        &format!("Full-hashing {} likely duplicates", full_total),
    ));

    let progress = AtomicUsize::new(0);
    let full_results: Vec<(usize, String)> = pool.install(|| {
        full_hash_buckets
            .par_iter()
            .flat_map(|bucket| {
                if cancel.load(Ordering::Relaxed) {
                    return Vec::new();
                }
                bucket
                    .par_iter()
                    .filter_map(|&idx| {
                        if cancel.load(Ordering::Relaxed) {
                            return None;
                        }
                        let photo = &photos[idx];
                        let result = hasher.full_hash(photo);
                        let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                        reporter.on_scan_progress(&ScanProgress::tick(
                            ScanPhase::Hashing,
                            done,
                            full_total,
                            &photo.name,
                        ));
                        match result {
                            Ok(hash) => Some((idx, hash)),
                            Err(e) => {
                                warn!("full hash failed for {}: {}", photo.path, e);
                                None
                            }
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    });

    stats.cancelled = cancel.load(Ordering::Relaxed);

    reporter.on_scan_progress(&ScanProgress::boundary(
        ScanPhase::Hashing,
        full_total,
        full_total,
        "Full hash complete",
    ));

    // Confirm: group by (size, full hash). Any photo that got this far
    // has its digest recorded whether or not it turns out duplicated.
    let mut content_groups: HashMap<(u64, String), Vec<usize>> = HashMap::new();
    for (idx, hash) in full_results {
        photos[idx].hash = Some(hash.clone());
        content_groups
            .entry((photos[idx].size, hash))
            .or_default()
            .push(idx);
    }

    for (_, group) in content_groups {
        if group.len() < 2 {
            continue;
        }
        annotate_group(photos, group, &mut stats);
    }

    debug!(
        "confirmed {} duplicate groups, {} duplicate files",
        stats.duplicate_groups, stats.duplicate_files
    );
    Ok(stats)
}

/// Mark every non-keeper in a confirmed content group. The keeper is the
/// member with the shortest path, ties broken lexicographically; it stays
/// unflagged and serves as the group's stable reference point.
fn annotate_group(photos: &mut [LogicalPhoto], mut group: Vec<usize>, stats: &mut DetectStats) {
    group.sort_by(|&a, &b| {
        let pa = &photos[a].path;
        let pb = &photos[b].path;
        pa.len().cmp(&pb.len()).then_with(|| pa.cmp(pb))
    });

    let keeper_id = photos[group[0]].id.clone();
    for &idx in &group[1..] {
        photos[idx].is_duplicate = true;
        photos[idx].duplicate_of = Some(keeper_id.clone());
        stats.duplicate_files += 1;
    }
    stats.duplicate_groups += 1;
}
