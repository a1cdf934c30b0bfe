use crate::error::{Error, Result};
use crate::model::{self, RawFile};
use crate::platform;
use dashmap::DashMap;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::UNIX_EPOCH;
use tracing::warn;

/// Recursively walk `roots` and emit one [`RawFile`] per accepted file.
///
/// Symlinks are not followed. Hidden directories and `@`-prefixed
/// directories (OS metadata trees) are skipped. Unreadable entries produce
/// a per-item warning and do not abort the walk. Discovery order is
/// unspecified.
pub fn discover_files(roots: &[String], cancel: &AtomicBool) -> Result<Vec<RawFile>> {
    // Keyed by path to guarantee uniqueness when roots overlap despite
    // pruning (e.g. symlinked duplicates of a root).
    let found: DashMap<String, RawFile> = DashMap::new();

    roots
        .par_iter()
        .try_for_each(|root| visit_dirs(Path::new(root), &found, cancel))?;

    Ok(found.into_iter().map(|(_, file)| file).collect())
}

fn skip_directory(dir: &Path) -> bool {
    match dir.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with('.') || name.starts_with('@'),
        None => false,
    }
}

fn visit_dirs(dir: &Path, found: &DashMap<String, RawFile>, cancel: &AtomicBool) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        return Err(Error::Cancelled);
    }
    if !dir.is_dir() {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot read directory {}: {}", dir.display(), err);
            return Ok(());
        }
    };

    entries.par_bridge().try_for_each(|entry_result| {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("cannot read entry in {}: {}", dir.display(), err);
                return Ok(());
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(err) => {
                warn!("cannot stat {}: {}", path.display(), err);
                return Ok(());
            }
        };

        if file_type.is_symlink() {
            return Ok(());
        }

        if file_type.is_dir() {
            if !skip_directory(&path) {
                visit_dirs(&path, found, cancel)?;
            }
            return Ok(());
        }

        let extension = model::extension_of(&path);
        if !model::is_accepted_extension(&extension) {
            return Ok(());
        }

        // One stat per candidate; everything downstream reuses it.
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(err) => {
                warn!("cannot stat {}: {}", path.display(), err);
                return Ok(());
            }
        };

        let modified_at = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let raw = RawFile {
            path: path.to_string_lossy().into_owned(),
            name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
            extension,
            directory: path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: metadata.len(),
            modified_at,
            is_cloud_placeholder: platform::is_cloud_placeholder(&path, &metadata),
        };

        found.insert(raw.path.clone(), raw);
        Ok(())
    })
}
