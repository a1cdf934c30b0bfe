use crate::error::{Error, Result};
use crate::hasher::sha256::compute_full_hash;
use crate::model;
use crate::platform;
use crate::progress::{DeleteProgress, DeleteResult, ProgressReporter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// How long the presentation layer keeps a delete result visible, in ms.
const DELETE_RESULT_TTL_MS: i64 = 5_000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MoveOperation {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    Move,
}

/// One reversible batch. Only moves are recorded: trash goes to the OS
/// recovery facility, renames are user-visible, folder creation is benign.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub kind: UndoKind,
    pub timestamp: i64,
    pub operations: Vec<MoveOperation>,
}

/// Mutating file operations with an in-process undo log.
pub struct FileOps {
    undo_stack: Mutex<Vec<UndoEntry>>,
}

impl FileOps {
    pub fn new() -> Self {
        Self {
            undo_stack: Mutex::new(Vec::new()),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Move files into `dest_dir`. Sidecars and previews sharing a
    /// primary's base name travel with it. Name collisions get an ` (n)`
    /// suffix starting at 2. Every completed move lands in one undo
    /// entry; on partial failure the entry holds the completed moves and
    /// the first failure is returned after the whole batch was attempted.
    pub fn move_files(&self, paths: &[String], dest_dir: &str) -> Result<Vec<MoveOperation>> {
        let dest = Path::new(dest_dir);
        fs::create_dir_all(dest)?;

        // BTreeSet: stable processing order, and inputs that name both a
        // primary and its sidecar collapse to one move each.
        let mut sources: BTreeSet<PathBuf> = BTreeSet::new();
        for path in paths {
            let path = PathBuf::from(path);
            if !path.exists() {
                warn!("skipping vanished file {}", path.display());
                continue;
            }
            for companion in associated_files(&path) {
                sources.insert(companion);
            }
            sources.insert(path);
        }

        let mut operations: Vec<MoveOperation> = Vec::with_capacity(sources.len());
        let mut first_failure: Option<Error> = None;

        for source in sources {
            let file_name = match source.file_name() {
                Some(name) => name,
                None => continue,
            };

            let result = unique_target(&dest.join(file_name))
                .and_then(|target| move_file(&source, &target).map(|()| target));
            match result {
                Ok(target) => operations.push(MoveOperation {
                    from: source.to_string_lossy().into_owned(),
                    to: target.to_string_lossy().into_owned(),
                }),
                Err(e) => {
                    warn!("move failed for {}: {}", source.display(), e);
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }

        if !operations.is_empty() {
            debug!("moved {} files to {}", operations.len(), dest_dir);
            let entry = UndoEntry {
                kind: UndoKind::Move,
                timestamp: chrono::Utc::now().timestamp(),
                operations: operations.clone(),
            };
            if let Ok(mut stack) = self.undo_stack.lock() {
                stack.push(entry);
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(operations),
        }
    }

    /// Replay an explicit `{from, to}` list in order. Used for undo; does
    /// not record a new undo entry. Vanished sources are skipped; the
    /// first failure is surfaced after the batch completes.
    pub fn move_batch(&self, operations: &[MoveOperation]) -> Result<()> {
        let mut first_failure: Option<Error> = None;

        for op in operations {
            let source = Path::new(&op.from);
            let target = Path::new(&op.to);

            if !source.exists() {
                warn!("skipping vanished file {}", source.display());
                continue;
            }
            if let Some(parent) = target.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    warn!("cannot create {}: {}", parent.display(), e);
                    if first_failure.is_none() {
                        first_failure = Some(e.into());
                    }
                    continue;
                }
            }

            if let Err(e) = move_file(source, target) {
                warn!("move failed for {}: {}", source.display(), e);
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Rename a file in place. The new name must be a bare file name and
    /// must not collide with an existing entry.
    pub fn rename(&self, path: &str, new_name: &str) -> Result<String> {
        if new_name.is_empty() || new_name.contains('/') || new_name.contains('\\') {
            return Err(Error::InvalidName {
                name: new_name.to_string(),
            });
        }

        let source = Path::new(path);
        if !source.exists() {
            return Err(Error::NotFound {
                path: path.to_string(),
            });
        }

        let parent = source.parent().ok_or_else(|| Error::InvalidName {
            name: path.to_string(),
        })?;
        let target = parent.join(new_name);

        if target.exists() && target != source {
            return Err(Error::MoveConflict {
                path: target.to_string_lossy().into_owned(),
            });
        }

        fs::rename(source, &target)?;
        Ok(target.to_string_lossy().into_owned())
    }

    /// Send files to the OS recycle facility, streaming progress. Not
    /// undoable here; recovery is the OS's job. Files that fail to trash
    /// are left in place and counted.
    pub fn trash_files(
        &self,
        paths: &[String],
        reporter: &dyn ProgressReporter,
    ) -> DeleteResult {
        let total = paths.len();
        let mut deleted_count = 0;
        let mut failed_count = 0;
        let mut total_bytes: u64 = 0;

        for (i, path_str) in paths.iter().enumerate() {
            let path = Path::new(path_str);
            let file_size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            reporter.on_delete_progress(&DeleteProgress {
                phase: "deleting".to_string(),
                current: i + 1,
                total,
                current_file: file_name,
                deleted_bytes: total_bytes,
            });

            match trash::delete(path) {
                Ok(()) => {
                    deleted_count += 1;
                    total_bytes += file_size;
                }
                Err(e) => {
                    warn!("failed to trash {}: {}", path.display(), e);
                    failed_count += 1;
                }
            }
        }

        let result = DeleteResult {
            deleted_count,
            failed_count,
            total_bytes,
            show_until: chrono::Utc::now().timestamp_millis() + DELETE_RESULT_TTL_MS,
        };
        reporter.on_delete_result(&result);
        result
    }

    /// Create a directory and any missing parents; an existing directory
    /// is fine.
    pub fn create_folder(&self, path: &str) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    /// Reverse the most recent move batch. Returns the number of files
    /// restored, or `None` when there is nothing to undo.
    pub fn undo(&self) -> Result<Option<usize>> {
        let entry = match self.undo_stack.lock() {
            Ok(mut stack) => stack.pop(),
            Err(_) => None,
        };

        let Some(entry) = entry else {
            return Ok(None);
        };

        let reversed: Vec<MoveOperation> = entry
            .operations
            .iter()
            .rev()
            .map(|op| MoveOperation {
                from: op.to.clone(),
                to: op.from.clone(),
            })
            .collect();

        self.move_batch(&reversed)?;
        Ok(Some(reversed.len()))
    }

    pub fn reveal(&self, path: &str) -> Result<()> {
        platform::reveal_in_file_manager(Path::new(path))
    }
}

impl Default for FileOps {
    fn default() -> Self {
        Self::new()
    }
}

/// Companion files of a primary: entries in the same directory sharing
/// its base name (case-insensitive) with a recognized photo or sidecar
/// extension.
fn associated_files(primary: &Path) -> Vec<PathBuf> {
    let Some(parent) = primary.parent() else {
        return Vec::new();
    };
    let Some(stem) = primary.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let stem_lower = stem.to_lowercase();

    let Ok(entries) = fs::read_dir(parent) else {
        return Vec::new();
    };

    let mut companions = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path == primary || !path.is_file() {
            continue;
        }
        let same_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase() == stem_lower)
            .unwrap_or(false);
        if same_stem && model::is_accepted_extension(&model::extension_of(&path)) {
            companions.push(path);
        }
    }
    companions
}

/// First non-colliding variant of `target`, suffixing ` (n)` before the
/// extension starting at n=2. Gives up after 1000 attempts.
fn unique_target(target: &Path) -> Result<PathBuf> {
    if !target.exists() {
        return Ok(target.to_path_buf());
    }

    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let ext = target.extension().and_then(|e| e.to_str());
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    for counter in 2u32..=1000 {
        let candidate_name = match ext {
            Some(ext) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", stem, counter),
        };
        let candidate = parent.join(candidate_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::MoveConflict {
        path: target.to_string_lossy().into_owned(),
    })
}

/// Rename, falling back to copy + verify + delete across volumes. The
/// copy is only trusted once source and destination digests match.
fn move_file(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !source.exists() {
                return Err(Error::NotFound {
                    path: source.to_string_lossy().into_owned(),
                });
            }

            debug!(
                "rename {} -> {} failed ({}), copying instead",
                source.display(),
                target.display(),
                rename_err
            );
            fs::copy(source, target)?;

            let source_hash = compute_full_hash(source)?;
            let target_hash = compute_full_hash(target)?;
            if source_hash != target_hash {
                let _ = fs::remove_file(target);
                return Err(Error::Io(std::io::Error::other(format!(
                    "copy verification failed for {}",
                    source.display()
                ))));
            }

            fs::remove_file(source)?;
            Ok(())
        }
    }
}
