use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Hashes cached for one path, valid for a specific `(size, modified_at)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedHashes {
    pub trailing_hash: Option<String>,
    pub full_hash: Option<String>,
}

enum Backend {
    Sqlite(Mutex<Connection>),
    /// Fallback when the backing store cannot be opened. Keyed by path,
    /// value is `(size, modified_at, hashes)`.
    Memory(Mutex<HashMap<String, (u64, i64, CachedHashes)>>),
}

/// Persistent `{path → (size, mtime, trailing_hash?, full_hash?)}` store.
///
/// A row is only served when both `size` and `modified_at` match the
/// caller's current stat; a mismatched row is a miss and gets overwritten
/// by the next store.
pub struct HashCache {
    backend: Backend,
}

impl HashCache {
    pub fn default_path() -> PathBuf {
        crate::config::app_data_dir().join("hash_cache.db")
    }

    /// Open the cache at its default location, falling back to an
    /// in-memory map when the store cannot be opened.
    pub fn open() -> Self {
        Self::open_at(&Self::default_path())
    }

    pub fn open_at(path: &Path) -> Self {
        match Self::open_sqlite(path) {
            Ok(conn) => Self {
                backend: Backend::Sqlite(Mutex::new(conn)),
            },
            Err(e) => {
                let err = crate::Error::CacheUnavailable(format!("{}: {}", path.display(), e));
                warn!("{}, falling back to in-memory cache", err);
                Self::in_memory()
            }
        }
    }

    /// An in-memory cache, also used directly by tests.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(HashMap::new())),
        }
    }

    fn open_sqlite(path: &Path) -> crate::Result<Connection> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS file_hashes (
                path TEXT PRIMARY KEY,
                size INTEGER NOT NULL,
                modified_at INTEGER NOT NULL,
                trailing_hash TEXT,
                full_hash TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_size ON file_hashes(size);
            CREATE INDEX IF NOT EXISTS idx_trailing_hash ON file_hashes(trailing_hash);
            CREATE INDEX IF NOT EXISTS idx_full_hash ON file_hashes(full_hash);",
        )?;
        debug!("hash cache opened at {}", path.display());
        Ok(conn)
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, Backend::Sqlite(_))
    }

    /// Stored hashes for `path`, only when `(size, modified_at)` match the
    /// row exactly. Any mismatch is a miss.
    pub fn lookup(&self, path: &str, size: u64, modified_at: i64) -> Option<CachedHashes> {
        match &self.backend {
            Backend::Sqlite(conn) => {
                let conn = conn.lock().ok()?;
                conn.query_row(
                    "SELECT trailing_hash, full_hash FROM file_hashes \
                     WHERE path = ?1 AND size = ?2 AND modified_at = ?3",
                    params![path, size as i64, modified_at],
                    |row| {
                        Ok(CachedHashes {
                            trailing_hash: row.get(0)?,
                            full_hash: row.get(1)?,
                        })
                    },
                )
                .optional()
                .ok()
                .flatten()
            }
            Backend::Memory(map) => {
                let map = map.lock().ok()?;
                map.get(path).and_then(|(s, m, hashes)| {
                    if *s == size && *m == modified_at {
                        Some(hashes.clone())
                    } else {
                        None
                    }
                })
            }
        }
    }

    /// Upsert one row. A `Some` hash overwrites its column; a `None`
    /// leaves the existing column intact when the row is still valid for
    /// `(size, modified_at)`. A stale row is replaced outright.
    pub fn store(
        &self,
        path: &str,
        size: u64,
        modified_at: i64,
        trailing_hash: Option<&str>,
        full_hash: Option<&str>,
    ) {
        match &self.backend {
            Backend::Sqlite(conn) => {
                let Ok(conn) = conn.lock() else { return };
                let result = conn.execute(
                    "INSERT INTO file_hashes (path, size, modified_at, trailing_hash, full_hash) \
                     VALUES (?1, ?2, ?3, ?4, ?5) \
                     ON CONFLICT(path) DO UPDATE SET \
                         trailing_hash = CASE \
                             WHEN size != excluded.size OR modified_at != excluded.modified_at \
                             THEN excluded.trailing_hash \
                             ELSE COALESCE(excluded.trailing_hash, trailing_hash) END, \
                         full_hash = CASE \
                             WHEN size != excluded.size OR modified_at != excluded.modified_at \
                             THEN excluded.full_hash \
                             ELSE COALESCE(excluded.full_hash, full_hash) END, \
                         size = excluded.size, \
                         modified_at = excluded.modified_at",
                    params![path, size as i64, modified_at, trailing_hash, full_hash],
                );
                if let Err(e) = result {
                    warn!("hash cache store failed for {}: {}", path, e);
                }
            }
            Backend::Memory(map) => {
                let Ok(mut map) = map.lock() else { return };
                let entry = map.entry(path.to_string()).or_insert_with(|| {
                    (size, modified_at, CachedHashes::default())
                });
                if entry.0 != size || entry.1 != modified_at {
                    // Stale row: replace wholesale.
                    *entry = (size, modified_at, CachedHashes::default());
                }
                if let Some(t) = trailing_hash {
                    entry.2.trailing_hash = Some(t.to_string());
                }
                if let Some(f) = full_hash {
                    entry.2.full_hash = Some(f.to_string());
                }
            }
        }
    }

    pub fn entry_count(&self) -> usize {
        match &self.backend {
            Backend::Sqlite(conn) => {
                let Ok(conn) = conn.lock() else { return 0 };
                conn.query_row("SELECT COUNT(*) FROM file_hashes", [], |row| {
                    row.get::<_, i64>(0)
                })
                .unwrap_or(0) as usize
            }
            Backend::Memory(map) => map.lock().map(|m| m.len()).unwrap_or(0),
        }
    }

    pub fn clear(&self) {
        match &self.backend {
            Backend::Sqlite(conn) => {
                let Ok(conn) = conn.lock() else { return };
                let _ = conn.execute("DELETE FROM file_hashes", []);
            }
            Backend::Memory(map) => {
                if let Ok(mut map) = map.lock() {
                    map.clear();
                }
            }
        }
    }
}
