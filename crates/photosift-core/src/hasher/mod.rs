pub mod sha256;

pub use sha256::{compute_full_hash, compute_trailing_hash, TRAILING_HASH_SIZE};

use crate::cache::HashCache;
use crate::error::{Error, Result};
use crate::model::LogicalPhoto;
use std::path::Path;

/// Cache-consulting hash front-end.
///
/// Both operations look the cache up under the photo's current
/// `(size, modified_at)` and only touch the file on a miss. The computed
/// digest is stored back under the same stat, so a cached hash always
/// corresponds to the content it was read from.
pub struct Hasher<'a> {
    cache: &'a HashCache,
}

impl<'a> Hasher<'a> {
    pub fn new(cache: &'a HashCache) -> Self {
        Self { cache }
    }

    pub fn trailing_hash(&self, photo: &LogicalPhoto) -> Result<String> {
        if photo.is_cloud_placeholder {
            return Err(Error::CloudPlaceholder {
                path: photo.path.clone(),
            });
        }

        if let Some(hit) = self.cache.lookup(&photo.path, photo.size, photo.modified_at) {
            if let Some(trailing) = hit.trailing_hash {
                return Ok(trailing);
            }
        }

        let hash = sha256::compute_trailing_hash(Path::new(&photo.path), photo.size)?;
        self.cache
            .store(&photo.path, photo.size, photo.modified_at, Some(&hash), None);
        Ok(hash)
    }

    pub fn full_hash(&self, photo: &LogicalPhoto) -> Result<String> {
        if photo.is_cloud_placeholder {
            return Err(Error::CloudPlaceholder {
                path: photo.path.clone(),
            });
        }

        if let Some(hit) = self.cache.lookup(&photo.path, photo.size, photo.modified_at) {
            if let Some(full) = hit.full_hash {
                return Ok(full);
            }
        }

        let hash = sha256::compute_full_hash(Path::new(&photo.path))?;
        self.cache
            .store(&photo.path, photo.size, photo.modified_at, None, Some(&hash));
        Ok(hash)
    }
}
