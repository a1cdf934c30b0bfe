use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Standard raster extensions (displayable without decoding RAW data).
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "tiff", "bmp",
];

/// RAW sensor-data extensions. A RAW always wins primary selection.
pub const RAW_EXTENSIONS: &[&str] = &["arw", "cr2", "cr3", "nef", "dng", "raf", "orf", "rw2", "pef"];

/// Sidecar/metadata extensions. Never a primary on their own.
pub const SIDECAR_EXTENSIONS: &[&str] = &["xmp", "xml"];

pub fn is_raw_extension(ext: &str) -> bool {
    RAW_EXTENSIONS.contains(&ext)
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

pub fn is_sidecar_extension(ext: &str) -> bool {
    SIDECAR_EXTENSIONS.contains(&ext)
}

/// True if the extension belongs to the scan allow-list at all.
pub fn is_accepted_extension(ext: &str) -> bool {
    is_raw_extension(ext) || is_image_extension(ext) || is_sidecar_extension(ext)
}

/// Lower-cased extension of a path, without the leading dot.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Deterministic photo id: truncated hex SHA-256 of the primary path.
/// The same file yields the same id across scans.
pub fn photo_id(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    let mut id = String::with_capacity(16);
    for byte in &digest[..8] {
        id.push_str(&format!("{:02x}", byte));
    }
    id
}

/// A file emitted by discovery, before collapsing.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub path: String,
    pub name: String,
    /// Lower-cased, no leading dot.
    pub extension: String,
    /// Parent directory path.
    pub directory: String,
    pub size: u64,
    /// Seconds since epoch.
    pub modified_at: i64,
    pub is_cloud_placeholder: bool,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelatedKind {
    Sidecar,
    JpegPreview,
    Raw,
}

#[derive(Debug, Serialize, Clone)]
pub struct RelatedFile {
    pub path: String,
    pub name: String,
    pub kind: RelatedKind,
}

/// A logical photo: one primary image plus its collapsed companions.
#[derive(Debug, Serialize, Clone)]
pub struct LogicalPhoto {
    pub id: String,
    pub path: String,
    pub name: String,
    pub directory: String,
    pub extension: String,
    pub size: u64,
    /// Seconds since epoch.
    pub modified_at: i64,
    /// Full content digest; set only once duplicate detection needed it.
    pub hash: Option<String>,
    /// Displayable path: the primary if it is a raster, else a collapsed
    /// JPEG preview, else absent.
    pub thumbnail_path: Option<String>,
    pub related_files: Vec<RelatedFile>,
    pub is_duplicate: bool,
    pub duplicate_of: Option<String>,
    pub is_cloud_placeholder: bool,
}

impl LogicalPhoto {
    pub fn is_raw(&self) -> bool {
        is_raw_extension(&self.extension)
    }
}
