use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is a cloud placeholder, content not materialized: {path}")]
    CloudPlaceholder { path: String },

    #[error("hash cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("a scan is already in progress")]
    ScanInProgress,

    #[error("destination already exists: {path}")]
    MoveConflict { path: String },

    #[error("invalid file name: {name}")]
    InvalidName { name: String },

    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}
