pub mod cache;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod model;
pub mod ops;
pub mod platform;
pub mod progress;
pub mod scanner;
pub mod select;

pub use cache::HashCache;
pub use config::AppConfig;
pub use engine::ScanEngine;
pub use error::{Error, Result};
pub use model::{LogicalPhoto, RawFile, RelatedFile, RelatedKind};
pub use ops::{FileOps, MoveOperation};
pub use progress::{ProgressReporter, ScanPhase, ScanProgress, SilentReporter};
pub use select::SelectRules;
