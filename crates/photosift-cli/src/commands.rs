use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "photosift")]
#[command(about = "Scan photo libraries and find duplicate shots", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the configured directories (or explicit --dir overrides)
    Scan {
        /// Directories to scan instead of the configured ones
        #[arg(long = "dir")]
        dirs: Vec<String>,
        /// Print the full photo list as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Scan, then print which duplicate copies smart-select would discard
    Select {
        /// Directories to scan instead of the configured ones
        #[arg(long = "dir")]
        dirs: Vec<String>,
    },
    /// Print the loaded configuration
    PrintConfig,
    /// Display the number of entries in the hash cache
    CacheStats,
    /// Delete every entry from the hash cache
    ClearCache,
}
