mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;

use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use photosift_core::select::{duplicate_groups, SelectRules};
use photosift_core::{AppConfig, HashCache, LogicalPhoto, ScanEngine};
use progress::CliReporter;
use tracing::error;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();
    let config = AppConfig::load();
    let args = Cli::parse();

    match args.command {
        Some(Commands::Scan { dirs, json }) => {
            if let Err(err) = run_scan(&config, dirs, json) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::Select { dirs }) => {
            if let Err(err) = run_select(&config, dirs) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        Some(Commands::CacheStats) => {
            let cache = HashCache::open();
            println!("{} entries in hash cache", cache.entry_count());
        }
        Some(Commands::ClearCache) => {
            if confirm_destructive("this deletes every cached hash")? {
                let cache = HashCache::open();
                cache.clear();
                println!("Hash cache cleared");
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn resolve_roots(config: &AppConfig, overrides: Vec<String>) -> Result<Vec<String>, String> {
    let roots = if overrides.is_empty() {
        config.enabled_roots()
    } else {
        overrides
    };
    if roots.is_empty() {
        return Err(
            "no directories to scan; configure some or pass --dir".to_string(),
        );
    }
    Ok(roots)
}

fn run_scan(
    config: &AppConfig,
    dirs: Vec<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let roots = resolve_roots(config, dirs)?;
    let engine = ScanEngine::new();
    let reporter = CliReporter::new();
    let photos = engine.scan(&roots, &reporter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&photos)?);
        return Ok(());
    }

    print_summary(&photos);
    Ok(())
}

fn print_summary(photos: &[LogicalPhoto]) {
    let groups = duplicate_groups(photos);
    let duplicate_files: usize = photos.iter().filter(|p| p.is_duplicate).count();
    let wasted_bytes: u64 = photos
        .iter()
        .filter(|p| p.is_duplicate)
        .map(|p| p.size)
        .sum();

    println!();
    println!(
        "{} photos, {} duplicate groups, {} redundant files",
        format!("{}", photos.len()).green(),
        format!("{}", groups.len()).red(),
        format!("{}", duplicate_files).red(),
    );
    println!("{} bytes reclaimable", format!("{}", wasted_bytes).yellow());
}

fn run_select(
    config: &AppConfig,
    dirs: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let roots = resolve_roots(config, dirs)?;
    let engine = ScanEngine::new();
    let reporter = CliReporter::new();
    let photos = engine.scan(&roots, &reporter)?;

    let groups = duplicate_groups(&photos);
    if groups.is_empty() {
        println!("No duplicate groups found");
        return Ok(());
    }

    let deletions = SelectRules::new().recommend_deletions(&groups);
    println!();
    println!(
        "{} groups, {} copies recommended for deletion (dry run):",
        groups.len(),
        deletions.len()
    );
    for photo in photos.iter().filter(|p| deletions.contains(&p.id)) {
        println!("  {} {}", "✗".red(), photo.path);
    }
    Ok(())
}

/// One-shot gate for destructive commands. Anything short of an explicit
/// yes counts as no.
fn confirm_destructive(consequence: &str) -> io::Result<bool> {
    print!(
        "{} {} — continue? [y/N] ",
        "warning:".yellow().bold(),
        consequence
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
