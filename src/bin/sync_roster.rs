use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use fightpool::config::PoolConfig;
use fightpool::logging;
use fightpool::roster_fetch::sync_roster;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let cfg = PoolConfig::from_env();
    let summary = sync_roster(&cfg.fighters, &cfg.http)?;

    println!("Roster sync complete");
    println!("Pages: {}", summary.pages);
    println!(
        "Fighters: {}/{}",
        summary.fighters.len(),
        summary
            .total_reported
            .map_or_else(|| "?".to_string(), |t| t.to_string())
    );
    println!(
        "Skipped: {} duplicate(s), {} without id/slug",
        summary.duplicates_skipped, summary.invalid_skipped
    );
    if !summary.errors.is_empty() {
        println!("  errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            println!("   - {err}");
        }
    }

    if let Some(path) = parse_out_arg() {
        let json = serde_json::to_string_pretty(&summary.fighters).context("serialize roster")?;
        fs::write(&path, json).with_context(|| format!("failed writing {}", path.display()))?;
        println!("Roster written to {}", path.display());
    }
    Ok(())
}

fn parse_out_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--out=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--out" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
