use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use fightpool::config::PoolConfig;
use fightpool::enrich::Enricher;
use fightpool::import::{import_rows, parse_import_rows};
use fightpool::model::{Match, PoolCard, Side};
use fightpool::odds_resolver::OddsOutcome;
use fightpool::{logging, scoring};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let card_path = args
        .iter()
        .enumerate()
        .find(|(idx, arg)| {
            let after_flag = idx
                .checked_sub(1)
                .is_some_and(|prev| matches!(args[prev].as_str(), "--import" | "--out"));
            !arg.starts_with("--") && !after_flag
        })
        .map(|(_, arg)| PathBuf::from(arg))
        .ok_or_else(|| {
            anyhow!("usage: fightpool <card.json> [--import rows.json] [--enrich] [--out path]")
        })?;
    let import_path = flag_value(&args, "--import").map(PathBuf::from);
    let out_path = flag_value(&args, "--out").map(PathBuf::from);
    let enrich = args.iter().any(|a| a == "--enrich");

    let mut card = read_card(&card_path)?;
    let needs_lookups = enrich || import_path.is_some();
    let enricher = needs_lookups.then(|| Enricher::from_config(&PoolConfig::from_env()));

    if let (Some(path), Some(enricher)) = (import_path.as_deref(), enricher.as_ref()) {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading import rows {}", path.display()))?;
        let records: Vec<HashMap<String, String>> =
            serde_json::from_str(&raw).context("import rows must be a JSON array of objects")?;
        let (rows, skipped) = parse_import_rows(&records);
        let report = import_rows(enricher, &rows, card.next_match_id());
        let summary = report.summary();
        println!(
            "Imported {} match(es), skipped {} row(s), odds fetched for {}",
            summary.imported, skipped, summary.odds_fetched
        );
        if !summary.not_found.is_empty() {
            println!("No data found for: {}", summary.not_found.join(", "));
        }
        card.matches.extend(report.matches);
    }

    if enrich && let Some(enricher) = enricher.as_ref() {
        let sweep = enricher.sweep_missing_fighter_data(&mut card.matches);
        println!(
            "Fighter data: {} match(es) updated, {} already complete",
            sweep.resolved, sweep.skipped
        );
        if !sweep.not_found.is_empty() {
            let names = sweep
                .not_found
                .iter()
                .map(|u| u.name.as_str())
                .collect::<Vec<_>>();
            println!("No data found for: {}", names.join(", "));
        }
        let mut updated = 0;
        for m in &mut card.matches {
            if enricher.refetch_odds(m) == OddsOutcome::Updated {
                updated += 1;
            }
        }
        println!("Odds updated for {updated} match(es)");
    }

    print_card(&card);

    if let Some(path) = out_path {
        let json = serde_json::to_string_pretty(&card).context("serialize card")?;
        fs::write(&path, json).with_context(|| format!("failed writing {}", path.display()))?;
        println!("Card written to {}", path.display());
    }
    Ok(())
}

fn read_card(path: &Path) -> Result<PoolCard> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading card {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid card json {}", path.display()))
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn print_card(card: &PoolCard) {
    if !card.name.is_empty() {
        println!("== {} ==", card.name);
    }
    for m in &card.matches {
        println!("{}", match_line(m));
    }

    let finished = scoring::all_results_entered(&card.matches);
    println!();
    println!("Leaderboard{}", if finished { " (final)" } else { "" });
    for (rank, standing) in scoring::leaderboard(&card.participants, &card.matches)
        .iter()
        .enumerate()
    {
        println!(
            "{:>2}. {:<24} {:>6}  ({} correct)",
            rank + 1,
            standing.display_name,
            standing.score.to_string(),
            standing.correct_picks
        );
    }
}

fn match_line(m: &Match) -> String {
    let odds = |side: Side| {
        m.odds(side)
            .map_or_else(|| "-".to_string(), |o| o.to_string())
    };
    let result = m
        .result
        .map_or_else(|| "pending".to_string(), |r| format!("{r:?}").to_lowercase());
    format!(
        "#{:<3} {} vs {} {}  odds {}/{} [{}]  potential {}/{}  result {}",
        m.id,
        fighter_label(m, Side::A),
        fighter_label(m, Side::B),
        m.multiplier,
        odds(Side::A),
        odds(Side::B),
        m.odds_provenance.label(),
        scoring::potential_score(m, Side::A),
        scoring::potential_score(m, Side::B),
        result
    )
}

fn fighter_label(m: &Match, side: Side) -> String {
    let fact = m.fighter(side);
    let mut label = m.name(side).to_string();
    if let Some(flag) = fact.flag.emoji() {
        label = format!("{flag} {label}");
    }
    if let Some(record) = fact.record {
        label = format!("{label} ({record})");
    }
    label
}
