use anyhow::{Result, anyhow};

use fightpool::config::PoolConfig;
use fightpool::fighter::FighterFact;
use fightpool::fighter_resolver::FighterResolver;
use fightpool::logging;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let name = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if name.trim().is_empty() {
        return Err(anyhow!("usage: lookup_fighter <name>"));
    }

    let cfg = PoolConfig::from_env();
    let resolver = FighterResolver::from_config(&cfg.fighters, &cfg.http);
    println!("Sources: {}", resolver.source_names().join(" -> "));

    let res = resolver.resolve(&name, &FighterFact::default(), false);
    let fact = &res.fact;
    println!("Name: {}", res.display_name);
    println!("Found: {}", res.found);
    println!("Image: {}", fact.image_url.as_deref().unwrap_or("n/a"));
    println!(
        "Record: {}",
        fact.record.map_or_else(|| "n/a".to_string(), |r| r.to_string())
    );
    println!(
        "Nationality: {} {}",
        fact.nationality.as_deref().unwrap_or("n/a"),
        fact.flag.emoji().unwrap_or_default()
    );
    if !res.failures.is_empty() {
        println!("Failures:");
        for failure in &res.failures {
            println!("   - {} {}: {}", failure.source, failure.kind, failure.detail);
        }
    }
    Ok(())
}
