use anyhow::{Result, anyhow};

use fightpool::config::PoolConfig;
use fightpool::logging;
use fightpool::odds_fetch::{OddsSource, TheOddsApi};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let [fighter_a, fighter_b] = args.as_slice() else {
        return Err(anyhow!("usage: lookup_odds <fighter a> <fighter b>"));
    };

    let cfg = PoolConfig::from_env();
    println!("Sports: {}", cfg.odds.sport_keys.join(", "));
    let client = TheOddsApi::new(&cfg.odds, &cfg.http);
    match client.lookup(fighter_a, fighter_b) {
        Ok(quote) => {
            println!("{fighter_a}: {}", quote.odds_a);
            println!("{fighter_b}: {}", quote.odds_b);
            println!("Source: {}", quote.provider);
        }
        Err(err) => println!("No odds: {err}"),
    }
    Ok(())
}
