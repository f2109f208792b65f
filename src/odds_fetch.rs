use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{HttpConfig, env_bool, env_string};
use crate::error::{ErrorKind, LookupError};
use crate::http_client::{body_snippet, get_text};
use crate::names::names_match;

const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4";
const DEFAULT_SPORT_KEY: &str = "mma_mixed_martial_arts";
pub const PROVIDER_NAME: &str = "The Odds API";

#[derive(Debug, Clone)]
pub struct OddsFetchConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub regions: String,
    pub sport_keys: Vec<String>,
    pub base_url: String,
}

impl OddsFetchConfig {
    pub fn from_env() -> Self {
        let regions = env_string("ODDS_REGIONS")
            .unwrap_or_else(|| "eu".to_string())
            .to_ascii_lowercase();
        let sport_keys = env_string("ODDS_SPORT_KEYS")
            .map(|raw| parse_sport_keys(&raw))
            .filter(|keys| !keys.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_SPORT_KEY.to_string()]);

        Self {
            enabled: env_bool("ODDS_ENABLED", true),
            api_key: env_string("ODDS_API_KEY"),
            regions,
            sport_keys,
            base_url: env_string("ODDS_API_BASE").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

impl Default for OddsFetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            regions: "eu".to_string(),
            sport_keys: vec![DEFAULT_SPORT_KEY.to_string()],
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

fn parse_sport_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_ascii_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Decimal odds for both sides of a matchup, in the caller's A/B order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OddsQuote {
    pub odds_a: Decimal,
    pub odds_b: Decimal,
    pub provider: String,
}

pub trait OddsSource: Send + Sync {
    fn lookup(&self, fighter_a: &str, fighter_b: &str) -> Result<OddsQuote, LookupError>;
}

#[derive(Debug, Deserialize)]
pub struct OddsEvent {
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    bookmakers: Vec<OddsBookmaker>,
}

impl OddsEvent {
    fn home(&self) -> &str {
        self.home_team.as_deref().unwrap_or_default()
    }

    fn away(&self) -> &str {
        self.away_team.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct OddsBookmaker {
    #[serde(default)]
    markets: Vec<OddsMarket>,
}

#[derive(Debug, Deserialize)]
struct OddsMarket {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    outcomes: Vec<MarketOutcome>,
}

#[derive(Debug, Deserialize)]
struct MarketOutcome {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
}

/// Reads the feed event by event; an event that does not deserialize is
/// dropped without hiding the rest. A body that is not an array is a parse
/// error.
pub fn parse_odds_events_json(raw: &str) -> Result<Vec<OddsEvent>, LookupError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let items = match serde_json::from_str::<Value>(trimmed)? {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(LookupError::parse(format!(
                "odds feed is not a list: {}",
                body_snippet(&other.to_string())
            )));
        }
    };
    let total = items.len();
    let events: Vec<OddsEvent> = items
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    if events.len() < total {
        debug!(skipped = total - events.len(), total, "unreadable odds events dropped");
    }
    Ok(events)
}

/// Whether fighter A is the event's home side. Requires exactly one
/// consistent assignment; events where both or neither fit are skipped.
fn side_assignment(event: &OddsEvent, fighter_a: &str, fighter_b: &str) -> Option<bool> {
    // Blank labels never match, so an event missing a side is skipped
    // rather than assigned by elimination.
    let a_home = names_match(fighter_a, event.home());
    let a_away = names_match(fighter_a, event.away());
    let b_home = names_match(fighter_b, event.home());
    let b_away = names_match(fighter_b, event.away());
    match (a_home && b_away, a_away && b_home) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

fn round_price(price: f64) -> Option<Decimal> {
    if !price.is_finite() || price <= 0.0 {
        return None;
    }
    Decimal::from_f64(price)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Best (highest) h2h price per side across every bookmaker of the event.
fn best_prices(event: &OddsEvent, fighter_a: &str, fighter_b: &str) -> (Option<f64>, Option<f64>) {
    let mut best_a: Option<f64> = None;
    let mut best_b: Option<f64> = None;
    let outcomes = event
        .bookmakers
        .iter()
        .flat_map(|b| b.markets.iter())
        .filter(|m| m.key.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("h2h")))
        .flat_map(|m| m.outcomes.iter());

    for outcome in outcomes {
        let (Some(name), Some(price)) = (outcome.name.as_deref(), outcome.price) else {
            continue;
        };
        if !price.is_finite() || price <= 0.0 {
            continue;
        }
        let slot = if names_match(fighter_a, name) {
            &mut best_a
        } else if names_match(fighter_b, name) {
            &mut best_b
        } else {
            continue;
        };
        if slot.is_none_or(|current| price > current) {
            *slot = Some(price);
        }
    }
    (best_a, best_b)
}

/// First event in feed order that matches the pair and prices both sides.
pub fn find_quote(events: &[OddsEvent], fighter_a: &str, fighter_b: &str) -> Option<(Decimal, Decimal)> {
    events.iter().find_map(|event| {
        side_assignment(event, fighter_a, fighter_b)?;
        let (a, b) = best_prices(event, fighter_a, fighter_b);
        debug!(
            home = event.home(),
            away = event.away(),
            odds_a = ?a,
            odds_b = ?b,
            "odds event matched"
        );
        Some((round_price(a?)?, round_price(b?)?))
    })
}

pub struct TheOddsApi {
    cfg: OddsFetchConfig,
    http: HttpConfig,
}

impl TheOddsApi {
    pub fn new(cfg: &OddsFetchConfig, http: &HttpConfig) -> Self {
        Self {
            cfg: cfg.clone(),
            http: http.clone(),
        }
    }

    fn fetch_events(&self, api_key: &str, sport_key: &str) -> Result<Vec<OddsEvent>, LookupError> {
        let url = format!(
            "{}/sports/{sport_key}/odds/",
            self.cfg.base_url.trim_end_matches('/')
        );
        let body = get_text(
            &url,
            &[
                ("apiKey", api_key),
                ("regions", self.cfg.regions.as_str()),
                ("markets", "h2h"),
                ("oddsFormat", "decimal"),
            ],
            self.http.timeout,
        )?;
        parse_odds_events_json(&body)
    }
}

impl OddsSource for TheOddsApi {
    /// Walks the configured sport feeds in order. A failing feed is logged
    /// and skipped; the last failure kind is reported if nothing matched.
    fn lookup(&self, fighter_a: &str, fighter_b: &str) -> Result<OddsQuote, LookupError> {
        if !self.cfg.enabled {
            return Err(LookupError::not_found("odds fetching disabled"));
        }
        let Some(api_key) = self.cfg.api_key.as_deref() else {
            return Err(LookupError::not_found("ODDS_API_KEY not set"));
        };

        let mut last_err: Option<LookupError> = None;
        for sport_key in &self.cfg.sport_keys {
            let events = match self.fetch_events(api_key, sport_key) {
                Ok(events) => events,
                Err(err) => {
                    warn!(sport = %sport_key, kind = %err.kind, detail = %err.detail, "odds feed failed");
                    last_err = Some(err);
                    continue;
                }
            };
            if let Some((odds_a, odds_b)) = find_quote(&events, fighter_a, fighter_b) {
                info!(sport = %sport_key, fighter_a, fighter_b, %odds_a, %odds_b, "odds found");
                return Ok(OddsQuote {
                    odds_a,
                    odds_b,
                    provider: PROVIDER_NAME.to_string(),
                });
            }
        }

        Err(last_err
            .filter(|err| err.kind != ErrorKind::NotFound)
            .unwrap_or_else(|| {
                LookupError::not_found(format!("no priced event for {fighter_a} vs {fighter_b}"))
            }))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn events(raw: &str) -> Vec<OddsEvent> {
        parse_odds_events_json(raw).expect("odds json")
    }

    #[test]
    fn sport_keys_are_trimmed_and_lowercased() {
        assert_eq!(
            parse_sport_keys(" MMA_mixed_martial_arts, ,boxing_boxing"),
            vec!["mma_mixed_martial_arts", "boxing_boxing"]
        );
    }

    #[test]
    fn ambiguous_assignment_is_skipped() {
        let feed = events(
            r#"[{"home_team": "Smith", "away_team": "Smith",
                "bookmakers": [{"markets": [{"key": "h2h", "outcomes": [
                    {"name": "Smith", "price": 1.5}]}]}]}]"#,
        );
        assert_eq!(find_quote(&feed, "John Smith", "Adam Smith"), None);
    }

    #[test]
    fn reversed_event_keeps_caller_order() {
        let feed = events(
            r#"[{"home_team": "Levi Rigters", "away_team": "Rico Verhoeven",
                "bookmakers": [{"markets": [{"key": "h2h", "outcomes": [
                    {"name": "Rico Verhoeven", "price": 1.4},
                    {"name": "Levi Rigters", "price": 3.1}]}]}]}]"#,
        );
        let (a, b) = find_quote(&feed, "Rico Verhoeven", "Levi Rigters").expect("quote");
        assert_eq!(a, Decimal::new(140, 2));
        assert_eq!(b, Decimal::new(310, 2));
    }

    #[test]
    fn non_h2h_markets_and_bad_prices_are_ignored() {
        let feed = events(
            r#"[{"home_team": "Rico Verhoeven", "away_team": "Levi Rigters",
                "bookmakers": [{"markets": [
                    {"key": "totals", "outcomes": [{"name": "Rico Verhoeven", "price": 9.0}]},
                    {"key": "h2h", "outcomes": [
                        {"name": "Rico Verhoeven", "price": -1.0},
                        {"name": "Levi Rigters", "price": 2.5}]}]}]}]"#,
        );
        assert_eq!(find_quote(&feed, "Rico Verhoeven", "Levi Rigters"), None);
    }

    #[test]
    fn event_with_blank_side_is_not_assigned() {
        let feed = events(
            r#"[{"home_team": "", "away_team": "Levi Rigters",
                "bookmakers": [{"markets": [{"key": "h2h", "outcomes": [
                    {"name": "Rico Verhoeven", "price": 1.4},
                    {"name": "Levi Rigters", "price": 3.1}]}]}]},
               {"home_team": null, "away_team": "Rico Verhoeven",
                "bookmakers": []}]"#,
        );
        assert_eq!(feed.len(), 2);
        assert_eq!(side_assignment(&feed[0], "Rico Verhoeven", "Levi Rigters"), None);
        assert_eq!(side_assignment(&feed[1], "Levi Rigters", "Rico Verhoeven"), None);
        assert_eq!(find_quote(&feed, "Rico Verhoeven", "Levi Rigters"), None);
    }

    #[test]
    fn feed_that_is_not_a_list_is_a_parse_error() {
        let err = parse_odds_events_json(r#"{"message": "Invalid sport"}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn missing_key_is_not_found_without_request() {
        let client = TheOddsApi::new(
            &OddsFetchConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                ..OddsFetchConfig::default()
            },
            &HttpConfig::default(),
        );
        let err = client.lookup("Rico Verhoeven", "Levi Rigters").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
