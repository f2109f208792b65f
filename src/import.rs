//! Bulk match import. Rows arrive as header -> value maps already split by
//! the file reader; this module only normalizes values and runs enrichment.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::enrich::{Enricher, Unresolved};
use crate::fighter::{FightRecord, FighterFact, Flag};
use crate::model::{Match, MatchId, Multiplier, OddsProvenance};
use crate::odds_resolver::{OddsOutcome, normalize_odds};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideOverrides {
    pub record: Option<FightRecord>,
    pub nationality: Option<String>,
    pub image_url: Option<String>,
}

impl SideOverrides {
    fn to_fact(&self) -> FighterFact {
        FighterFact {
            image_url: self.image_url.clone(),
            record: self.record,
            flag: self
                .nationality
                .as_deref()
                .map_or(Flag::Unknown, Flag::from_country_name),
            nationality: self.nationality.clone(),
            full_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub fighter_a: String,
    pub fighter_b: String,
    pub multiplier: Multiplier,
    pub odds_a: Option<Decimal>,
    pub odds_b: Option<Decimal>,
    pub side_a: SideOverrides,
    pub side_b: SideOverrides,
}

/// "Fighter A" -> "fighter_a".
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Accepts "1.85" and "1,85"; anything unparseable is dropped.
pub fn parse_odds_lenient(raw: &str) -> Option<Decimal> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    normalize_odds(Decimal::from_str(&cleaned).ok())
}

impl ImportRow {
    /// `None` when either fighter name is missing.
    pub fn from_record(record: &HashMap<String, String>) -> Option<Self> {
        let fields: HashMap<String, &str> = record
            .iter()
            .map(|(k, v)| (normalize_header(k), v.trim()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        let get = |key: &str| fields.get(key).copied();

        let fighter_a = get("fighter_a")?.to_string();
        let fighter_b = get("fighter_b")?.to_string();
        let overrides = |prefix: &str| SideOverrides {
            record: get(&format!("{prefix}_record")).and_then(|raw| match raw.parse::<FightRecord>() {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(fighter = prefix, error = %err, "ignoring imported record");
                    None
                }
            }),
            nationality: get(&format!("{prefix}_nationality")).map(str::to_string),
            image_url: get(&format!("{prefix}_image")).map(str::to_string),
        };

        Some(Self {
            multiplier: get("multiplier").map_or(Multiplier::ONE, Multiplier::parse_lenient),
            odds_a: get("odds_a").and_then(parse_odds_lenient),
            odds_b: get("odds_b").and_then(parse_odds_lenient),
            side_a: overrides("fighter_a"),
            side_b: overrides("fighter_b"),
            fighter_a,
            fighter_b,
        })
    }

    /// The match as stored before any lookup: imported odds are `csv`.
    pub fn to_match(&self, id: MatchId) -> Match {
        let mut m = Match::new(id, &self.fighter_a, &self.fighter_b);
        m.multiplier = self.multiplier;
        m.odds_a = self.odds_a;
        m.odds_b = self.odds_b;
        if m.odds_a.is_some() || m.odds_b.is_some() {
            m.odds_provenance = OddsProvenance::Csv;
        }
        m.fighter_a = self.side_a.to_fact();
        m.fighter_b = self.side_b.to_fact();
        m
    }
}

/// Rows missing a fighter name are skipped and counted.
pub fn parse_import_rows(records: &[HashMap<String, String>]) -> (Vec<ImportRow>, usize) {
    let rows: Vec<ImportRow> = records.iter().filter_map(ImportRow::from_record).collect();
    let skipped = records.len() - rows.len();
    (rows, skipped)
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub matches: Vec<Match>,
    pub not_found: Vec<Unresolved>,
    pub odds_fetched: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub odds_fetched: usize,
    pub not_found: Vec<String>,
}

impl ImportReport {
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            imported: self.matches.len(),
            odds_fetched: self.odds_fetched,
            not_found: self.not_found.iter().map(|u| u.name.clone()).collect(),
        }
    }
}

/// Build and enrich one match per row, ids counting up from `first_id`.
/// Imported fields are kept and only the missing ones are looked up; odds
/// are requested only for rows that carried none.
pub fn import_rows(enricher: &Enricher, rows: &[ImportRow], first_id: MatchId) -> ImportReport {
    let mut out = ImportReport::default();
    for (id, row) in (first_id..).zip(rows) {
        let mut m = row.to_match(id);
        let report = enricher.enrich_new_match(&mut m);
        if report.odds == Some(OddsOutcome::Updated) {
            out.odds_fetched += 1;
        }
        out.not_found.extend(report.not_found);
        out.matches.push(m);
    }
    info!(
        imported = out.matches.len(),
        odds_fetched = out.odds_fetched,
        unresolved = out.not_found.len(),
        "import finished"
    );
    out
}
