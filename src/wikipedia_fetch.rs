use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{FighterLookupConfig, HttpConfig};
use crate::error::LookupError;
use crate::fighter::{FactField, FieldSet, FightRecord, FighterFact};
use crate::fighter_resolver::FighterSource;
use crate::http_cache::fetch_text_cached;

static INFOBOX_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\s*([A-Za-z_]+)\s*=\s*(\d+)").expect("static regex"));

/// Sport-specific infobox fields first, then the generic totals.
const RECORD_FIELD_SETS: [[&str; 3]; 2] = [
    ["kickbox_win", "kickbox_loss", "kickbox_draw"],
    ["total_win", "total_loss", "total_draw"],
];

/// First numeric value of every `| field = N` line in a wikitext block.
pub fn infobox_numbers(wikitext: &str) -> HashMap<String, u32> {
    let mut out = HashMap::new();
    for caps in INFOBOX_NUMBER.captures_iter(wikitext) {
        let Ok(value) = caps[2].parse::<u32>() else {
            continue;
        };
        out.entry(caps[1].to_ascii_lowercase()).or_insert(value);
    }
    out
}

/// Record only when a wins field exists; missing losses and draws count as 0.
pub fn record_from_wikitext(wikitext: &str) -> Option<FightRecord> {
    let fields = infobox_numbers(wikitext);
    RECORD_FIELD_SETS.iter().find_map(|[win, loss, draw]| {
        let wins = *fields.get(*win)?;
        Some(FightRecord::new(
            wins,
            fields.get(*loss).copied().unwrap_or(0),
            fields.get(*draw).copied().unwrap_or(0),
        ))
    })
}

fn api_error(root: &Value) -> Option<LookupError> {
    let error = root.get("error")?;
    let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
    let info = error.get("info").and_then(Value::as_str).unwrap_or_default();
    Some(match code {
        "missingtitle" | "invalidtitle" => LookupError::not_found(format!("{code}: {info}")),
        _ => LookupError::network(format!("{code}: {info}")),
    })
}

pub fn parse_wikitext_json(raw: &str) -> Result<String, LookupError> {
    let root: Value = serde_json::from_str(raw)?;
    if let Some(err) = api_error(&root) {
        return Err(err);
    }
    root.pointer("/parse/wikitext/*")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LookupError::parse("response without parse.wikitext"))
}

pub fn parse_page_image_json(raw: &str) -> Result<Option<String>, LookupError> {
    let root: Value = serde_json::from_str(raw)?;
    if let Some(err) = api_error(&root) {
        return Err(err);
    }
    let Some(pages) = root.pointer("/query/pages").and_then(Value::as_object) else {
        return Ok(None);
    };
    Ok(pages
        .values()
        .find_map(|page| page.pointer("/original/source").and_then(Value::as_str))
        .map(str::to_string))
}

fn page_title(name: &str) -> String {
    name.trim().replace(' ', "_")
}

/// Free-text encyclopedia: infobox record and a fallback portrait.
pub struct WikipediaClient {
    api: String,
    http: HttpConfig,
}

impl WikipediaClient {
    pub fn new(cfg: &FighterLookupConfig, http: &HttpConfig) -> Self {
        Self {
            api: cfg.wikipedia_api.clone(),
            http: http.clone(),
        }
    }

    fn record(&self, title: &str) -> Result<Option<FightRecord>, LookupError> {
        let body = fetch_text_cached(
            &self.api,
            &[
                ("action", "parse"),
                ("page", title),
                ("prop", "wikitext"),
                ("section", "0"),
                ("format", "json"),
            ],
            self.http.long_timeout,
            &self.http,
        )?;
        Ok(record_from_wikitext(&parse_wikitext_json(&body)?))
    }

    fn page_image(&self, title: &str) -> Result<Option<String>, LookupError> {
        let body = fetch_text_cached(
            &self.api,
            &[
                ("action", "query"),
                ("titles", title),
                ("prop", "pageimages"),
                ("piprop", "original"),
                ("format", "json"),
            ],
            self.http.timeout,
            &self.http,
        )?;
        parse_page_image_json(&body)
    }
}

impl FighterSource for WikipediaClient {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn provides(&self) -> FieldSet {
        FieldSet::of(&[FactField::Record, FactField::Image])
    }

    /// The two requests are independent; one failing does not hide the
    /// other's answer. The first error is returned only if neither produced
    /// anything.
    fn lookup(&self, name: &str, wanted: FieldSet) -> Result<FighterFact, LookupError> {
        let title = page_title(name);
        if title.is_empty() {
            return Err(LookupError::not_found("empty title"));
        }
        let mut fact = FighterFact::default();
        let mut first_err: Option<LookupError> = None;

        if wanted.contains(FactField::Record) {
            match self.record(&title) {
                Ok(record) => fact.record = record,
                Err(err) => {
                    debug!(fighter = name, error = %err, "wikipedia: record lookup failed");
                    first_err.get_or_insert(err);
                }
            }
        }

        if wanted.contains(FactField::Image) {
            match self.page_image(&title) {
                Ok(image) => fact.image_url = image,
                Err(err) => {
                    debug!(fighter = name, error = %err, "wikipedia: page image failed");
                    first_err.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_err
            && !fact.has_any_semantic()
        {
            return Err(err);
        }
        info!(
            fighter = name,
            record = fact.record.is_some(),
            image = fact.image_url.is_some(),
            "wikipedia lookup"
        );
        Ok(fact)
    }
}
