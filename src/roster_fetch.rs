use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{FighterLookupConfig, HttpConfig};
use crate::error::LookupError;
use crate::fighter::{FieldSet, FightRecord, FighterFact, Flag};
use crate::fighter_resolver::FighterSource;
use crate::http_cache::fetch_text_cached;
use crate::http_client::get_text;
use crate::names::{slugify, split_initial};

const SYNC_PAGE_LIMIT: u32 = 50;
const SYNC_MAX_PAGES: usize = 400;
const SYNC_RETRY_PAUSE: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize, Default)]
pub struct RosterPage {
    #[serde(default)]
    pub data: Vec<RosterEntry>,
    #[serde(default)]
    meta: Option<RosterMeta>,
    #[serde(default)]
    links: Option<RosterLinks>,
}

impl RosterPage {
    pub fn next_url(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.next.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn total(&self) -> Option<u64> {
        self.meta.as_ref().and_then(|m| m.total.as_ref()).and_then(value_u64)
    }
}

#[derive(Debug, Deserialize, Default)]
struct RosterMeta {
    total: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
struct RosterLinks {
    next: Option<String>,
}

/// One roster entry. Numeric fields arrive as numbers or strings depending on
/// the CMS field type, so they stay loose until read.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RosterEntry {
    pub id: Option<Value>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub wins: Option<Value>,
    pub losses: Option<Value>,
    pub draws: Option<Value>,
    pub kos: Option<Value>,
    pub nickname: Option<String>,
    pub retired: Option<Value>,
    pub nationality: Option<Value>,
    pub passport_image: Option<Value>,
    pub front_image: Option<Value>,
    pub weight_class: Option<Value>,
    pub ranking: Option<Value>,
    pub height: Option<Value>,
    pub weight: Option<Value>,
}

impl RosterEntry {
    fn slug(&self) -> Option<&str> {
        self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn record(&self) -> Option<FightRecord> {
        let wins = self.wins.as_ref().and_then(value_u32)?;
        Some(FightRecord::new(
            wins,
            self.losses.as_ref().and_then(value_u32).unwrap_or(0),
            self.draws.as_ref().and_then(value_u32).unwrap_or(0),
        ))
    }

    /// Portrait first, full-body shot as fallback.
    fn image_url(&self) -> Option<String> {
        [&self.passport_image, &self.front_image]
            .into_iter()
            .flatten()
            .find_map(image_value_url)
    }

    fn nationality(&self) -> (Option<String>, Option<String>) {
        match self.nationality.as_ref() {
            Some(Value::Array(items)) => {
                let Some(first) = items.first() else {
                    return (None, None);
                };
                (
                    non_empty(first.get("label").and_then(Value::as_str)),
                    non_empty(first.get("key").and_then(Value::as_str)),
                )
            }
            Some(Value::String(label)) => (non_empty(Some(label)), None),
            _ => (None, None),
        }
    }

    pub fn to_fact(&self) -> FighterFact {
        let (nationality, code) = self.nationality();
        let flag = match (code.as_deref(), nationality.as_deref()) {
            (Some(code), _) if crate::country::is_valid_code(code) => Flag::from_code(code),
            (_, Some(label)) => Flag::from_country_name(label),
            _ => Flag::Unknown,
        };
        FighterFact {
            image_url: self.image_url(),
            record: self.record(),
            nationality,
            flag,
            full_name: non_empty(self.title.as_deref()),
        }
        .normalized()
    }
}

/// Extended roster profile kept by the sync job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterFighter {
    pub roster_id: u64,
    pub slug: String,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub kos: u32,
    pub nickname: Option<String>,
    pub retired: bool,
    pub nationality: Option<String>,
    pub nationality_code: Option<String>,
    pub image_url: Option<String>,
    pub weight_class: Option<String>,
    pub ranking: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

impl RosterFighter {
    /// `None` for entries without an id or slug.
    pub fn from_entry(entry: &RosterEntry) -> Option<Self> {
        let roster_id = entry.id.as_ref().and_then(value_u64)?;
        let slug = entry.slug()?.to_string();
        let (nationality, nationality_code) = entry.nationality();
        Some(Self {
            roster_id,
            name: non_empty(entry.title.as_deref()).unwrap_or_else(|| slug.clone()),
            slug,
            first_name: non_empty(entry.first_name.as_deref()),
            last_name: non_empty(entry.last_name.as_deref()),
            wins: entry.wins.as_ref().and_then(value_u32).unwrap_or(0),
            losses: entry.losses.as_ref().and_then(value_u32).unwrap_or(0),
            draws: entry.draws.as_ref().and_then(value_u32).unwrap_or(0),
            kos: entry.kos.as_ref().and_then(value_u32).unwrap_or(0),
            nickname: non_empty(entry.nickname.as_deref()),
            retired: entry.retired.as_ref().is_some_and(value_truthy),
            nationality,
            nationality_code,
            image_url: entry.image_url(),
            weight_class: entry.weight_class.as_ref().and_then(first_label),
            ranking: entry.ranking.as_ref().and_then(first_label),
            height: entry.height.as_ref().and_then(value_f64),
            weight: entry.weight.as_ref().and_then(value_f64),
        })
    }
}

pub fn parse_roster_page_json(raw: &str) -> Result<RosterPage, LookupError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(RosterPage::default());
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Candidates for an abbreviated name: slug must start with the initial.
pub fn select_by_initial(entries: Vec<RosterEntry>, initial: &str) -> Option<RosterEntry> {
    entries
        .into_iter()
        .find(|e| e.slug().is_some_and(|s| s.starts_with(initial)))
}

/// The promotion's fighter roster, queried by slug.
pub struct RosterClient {
    base_url: String,
    http: HttpConfig,
}

impl RosterClient {
    pub fn new(cfg: &FighterLookupConfig, http: &HttpConfig) -> Self {
        Self {
            base_url: cfg.roster_api_base.trim_end_matches('/').to_string(),
            http: http.clone(),
        }
    }

    fn fetch_entries(&self, filter: &str, value: &str) -> Result<Vec<RosterEntry>, LookupError> {
        let body = fetch_text_cached(
            &self.base_url,
            &[(filter, value)],
            self.http.long_timeout,
            &self.http,
        )?;
        Ok(parse_roster_page_json(&body)?.data)
    }

    fn lookup_entry(&self, name: &str) -> Result<RosterEntry, LookupError> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(LookupError::not_found("empty slug"));
        }

        let exact = self.fetch_entries("filter[slug]", &slug);
        if let Ok(entries) = &exact
            && let Some(entry) = entries.first()
        {
            return Ok(entry.clone());
        }

        let Some((initial, last_name)) = split_initial(name) else {
            return Err(exact
                .err()
                .unwrap_or_else(|| LookupError::not_found(format!("no roster entry for {slug}"))));
        };
        let last_slug = slugify(last_name);
        if last_slug.is_empty() {
            return Err(LookupError::not_found("empty last name"));
        }
        debug!(fighter = name, last = %last_slug, "roster: retrying abbreviated name by last name");
        let candidates = self.fetch_entries("filter[slug:contains]", &last_slug)?;
        select_by_initial(candidates, &initial).ok_or_else(|| {
            LookupError::not_found(format!("no {initial}* roster entry containing {last_slug}"))
        })
    }
}

impl FighterSource for RosterClient {
    fn name(&self) -> &'static str {
        "roster"
    }

    fn provides(&self) -> FieldSet {
        FieldSet::all()
    }

    fn lookup(&self, name: &str, _wanted: FieldSet) -> Result<FighterFact, LookupError> {
        let entry = self.lookup_entry(name)?;
        let fact = entry.to_fact();
        info!(
            fighter = name,
            slug = entry.slug().unwrap_or_default(),
            found = fact.has_any_semantic(),
            "roster lookup"
        );
        Ok(fact)
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct RosterSync {
    pub fighters: Vec<RosterFighter>,
    pub pages: usize,
    pub duplicates_skipped: usize,
    pub invalid_skipped: usize,
    pub total_reported: Option<u64>,
    pub errors: Vec<String>,
}

/// Walk the whole roster following `links.next`. A failing page is retried
/// once after a short pause; a second failure stops the walk and is recorded.
pub fn sync_roster(cfg: &FighterLookupConfig, http: &HttpConfig) -> Result<RosterSync> {
    let mut out = RosterSync::default();
    let mut seen_slugs: HashSet<String> = HashSet::new();
    let mut url = format!(
        "{}?limit={SYNC_PAGE_LIMIT}",
        cfg.roster_api_base.trim_end_matches('/')
    );

    while out.pages < SYNC_MAX_PAGES {
        let page = match fetch_sync_page(&url, http) {
            Ok(page) => page,
            Err(first) => {
                warn!(url = %url, error = %first, "roster page failed, retrying");
                thread::sleep(SYNC_RETRY_PAUSE);
                match fetch_sync_page(&url, http) {
                    Ok(page) => page,
                    Err(second) => {
                        out.errors.push(format!("page {}: {second}", out.pages + 1));
                        break;
                    }
                }
            }
        };
        out.pages += 1;
        out.total_reported = page.total().or(out.total_reported);
        absorb_page(&mut out, &mut seen_slugs, &page);
        info!(
            page = out.pages,
            synced = out.fighters.len(),
            total = ?out.total_reported,
            "roster page synced"
        );

        match page.next_url() {
            Some(next) if next != url => url = next.to_string(),
            _ => break,
        }
    }

    if out.pages == 0 {
        return Err(anyhow!(
            "roster sync fetched no pages: {}",
            out.errors.join("; ")
        ));
    }
    Ok(out)
}

fn fetch_sync_page(url: &str, http: &HttpConfig) -> Result<RosterPage, LookupError> {
    let body = get_text(url, &[], http.roster_sync_timeout)?;
    parse_roster_page_json(&body)
}

pub fn absorb_page(out: &mut RosterSync, seen_slugs: &mut HashSet<String>, page: &RosterPage) {
    for entry in &page.data {
        let Some(fighter) = RosterFighter::from_entry(entry) else {
            out.invalid_skipped += 1;
            continue;
        };
        if !seen_slugs.insert(fighter.slug.clone()) {
            out.duplicates_skipped += 1;
            continue;
        }
        out.fighters.push(fighter);
    }
}

fn image_value_url(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => non_empty(map.get("url").and_then(Value::as_str)),
        Value::String(url) => non_empty(Some(url)),
        _ => None,
    }
}

/// First label of a list-of-strings or `{value,label}` field.
fn first_label(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(first_label),
        Value::Object(map) => non_empty(
            map.get("label")
                .and_then(Value::as_str)
                .or_else(|| map.get("value").and_then(Value::as_str)),
        ),
        Value::String(s) => non_empty(Some(s)),
        _ => None,
    }
}

fn value_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_u32(value: &Value) -> Option<u32> {
    value_u64(value).and_then(|v| u32::try_from(v).ok())
}

fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite() && *v > 0.0)
}

fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.trim().is_empty() && s.trim() != "0",
        _ => false,
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(value: Value) -> RosterEntry {
        serde_json::from_value(value).expect("entry json")
    }

    #[test]
    fn passport_image_wins_over_front_image() {
        let e = entry(json!({
            "front_image": {"url": "https://cdn/front.png"},
            "passport_image": {"url": "https://cdn/passport.png"}
        }));
        assert_eq!(e.to_fact().image_url.as_deref(), Some("https://cdn/passport.png"));
    }

    #[test]
    fn missing_losses_and_draws_default_to_zero() {
        let e = entry(json!({"wins": "12"}));
        assert_eq!(e.to_fact().record, Some(FightRecord::new(12, 0, 0)));
        assert_eq!(entry(json!({"losses": 3})).to_fact().record, None);
    }

    #[test]
    fn nationality_without_code_falls_back_to_table() {
        let e = entry(json!({"nationality": [{"label": "Morocco", "key": ""}]}));
        let fact = e.to_fact();
        assert_eq!(fact.nationality.as_deref(), Some("Morocco"));
        assert_eq!(fact.flag, Flag::Code("MA".into()));

        let e = entry(json!({"nationality": [{"label": "Atlantis"}]}));
        assert_eq!(e.to_fact().flag, Flag::Unflagged);

        assert_eq!(entry(json!({})).to_fact().flag, Flag::Unknown);
    }

    #[test]
    fn initial_filter_requires_slug_prefix() {
        let entries = vec![
            entry(json!({"slug": "mohamed-bouzid"})),
            entry(json!({"slug": "ayoub-bouzid"})),
        ];
        let picked = select_by_initial(entries, "a").expect("candidate");
        assert_eq!(picked.slug.as_deref(), Some("ayoub-bouzid"));
        assert!(select_by_initial(vec![entry(json!({"slug": "x-bouzid"}))], "a").is_none());
    }

    #[test]
    fn sync_skips_invalid_and_duplicate_entries() {
        let page = parse_roster_page_json(
            r##"{"data": [
                {"id": 1, "slug": "rico-verhoeven", "title": "Rico Verhoeven"},
                {"id": 2, "slug": "rico-verhoeven"},
                {"slug": "no-id"},
                {"id": 3, "slug": "levi-rigters", "weight_class": ["heavyweight"],
                 "ranking": {"value": "1", "label": "#1"}, "height": "193", "retired": 0}
            ], "meta": {"total": "4"}, "links": {"next": ""}}"##,
        )
        .expect("page");
        let mut out = RosterSync::default();
        let mut seen = HashSet::new();
        absorb_page(&mut out, &mut seen, &page);
        assert_eq!(out.fighters.len(), 2);
        assert_eq!(out.duplicates_skipped, 1);
        assert_eq!(out.invalid_skipped, 1);
        assert_eq!(page.total(), Some(4));
        assert_eq!(page.next_url(), None);

        let levi = &out.fighters[1];
        assert_eq!(levi.name, "levi-rigters");
        assert_eq!(levi.weight_class.as_deref(), Some("heavyweight"));
        assert_eq!(levi.ranking.as_deref(), Some("#1"));
        assert_eq!(levi.height, Some(193.0));
        assert!(!levi.retired);
    }
}
