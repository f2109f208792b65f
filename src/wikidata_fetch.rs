use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{FighterLookupConfig, HttpConfig};
use crate::country::simplify_country_name;
use crate::error::LookupError;
use crate::fighter::{FactField, FieldSet, FighterFact, Flag};
use crate::fighter_resolver::FighterSource;
use crate::http_cache::fetch_text_cached;

const COMMONS_FILE_PATH: &str = "https://commons.wikimedia.org/wiki/Special:FilePath";
const COMMONS_THUMB_WIDTH: &str = "200";
const SEARCH_LIMIT: &str = "5";
const SPORT_TERM: &str = "kickbox";
const COMBAT_TERMS: &[&str] = &["fighter", "martial", "boxer", "combat", "athlete"];

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

/// Claims this client reads off an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityClaims {
    pub image_file: Option<String>,
    pub citizenship: Option<String>,
}

pub fn parse_search_json(raw: &str) -> Result<Vec<SearchHit>, LookupError> {
    let parsed: SearchResponse = serde_json::from_str(raw)?;
    Ok(parsed.search)
}

/// Prefer a hit described as a kickboxer, then any combat-sports athlete.
pub fn pick_entity(hits: &[SearchHit]) -> Option<&str> {
    let description = |hit: &SearchHit| hit.description.as_deref().unwrap_or_default().to_lowercase();
    hits.iter()
        .find(|hit| description(hit).contains(SPORT_TERM))
        .or_else(|| {
            hits.iter().find(|hit| {
                let desc = description(hit);
                COMBAT_TERMS.iter().any(|term| desc.contains(term))
            })
        })
        .map(|hit| hit.id.as_str())
}

fn entity<'a>(root: &'a Value, entity_id: &str) -> Result<&'a Value, LookupError> {
    root.get("entities")
        .and_then(|e| e.get(entity_id))
        .filter(|e| e.get("missing").is_none())
        .ok_or_else(|| LookupError::not_found(format!("entity {entity_id} missing")))
}

fn first_claim_value<'a>(claims: &'a Value, property: &str) -> Option<&'a Value> {
    claims
        .get(property)?
        .as_array()?
        .first()?
        .pointer("/mainsnak/datavalue/value")
}

pub fn parse_claims_json(raw: &str, entity_id: &str) -> Result<EntityClaims, LookupError> {
    let root: Value = serde_json::from_str(raw)?;
    let Some(claims) = entity(&root, entity_id)?.get("claims") else {
        return Ok(EntityClaims::default());
    };
    Ok(EntityClaims {
        image_file: first_claim_value(claims, "P18")
            .and_then(Value::as_str)
            .map(str::to_string),
        citizenship: first_claim_value(claims, "P27")
            .and_then(|v| v.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

pub fn parse_label_json(raw: &str, entity_id: &str) -> Result<Option<String>, LookupError> {
    let root: Value = serde_json::from_str(raw)?;
    Ok(entity(&root, entity_id)?
        .pointer("/labels/en/value")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

/// Thumbnail URL for a Commons file name ("Rico Verhoeven.jpg").
pub fn commons_file_url(file_name: &str) -> Option<String> {
    let file_name = file_name.trim();
    if file_name.is_empty() {
        return None;
    }
    let mut url = Url::parse(COMMONS_FILE_PATH).ok()?;
    url.path_segments_mut()
        .ok()?
        .push(&file_name.replace(' ', "_"));
    url.query_pairs_mut()
        .append_pair("width", COMMONS_THUMB_WIDTH);
    Some(url.to_string())
}

/// Structured knowledge base: portrait and citizenship.
pub struct WikidataClient {
    api: String,
    http: HttpConfig,
}

impl WikidataClient {
    pub fn new(cfg: &FighterLookupConfig, http: &HttpConfig) -> Self {
        Self {
            api: cfg.wikidata_api.clone(),
            http: http.clone(),
        }
    }

    fn get(&self, query: &[(&str, &str)]) -> Result<String, LookupError> {
        fetch_text_cached(&self.api, query, self.http.timeout, &self.http)
    }

    fn search(&self, name: &str) -> Result<String, LookupError> {
        let body = self.get(&[
            ("action", "wbsearchentities"),
            ("search", name),
            ("language", "en"),
            ("limit", SEARCH_LIMIT),
            ("format", "json"),
        ])?;
        let hits = parse_search_json(&body)?;
        pick_entity(&hits)
            .map(str::to_string)
            .ok_or_else(|| LookupError::not_found(format!("no combat sports entity for {name}")))
    }

    fn claims(&self, entity_id: &str) -> Result<EntityClaims, LookupError> {
        let body = self.get(&[
            ("action", "wbgetentities"),
            ("ids", entity_id),
            ("props", "claims"),
            ("format", "json"),
        ])?;
        parse_claims_json(&body, entity_id)
    }

    fn country_label(&self, country_id: &str) -> Result<Option<String>, LookupError> {
        let body = self.get(&[
            ("action", "wbgetentities"),
            ("ids", country_id),
            ("props", "labels"),
            ("languages", "en"),
            ("format", "json"),
        ])?;
        Ok(parse_label_json(&body, country_id)?
            .map(|label| simplify_country_name(&label).to_string()))
    }
}

impl FighterSource for WikidataClient {
    fn name(&self) -> &'static str {
        "wikidata"
    }

    fn provides(&self) -> FieldSet {
        FieldSet::of(&[FactField::Image, FactField::Nationality, FactField::Flag])
    }

    fn lookup(&self, name: &str, wanted: FieldSet) -> Result<FighterFact, LookupError> {
        let entity_id = self.search(name)?;
        let claims = self.claims(&entity_id)?;
        let mut fact = FighterFact::default();

        if wanted.contains(FactField::Image) {
            fact.image_url = claims.image_file.as_deref().and_then(commons_file_url);
        }

        let wants_country =
            wanted.contains(FactField::Nationality) || wanted.contains(FactField::Flag);
        if wants_country && let Some(country_id) = claims.citizenship.as_deref() {
            match self.country_label(country_id) {
                Ok(Some(country)) => {
                    fact.flag = Flag::from_country_name(&country);
                    fact.nationality = Some(country);
                }
                Ok(None) => debug!(fighter = name, country_id, "wikidata: country has no english label"),
                Err(err) => debug!(fighter = name, country_id, error = %err, "wikidata: country label failed"),
            }
        }

        info!(
            fighter = name,
            entity = %entity_id,
            image = fact.image_url.is_some(),
            nationality = fact.nationality.is_some(),
            "wikidata lookup"
        );
        Ok(fact)
    }
}
