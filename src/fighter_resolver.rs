//! Fills a fighter's missing facts from an ordered list of sources.
//!
//! Every source is tried against the same still-missing field set. Values
//! only ever land in fields that are still empty, so whatever the caller
//! already knew and whatever a higher-priority source returned survives.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{FighterLookupConfig, HttpConfig};
use crate::error::{ErrorKind, LookupError};
use crate::fighter::{FactField, FieldSet, FighterFact};
use crate::names::has_abbreviated_first_name;
use crate::roster_fetch::RosterClient;
use crate::wikidata_fetch::WikidataClient;
use crate::wikipedia_fetch::WikipediaClient;

/// One external source of fighter facts.
///
/// `wanted` is the subset of [`provides`](FighterSource::provides) that is
/// still missing; sources may skip requests for fields outside it.
pub trait FighterSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn provides(&self) -> FieldSet;
    fn lookup(&self, name: &str, wanted: FieldSet) -> Result<FighterFact, LookupError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: &'static str,
    pub kind: ErrorKind,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub fact: FighterFact,
    pub found: bool,
    /// The queried name, or the resolved full name when the query used an
    /// abbreviated first name.
    pub display_name: String,
    pub failures: Vec<SourceFailure>,
}

pub struct FighterResolver {
    sources: Vec<Box<dyn FighterSource>>,
}

impl FighterResolver {
    /// Roster, then knowledge base, then encyclopedia. A disabled lookup
    /// config yields a resolver with no sources.
    pub fn from_config(cfg: &FighterLookupConfig, http: &HttpConfig) -> Self {
        if !cfg.enabled {
            return Self::with_sources(Vec::new());
        }
        Self::with_sources(vec![
            Box::new(RosterClient::new(cfg, http)),
            Box::new(WikidataClient::new(cfg, http)),
            Box::new(WikipediaClient::new(cfg, http)),
        ])
    }

    pub fn with_sources(sources: Vec<Box<dyn FighterSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, name: &str, known: &FighterFact, skip: bool) -> Resolution {
        let queried = name.trim();
        let known = known.clone().normalized();
        if skip {
            return Resolution {
                fact: known,
                found: true,
                display_name: queried.to_string(),
                failures: Vec::new(),
            };
        }
        if queried.is_empty() {
            return Resolution {
                found: known.has_any_semantic(),
                fact: known,
                display_name: String::new(),
                failures: Vec::new(),
            };
        }

        let abbreviated = has_abbreviated_first_name(queried);

        let mut fact = known;
        let mut query_name = queried.to_string();
        let mut failures = Vec::new();

        for source in &self.sources {
            let missing = fact.missing();
            if missing.is_empty() {
                break;
            }
            let wanted = missing.intersection(source.provides());
            if wanted.is_empty() {
                debug!(source = source.name(), fighter = %query_name, "nothing this source can fill");
                continue;
            }

            match source.lookup(&query_name, wanted) {
                Ok(candidate) => {
                    let filled = fact.fill_missing_from(&candidate.normalized(), wanted);
                    // Only a full name a source just supplied renames the
                    // fighter; one the caller already knew does not.
                    if abbreviated
                        && filled.contains(FactField::FullName)
                        && let Some(full) = fact.full_name.as_deref()
                        && full != query_name
                    {
                        debug!(from = %query_name, to = full, "abbreviated name resolved");
                        query_name = full.to_string();
                    }
                    if filled.is_empty() {
                        failures.push(SourceFailure {
                            source: source.name(),
                            kind: ErrorKind::NotFound,
                            detail: "no missing field in response".to_string(),
                        });
                    }
                }
                Err(err) => {
                    warn!(
                        source = source.name(),
                        fighter = %query_name,
                        kind = %err.kind,
                        detail = %err.detail,
                        "fighter source failed"
                    );
                    failures.push(SourceFailure {
                        source: source.name(),
                        kind: err.kind,
                        detail: err.detail,
                    });
                }
            }
        }

        let found = fact.has_any_semantic();
        info!(
            fighter = queried,
            display = %query_name,
            found,
            failures = failures.len(),
            "fighter resolved"
        );
        Resolution {
            fact,
            found,
            display_name: query_name,
            failures,
        }
    }
}
