//! Match-level workflows the CRUD layer calls: create, edit, refetch and the
//! bulk "fetch all missing" sweep.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::PoolConfig;
use crate::fighter::{FieldSet, FighterFact};
use crate::fighter_resolver::{FighterResolver, Resolution, SourceFailure};
use crate::model::{Match, MatchId, Multiplier, Side};
use crate::odds_resolver::{OddsOutcome, OddsResolver};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unresolved {
    pub match_id: MatchId,
    pub side: Side,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct EnrichReport {
    pub not_found: Vec<Unresolved>,
    pub failures: Vec<(Side, SourceFailure)>,
    /// `None` when odds were not attempted.
    pub odds: Option<OddsOutcome>,
}

impl EnrichReport {
    fn record(&mut self, m: &Match, side: Side, resolution: &Resolution) {
        if !resolution.found {
            self.not_found.push(Unresolved {
                match_id: m.id,
                side,
                name: m.name(side).to_string(),
            });
        }
        self.failures
            .extend(resolution.failures.iter().cloned().map(|f| (side, f)));
    }
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Matches where at least one side gained data.
    pub resolved: usize,
    /// Matches where both sides already had data.
    pub skipped: usize,
    /// In card order.
    pub not_found: Vec<Unresolved>,
}

pub struct Enricher {
    fighters: FighterResolver,
    odds: OddsResolver,
    parallelism: usize,
}

impl Enricher {
    pub fn from_config(cfg: &PoolConfig) -> Self {
        Self::new(
            FighterResolver::from_config(&cfg.fighters, &cfg.http),
            OddsResolver::from_config(&cfg.odds, &cfg.http),
            cfg.fetch_parallelism,
        )
    }

    pub fn new(fighters: FighterResolver, odds: OddsResolver, parallelism: usize) -> Self {
        Self {
            fighters,
            odds,
            parallelism: parallelism.max(1),
        }
    }

    pub fn fighters(&self) -> &FighterResolver {
        &self.fighters
    }

    pub fn odds(&self) -> &OddsResolver {
        &self.odds
    }

    /// Resolve the sides selected by `resolve_side` against the match as it
    /// is now, then apply every resolution at once.
    fn resolve_sides(
        &self,
        m: &mut Match,
        resolve_side: impl Fn(&Match, Side) -> Option<FighterFact>,
        report: &mut EnrichReport,
    ) -> bool {
        let resolutions: Vec<(Side, Resolution)> = Side::BOTH
            .into_iter()
            .filter_map(|side| {
                let known = resolve_side(m, side)?;
                Some((side, self.fighters.resolve(m.name(side), &known, false)))
            })
            .collect();

        let mut gained = false;
        for (side, resolution) in &resolutions {
            report.record(m, *side, resolution);
            gained |= resolution.fact != *m.fighter(*side);
            m.apply_resolution(*side, resolution);
        }
        gained
    }

    /// New or imported match: look up both sides, then odds. Facts already
    /// on the match are kept and only the fields still missing are searched.
    pub fn enrich_new_match(&self, m: &mut Match) -> EnrichReport {
        let mut report = EnrichReport::default();
        self.resolve_sides(m, |m, side| Some(m.fighter(side).clone()), &mut report);
        report.odds = Some(self.odds.resolve(m));
        report
    }

    /// Apply an edit. A side whose name changed loses its old facts and is
    /// looked up again; odds are re-resolved only when a name changed. Blank
    /// names leave the side as it was.
    pub fn enrich_edited_match(
        &self,
        m: &mut Match,
        name_a: &str,
        name_b: &str,
        multiplier: Option<Multiplier>,
    ) -> EnrichReport {
        if let Some(multiplier) = multiplier {
            m.multiplier = multiplier;
        }
        let mut changed = Vec::new();
        for (side, name) in [(Side::A, name_a.trim()), (Side::B, name_b.trim())] {
            if !name.is_empty() && name != m.name(side) {
                m.rename(side, name);
                *m.fighter_mut(side) = FighterFact::default();
                changed.push(side);
            }
        }

        let mut report = EnrichReport::default();
        if changed.is_empty() {
            return report;
        }
        self.resolve_sides(
            m,
            |_, side| changed.contains(&side).then(FighterFact::default),
            &mut report,
        );
        report.odds = Some(self.odds.resolve(m));
        report
    }

    /// Look both sides up from scratch. Fresh values replace stored ones;
    /// stored values survive where the sources found nothing.
    pub fn refetch_fighter_data(&self, m: &mut Match) -> EnrichReport {
        let previous = [m.fighter(Side::A).clone(), m.fighter(Side::B).clone()];
        let mut report = EnrichReport::default();
        self.resolve_sides(m, |_, _| Some(FighterFact::default()), &mut report);
        for (side, old) in Side::BOTH.into_iter().zip(previous.iter()) {
            m.fighter_mut(side).fill_missing_from(old, FieldSet::all());
        }
        report
    }

    /// Explicit "re-fetch odds". Sticky odds stay as they are.
    pub fn refetch_odds(&self, m: &mut Match) -> OddsOutcome {
        self.odds.resolve(m)
    }

    /// Look up every side that has neither a record nor an image. Matches
    /// run in parallel on a bounded pool; each match is independent.
    pub fn sweep_missing_fighter_data(&self, matches: &mut [Match]) -> SweepReport {
        let per_match: Vec<Option<(bool, EnrichReport)>> = with_fetch_pool(self.parallelism, || {
            matches
                .par_iter_mut()
                .map(|m| {
                    if Side::BOTH.into_iter().all(|side| m.has_fighter_data(side)) {
                        return None;
                    }
                    let mut report = EnrichReport::default();
                    let gained = self.resolve_sides(
                        m,
                        |m, side| (!m.has_fighter_data(side)).then(|| m.fighter(side).clone()),
                        &mut report,
                    );
                    Some((gained, report))
                })
                .collect()
        });

        let mut out = SweepReport::default();
        for outcome in per_match {
            let Some((gained, report)) = outcome else {
                out.skipped += 1;
                continue;
            };
            out.resolved += usize::from(gained);
            out.not_found.extend(report.not_found);
        }
        if !out.not_found.is_empty() {
            warn!(count = out.not_found.len(), "sweep left fighters unresolved");
        }
        info!(
            resolved = out.resolved,
            skipped = out.skipped,
            unresolved = out.not_found.len(),
            "fighter sweep finished"
        );
        out
    }
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}
