use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::error::ErrorKind;
use crate::model::{Match, OddsProvenance};
use crate::odds_fetch::{OddsFetchConfig, OddsSource, TheOddsApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OddsOutcome {
    /// Manual or CSV odds; nothing was requested or changed.
    Sticky,
    Updated,
    NotFound(ErrorKind),
}

pub struct OddsResolver {
    source: Box<dyn OddsSource>,
}

impl OddsResolver {
    pub fn from_config(cfg: &OddsFetchConfig, http: &HttpConfig) -> Self {
        Self::with_source(Box::new(TheOddsApi::new(cfg, http)))
    }

    pub fn with_source(source: Box<dyn OddsSource>) -> Self {
        Self { source }
    }

    pub fn resolve(&self, m: &mut Match) -> OddsOutcome {
        if m.odds_provenance.is_sticky() {
            debug!(match_id = m.id, provenance = m.odds_provenance.label(), "odds are sticky");
            return OddsOutcome::Sticky;
        }
        match self.source.lookup(&m.participant_a, &m.participant_b) {
            Ok(quote) => {
                m.odds_a = Some(quote.odds_a);
                m.odds_b = Some(quote.odds_b);
                m.odds_provenance = OddsProvenance::Provider {
                    name: quote.provider,
                    fetched_at: Utc::now(),
                };
                OddsOutcome::Updated
            }
            Err(err) => {
                info!(match_id = m.id, kind = %err.kind, detail = %err.detail, "no odds");
                OddsOutcome::NotFound(err.kind)
            }
        }
    }
}

/// 2 dp; zero or negative values are dropped.
pub fn normalize_odds(raw: Option<Decimal>) -> Option<Decimal> {
    raw.filter(|o| o.is_sign_positive() && !o.is_zero())
        .map(|o| o.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Record odds entered by hand. Provenance becomes `manual` when either side
/// is set and falls back to `none` when both are cleared.
pub fn set_manual_odds(m: &mut Match, odds_a: Option<Decimal>, odds_b: Option<Decimal>) {
    m.odds_a = normalize_odds(odds_a);
    m.odds_b = normalize_odds(odds_b);
    m.odds_provenance = if m.odds_a.is_some() || m.odds_b.is_some() {
        OddsProvenance::Manual
    } else {
        OddsProvenance::None
    };
}
