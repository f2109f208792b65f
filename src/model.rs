use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fighter::FighterFact;
use crate::fighter_resolver::Resolution;

pub type MatchId = u64;
pub type ParticipantId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entered result of a match. An unentered result is `None` on [`Match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    A,
    B,
    Draw,
}

impl Outcome {
    pub fn winner(self) -> Option<Side> {
        match self {
            Outcome::A => Some(Side::A),
            Outcome::B => Some(Side::B),
            Outcome::Draw => None,
        }
    }
}

impl From<Side> for Outcome {
    fn from(side: Side) -> Self {
        match side {
            Side::A => Outcome::A,
            Side::B => Outcome::B,
        }
    }
}

/// Match weight, always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u32")]
pub struct Multiplier(u32);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(1);

    /// Floors at 1; blank or non-integer input yields 1.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(Self::from)
            .unwrap_or(Self::ONE)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Self::ONE
    }
}

impl From<i64> for Multiplier {
    fn from(raw: i64) -> Self {
        Multiplier(u32::try_from(raw.max(1)).unwrap_or(u32::MAX))
    }
}

impl From<Multiplier> for u32 {
    fn from(m: Multiplier) -> Self {
        m.0
    }
}

impl From<Multiplier> for Decimal {
    fn from(m: Multiplier) -> Self {
        Decimal::from(m.0)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Where a match's odds came from. `Manual` and `Csv` are sticky: automated
/// odds resolution never touches them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OddsProvenance {
    #[default]
    None,
    Manual,
    Csv,
    Provider {
        name: String,
        fetched_at: DateTime<Utc>,
    },
}

impl OddsProvenance {
    pub fn is_sticky(&self) -> bool {
        matches!(self, OddsProvenance::Manual | OddsProvenance::Csv)
    }

    pub fn label(&self) -> &str {
        match self {
            OddsProvenance::None => "none",
            OddsProvenance::Manual => "manual",
            OddsProvenance::Csv => "csv",
            OddsProvenance::Provider { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub participant_a: String,
    pub participant_b: String,
    #[serde(default)]
    pub multiplier: Multiplier,
    #[serde(default)]
    pub odds_a: Option<Decimal>,
    #[serde(default)]
    pub odds_b: Option<Decimal>,
    #[serde(default)]
    pub odds_provenance: OddsProvenance,
    #[serde(default)]
    pub result: Option<Outcome>,
    #[serde(default)]
    pub fighter_a: FighterFact,
    #[serde(default)]
    pub fighter_b: FighterFact,
}

impl Match {
    pub fn new(id: MatchId, participant_a: &str, participant_b: &str) -> Self {
        Self {
            id,
            participant_a: participant_a.trim().to_string(),
            participant_b: participant_b.trim().to_string(),
            multiplier: Multiplier::ONE,
            odds_a: None,
            odds_b: None,
            odds_provenance: OddsProvenance::None,
            result: None,
            fighter_a: FighterFact::default(),
            fighter_b: FighterFact::default(),
        }
    }

    pub fn name(&self, side: Side) -> &str {
        match side {
            Side::A => &self.participant_a,
            Side::B => &self.participant_b,
        }
    }

    pub fn odds(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::A => self.odds_a,
            Side::B => self.odds_b,
        }
    }

    pub fn fighter(&self, side: Side) -> &FighterFact {
        match side {
            Side::A => &self.fighter_a,
            Side::B => &self.fighter_b,
        }
    }

    pub fn fighter_mut(&mut self, side: Side) -> &mut FighterFact {
        match side {
            Side::A => &mut self.fighter_a,
            Side::B => &mut self.fighter_b,
        }
    }

    /// A side with a record or an image counts as already looked up.
    pub fn has_fighter_data(&self, side: Side) -> bool {
        let fact = self.fighter(side);
        fact.record.is_some() || fact.image_url.is_some()
    }

    pub fn rename(&mut self, side: Side, name: &str) {
        let name = name.trim().to_string();
        match side {
            Side::A => self.participant_a = name,
            Side::B => self.participant_b = name,
        }
    }

    /// Store a finished resolution for one side in a single assignment.
    pub fn apply_resolution(&mut self, side: Side, resolution: &Resolution) {
        *self.fighter_mut(side) = resolution.fact.clone();
        if resolution.display_name != self.name(side) {
            self.rename(side, &resolution.display_name);
        }
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub match_id: MatchId,
    pub pick: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: &str) -> Self {
        Self {
            id,
            display_name: display_name.trim().to_string(),
            predictions: Vec::new(),
        }
    }

    /// One pick per match; a second pick replaces the first.
    pub fn set_pick(&mut self, match_id: MatchId, pick: Side) {
        match self.predictions.iter_mut().find(|p| p.match_id == match_id) {
            Some(existing) => existing.pick = pick,
            None => self.predictions.push(Prediction { match_id, pick }),
        }
    }

    pub fn pick_for(&self, match_id: MatchId) -> Option<Side> {
        self.predictions
            .iter()
            .find(|p| p.match_id == match_id)
            .map(|p| p.pick)
    }
}

/// A pool's card as the CLI reads and writes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolCard {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl PoolCard {
    pub fn next_match_id(&self) -> MatchId {
        self.matches.iter().map(|m| m.id).max().map_or(1, |id| id + 1)
    }
}
