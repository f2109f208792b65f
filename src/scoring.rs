//! Odds-weighted scoring.
//!
//! `potential_score` rounds each match on its own for display, while
//! `participant_score` sums unrounded contributions and rounds once. Two
//! wins worth 1.05 each therefore total 2.1, not 1.1 + 1.1.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::model::{Match, MatchId, Participant, ParticipantId, Prediction, Side};

fn round_1dp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Stored odds for `side`, or 1.0 when unset or zero.
pub fn effective_odds(m: &Match, side: Side) -> Decimal {
    m.odds(side)
        .filter(|o| !o.is_zero())
        .unwrap_or(Decimal::ONE)
}

fn weighted(m: &Match, pick: Side) -> Decimal {
    effective_odds(m, pick) * Decimal::from(m.multiplier)
}

pub fn potential_score(m: &Match, pick: Side) -> Decimal {
    round_1dp(weighted(m, pick))
}

fn is_correct(m: &Match, pick: Side) -> bool {
    m.result.and_then(|r| r.winner()) == Some(pick)
}

/// Sum over correct picks, rounded once at the end. Predictions for unknown
/// matches, unentered results, draws or wrong picks add nothing.
pub fn participant_score(predictions: &[Prediction], matches: &[Match]) -> Decimal {
    let by_id: HashMap<MatchId, &Match> = matches.iter().map(|m| (m.id, m)).collect();
    let total: Decimal = predictions
        .iter()
        .filter_map(|p| {
            let m = by_id.get(&p.match_id)?;
            is_correct(m, p.pick).then(|| weighted(m, p.pick))
        })
        .sum();
    round_1dp(total)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub score: Decimal,
    pub correct_picks: usize,
}

/// Highest score first; ties keep input order.
pub fn leaderboard(participants: &[Participant], matches: &[Match]) -> Vec<Standing> {
    let by_id: HashMap<MatchId, &Match> = matches.iter().map(|m| (m.id, m)).collect();
    let mut standings: Vec<Standing> = participants
        .iter()
        .map(|p| Standing {
            participant_id: p.id,
            display_name: p.display_name.clone(),
            score: participant_score(&p.predictions, matches),
            correct_picks: p
                .predictions
                .iter()
                .filter(|pred| by_id.get(&pred.match_id).is_some_and(|m| is_correct(m, pred.pick)))
                .count(),
        })
        .collect();
    standings.sort_by(|a, b| b.score.cmp(&a.score));
    standings
}

/// True once every match on the card has a result.
pub fn all_results_entered(matches: &[Match]) -> bool {
    matches.iter().all(Match::has_result)
}
