use std::collections::BTreeMap;

use serde::Serialize;

use crate::markets::{Market, MarketProbabilities, normalize_outcome_label};
use crate::payload::OddsTable;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakingRules {
    /// EV must be strictly above this.
    pub min_ev: f64,
    /// Odds at or below this are ignored.
    pub min_odd: f64,
    pub kelly_fraction: f64,
}

impl Default for StakingRules {
    fn default() -> Self {
        Self {
            min_ev: 0.03,
            min_odd: 1.01,
            kelly_fraction: 0.25,
        }
    }
}

pub fn expected_value(odd: f64, prob: f64) -> f64 {
    odd * prob - 1.0
}

/// Fractional Kelly stake as a share of bankroll; zero when the bet has no edge.
pub fn kelly_stake(odd: f64, prob: f64, fraction: f64) -> f64 {
    if odd.is_nan() || prob.is_nan() || odd <= 1.0 || prob <= 0.0 {
        return 0.0;
    }
    let b = odd - 1.0;
    let full = (b * prob - (1.0 - prob)) / b;
    if full.is_nan() || full <= 0.0 {
        return 0.0;
    }
    full * fraction.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuableBet {
    pub fixture_id: u64,
    pub fixture_name: String,
    pub market: Market,
    pub outcome: String,
    pub prob: f64,
    pub odd: f64,
    pub bookmaker_name: String,
    /// Expected value per unit staked.
    pub value: f64,
    pub kelly_stake: f64,
}

/// Every quote whose model probability clears the staking rules, one per
/// (market, outcome) at the best available odd, sorted by EV descending.
pub fn find_valuable_bets(
    fixture_id: u64,
    fixture_name: &str,
    probs: &MarketProbabilities,
    odds: &OddsTable,
    rules: &StakingRules,
) -> Vec<ValuableBet> {
    let mut best: BTreeMap<(Market, String), ValuableBet> = BTreeMap::new();

    for (bookmaker, quotes) in &odds.bookmakers {
        for quote in quotes {
            if !quote.odd.is_finite() || quote.odd <= rules.min_odd {
                continue;
            }
            let Some(market) = Market::from_bookmaker(&quote.market, quote.market_id) else {
                continue;
            };
            let Some(outcome) = normalize_outcome_label(market, &quote.outcome, quote.line) else {
                continue;
            };
            // Lines the model does not price simply have no probability here.
            let Some(prob) = probs.get(market, &outcome) else {
                continue;
            };
            let value = expected_value(quote.odd, prob);
            if value.is_nan() || value <= rules.min_ev {
                continue;
            }

            let key = (market, outcome);
            let replace = match best.get(&key) {
                Some(current) => quote.odd > current.odd,
                None => true,
            };
            if replace {
                let (market, outcome) = key.clone();
                best.insert(
                    key,
                    ValuableBet {
                        fixture_id,
                        fixture_name: fixture_name.to_string(),
                        market,
                        outcome,
                        prob,
                        odd: quote.odd,
                        bookmaker_name: bookmaker.clone(),
                        value,
                        kelly_stake: kelly_stake(quote.odd, prob, rules.kelly_fraction),
                    },
                );
            }
        }
    }

    let mut bets: Vec<ValuableBet> = best.into_values().collect();
    // Stable sort over the ordered map keeps ties deterministic.
    bets.sort_by(|a, b| b.value.total_cmp(&a.value));
    bets
}

/// Highest-probability bet among the positive-EV ones.
pub fn best_probability_value_bet(bets: &[ValuableBet]) -> Option<&ValuableBet> {
    bets.iter()
        .fold(None, |best: Option<&ValuableBet>, bet| match best {
            Some(b) if b.prob >= bet.prob => Some(b),
            _ => Some(bet),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub market: Market,
    pub outcome: String,
    pub prob: f64,
}

/// The `n` most probable outcomes across all markets except correct score,
/// regardless of odds.
pub fn most_likely_outcomes(probs: &MarketProbabilities, n: usize) -> Vec<Suggestion> {
    let mut all: Vec<Suggestion> = probs
        .iter()
        .filter(|(market, _)| *market != Market::CorrectScore)
        .flat_map(|(market, outcomes)| {
            outcomes.iter().map(move |(outcome, prob)| Suggestion {
                market,
                outcome: outcome.clone(),
                prob: *prob,
            })
        })
        .collect();
    all.sort_by(|a, b| b.prob.total_cmp(&a.prob));
    all.truncate(n);
    all
}
