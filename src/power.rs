use serde::Serialize;

use crate::features::TeamRawFeatures;
use crate::h2h::H2hFactor;
use crate::numeric::{elo_win_probability, normalize};

const RANK_GAP_THRESHOLD: u32 = 6;
const STRONG_HOME_ATTACK: f64 = 1.6;
const BAD_AWAY_FORM: f64 = 3.5;

const ELO_BUMP: f64 = 0.03;
const STRENGTH_BUMP: f64 = 0.02;
const FORM_BUMP: f64 = 0.02;

const FORM_RANGE: (f64, f64) = (0.0, 10.0);
const STRENGTH_RATIO_RANGE: (f64, f64) = (0.0, 5.0);
const EFFICIENCY_RANGE: (f64, f64) = (0.0, 0.5);
const H2H_RANGE: (f64, f64) = (-1.0, 1.0);
const MIN_OPPONENT_DEFENSE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Elo,
    Form,
    Strength,
    Efficiency,
    H2h,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Elo,
        Factor::Form,
        Factor::Strength,
        Factor::Efficiency,
        Factor::H2h,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub elo: f64,
    pub form: f64,
    pub strength: f64,
    pub efficiency: f64,
    pub h2h: f64,
}

pub const DEFAULT_WEIGHTS: Weights = Weights {
    elo: 0.30,
    form: 0.25,
    strength: 0.25,
    efficiency: 0.10,
    h2h: 0.10,
};

impl Default for Weights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl Weights {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Elo => self.elo,
            Factor::Form => self.form,
            Factor::Strength => self.strength,
            Factor::Efficiency => self.efficiency,
            Factor::H2h => self.h2h,
        }
    }

    pub fn sum(&self) -> f64 {
        Factor::ALL.iter().map(|f| self.get(*f)).sum()
    }

    /// Rescaled to sum to 1; negative entries count as zero. An unusable set
    /// falls back to the defaults.
    pub fn normalized(self) -> Weights {
        let clean = |w: f64| if w.is_finite() { w.max(0.0) } else { 0.0 };
        let w = Weights {
            elo: clean(self.elo),
            form: clean(self.form),
            strength: clean(self.strength),
            efficiency: clean(self.efficiency),
            h2h: clean(self.h2h),
        };
        let sum = w.sum();
        if sum <= 0.0 {
            return DEFAULT_WEIGHTS;
        }
        Weights {
            elo: w.elo / sum,
            form: w.form / sum,
            strength: w.strength / sum,
            efficiency: w.efficiency / sum,
            h2h: w.h2h / sum,
        }
    }

    pub fn adjusted(self, ctx: &MatchContext) -> Weights {
        let mut w = self;
        if ctx.rank_diff > RANK_GAP_THRESHOLD {
            w.elo += ELO_BUMP;
        }
        if ctx.home_is_strong {
            w.strength += STRENGTH_BUMP;
        }
        if ctx.away_bad_form {
            w.form += FORM_BUMP;
        }
        w.normalized()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchContext {
    pub rank_diff: u32,
    pub home_is_strong: bool,
    pub away_bad_form: bool,
}

impl MatchContext {
    pub fn from_features(home: &TeamRawFeatures, away: &TeamRawFeatures) -> Self {
        Self {
            rank_diff: home.rank.abs_diff(away.rank),
            home_is_strong: home.strength.home.attack > STRONG_HOME_ATTACK,
            away_bad_form: away.form < BAD_AWAY_FORM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedFactors {
    pub elo: f64,
    pub form: f64,
    pub strength: f64,
    pub efficiency: f64,
    pub h2h: f64,
}

impl NormalizedFactors {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Elo => self.elo,
            Factor::Form => self.form,
            Factor::Strength => self.strength,
            Factor::Efficiency => self.efficiency,
            Factor::H2h => self.h2h,
        }
    }

    fn weighted_sum(&self, weights: &Weights) -> f64 {
        Factor::ALL
            .iter()
            .map(|f| self.get(*f) * weights.get(*f))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerScore {
    /// Index of team strength, in [0, 1].
    pub ift: f64,
    pub raw: TeamRawFeatures,
    pub norm: NormalizedFactors,
    /// Head-to-head factor seen from this side.
    pub h2h_raw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerScores {
    pub home: PowerScore,
    pub away: PowerScore,
    pub weights: Weights,
    pub context: MatchContext,
}

pub fn compute_power_scores(
    home: &TeamRawFeatures,
    away: &TeamRawFeatures,
    h2h: &H2hFactor,
    base: Weights,
) -> PowerScores {
    let context = MatchContext::from_features(home, away);
    let weights = base.adjusted(&context);

    let elo_home = elo_win_probability(home.elo, away.elo);
    let home_norm = NormalizedFactors {
        elo: elo_home,
        form: normalize(home.form, FORM_RANGE.0, FORM_RANGE.1),
        strength: strength_factor(home.strength.home.attack, away.strength.away.defense),
        efficiency: normalize(home.efficiency, EFFICIENCY_RANGE.0, EFFICIENCY_RANGE.1),
        h2h: normalize(h2h.factor, H2H_RANGE.0, H2H_RANGE.1),
    };
    let away_norm = NormalizedFactors {
        elo: 1.0 - elo_home,
        form: normalize(away.form, FORM_RANGE.0, FORM_RANGE.1),
        strength: strength_factor(away.strength.away.attack, home.strength.home.defense),
        efficiency: normalize(away.efficiency, EFFICIENCY_RANGE.0, EFFICIENCY_RANGE.1),
        h2h: normalize(-h2h.factor, H2H_RANGE.0, H2H_RANGE.1),
    };

    PowerScores {
        home: PowerScore {
            ift: home_norm.weighted_sum(&weights),
            raw: *home,
            norm: home_norm,
            h2h_raw: h2h.factor,
        },
        away: PowerScore {
            ift: away_norm.weighted_sum(&weights),
            raw: *away,
            norm: away_norm,
            h2h_raw: -h2h.factor,
        },
        weights,
        context,
    }
}

fn strength_factor(own_attack: f64, opponent_defense: f64) -> f64 {
    let ratio = own_attack / opponent_defense.max(MIN_OPPONENT_DEFENSE);
    normalize(ratio, STRENGTH_RATIO_RANGE.0, STRENGTH_RATIO_RANGE.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract_team_features;
    use crate::payload::TeamPayload;

    fn baseline() -> TeamRawFeatures {
        extract_team_features(1, &TeamPayload::default(), &[])
    }

    #[test]
    fn defaults_sum_to_one() {
        assert!((DEFAULT_WEIGHTS.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn every_adjustment_renormalizes() {
        for rank_diff in [0, 7] {
            for home_is_strong in [false, true] {
                for away_bad_form in [false, true] {
                    let ctx = MatchContext {
                        rank_diff,
                        home_is_strong,
                        away_bad_form,
                    };
                    let w = DEFAULT_WEIGHTS.adjusted(&ctx);
                    assert!((w.sum() - 1.0).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn adjustment_bumps_the_named_weight() {
        let ctx = MatchContext {
            rank_diff: 10,
            home_is_strong: false,
            away_bad_form: false,
        };
        let w = DEFAULT_WEIGHTS.adjusted(&ctx);
        assert!(w.elo > DEFAULT_WEIGHTS.elo);
        assert!(w.form < DEFAULT_WEIGHTS.form);
        assert!((w.elo - 0.33 / 1.03).abs() < 1e-12);
    }

    #[test]
    fn degenerate_weights_fall_back() {
        let zero = Weights {
            elo: 0.0,
            form: -1.0,
            strength: f64::NAN,
            efficiency: 0.0,
            h2h: 0.0,
        };
        assert_eq!(zero.normalized(), DEFAULT_WEIGHTS);
    }

    #[test]
    fn elo_edge_favours_home() {
        let mut home = baseline();
        let away = baseline();
        home.elo = 1700.0;
        let scores = compute_power_scores(&home, &away, &H2hFactor::none(), DEFAULT_WEIGHTS);
        assert!((scores.home.norm.elo - 0.7597).abs() < 1e-3);
        assert!(scores.home.norm.elo > scores.away.norm.elo);
        assert!(scores.home.ift > scores.away.ift);
    }

    #[test]
    fn neutral_h2h_is_half_for_both() {
        let scores = compute_power_scores(&baseline(), &baseline(), &H2hFactor::none(), DEFAULT_WEIGHTS);
        assert_eq!(scores.home.norm.h2h, 0.5);
        assert_eq!(scores.away.norm.h2h, 0.5);
        assert_eq!(scores.home.h2h_raw, 0.0);
    }

    #[test]
    fn ift_stays_in_unit_interval() {
        let mut home = baseline();
        home.form = 50.0;
        home.efficiency = 3.0;
        home.strength.home.attack = 40.0;
        let h2h = H2hFactor {
            factor: 1.0,
            avg_goals: Some(3.0),
            matches: 3,
        };
        let scores = compute_power_scores(&home, &baseline(), &h2h, DEFAULT_WEIGHTS);
        assert!(scores.home.ift <= 1.0 && scores.home.ift >= 0.0);
        assert!(scores.away.ift <= 1.0 && scores.away.ift >= 0.0);
        assert!(scores.context.home_is_strong);
    }
}
