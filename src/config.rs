use std::env;

use once_cell::sync::OnceCell;

use crate::power::{DEFAULT_WEIGHTS, Weights};
use crate::value::StakingRules;

static CONFIG: OnceCell<EngineConfig> = OnceCell::new();

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Highest goal count per side in the score matrix.
    pub max_goals: u32,
    pub dc_rho: f64,
    /// Score-matrix share of the blended match-result triple.
    pub goals_blend_weight: f64,
    /// Head-to-head share of the expected combined goals when history exists.
    pub h2h_goals_weight: f64,
    pub min_ev: f64,
    pub min_odd: f64,
    pub kelly_fraction: f64,
    pub goals_line: f64,
    pub corners_line: f64,
    pub shots_line: f64,
    pub top_correct_scores: usize,
    pub parallelism: usize,
    pub base_weights: Weights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_goals: 8,
            dc_rho: 0.06,
            goals_blend_weight: 0.5,
            h2h_goals_weight: 0.6,
            min_ev: 0.03,
            min_odd: 1.01,
            kelly_fraction: 0.25,
            goals_line: 2.5,
            corners_line: 9.5,
            shots_line: 9.5,
            top_correct_scores: 5,
            parallelism: 6,
            base_weights: DEFAULT_WEIGHTS,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads every `ENGINE_*` key through `lookup`; missing or unparseable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let f = |key: &str, default: f64, lo: f64, hi: f64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default)
                .clamp(lo, hi)
        };
        let n = |key: &str, default: usize, lo: usize, hi: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
                .clamp(lo, hi)
        };

        Self {
            max_goals: n("ENGINE_MAX_GOALS", d.max_goals as usize, 4, 15) as u32,
            dc_rho: f("ENGINE_DC_RHO", d.dc_rho, -0.5, 0.5),
            goals_blend_weight: f("ENGINE_BLEND_WEIGHT", d.goals_blend_weight, 0.0, 1.0),
            h2h_goals_weight: f("ENGINE_H2H_GOALS_WEIGHT", d.h2h_goals_weight, 0.0, 1.0),
            min_ev: f("ENGINE_MIN_EV", d.min_ev, 0.0, 1.0),
            min_odd: f("ENGINE_MIN_ODD", d.min_odd, 1.0, 100.0),
            kelly_fraction: f("ENGINE_KELLY_FRACTION", d.kelly_fraction, 0.0, 1.0),
            goals_line: f("ENGINE_GOALS_LINE", d.goals_line, 0.5, 10.5),
            corners_line: f("ENGINE_CORNERS_LINE", d.corners_line, 0.5, 30.5),
            shots_line: f("ENGINE_SHOTS_LINE", d.shots_line, 0.5, 30.5),
            top_correct_scores: n("ENGINE_TOP_SCORES", d.top_correct_scores, 1, 25),
            parallelism: n("ENGINE_PARALLELISM", d.parallelism, 1, 32),
            base_weights: d.base_weights,
        }
    }

    pub fn staking_rules(&self) -> StakingRules {
        StakingRules {
            min_ev: self.min_ev,
            min_odd: self.min_odd,
            kelly_fraction: self.kelly_fraction,
        }
    }
}

/// Process-wide configuration, read from the environment on first use.
pub fn engine_config() -> &'static EngineConfig {
    CONFIG.get_or_init(EngineConfig::from_env)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_lookup_is_default() {
        assert_eq!(EngineConfig::from_lookup(|_| None), EngineConfig::default());
    }

    #[test]
    fn values_parse_and_clamp() {
        let cfg = EngineConfig::from_lookup(lookup_from(&[
            ("ENGINE_MIN_EV", "0.05"),
            ("ENGINE_KELLY_FRACTION", "3"),
            ("ENGINE_MAX_GOALS", "10"),
            ("ENGINE_DC_RHO", "oops"),
            ("ENGINE_PARALLELISM", "0"),
        ]));
        assert_eq!(cfg.min_ev, 0.05);
        assert_eq!(cfg.kelly_fraction, 1.0);
        assert_eq!(cfg.max_goals, 10);
        assert_eq!(cfg.dc_rho, 0.06);
        assert_eq!(cfg.parallelism, 1);
    }
}
