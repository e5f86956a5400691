//! Fallback values used whenever an upstream statistic is missing or malformed.
//!
//! Provider payloads are frequently incomplete, so every feature the extractor
//! produces has an entry here instead of a literal at the call site.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDefaults {
    pub elo: f64,
    pub recent_avg_goals: f64,
    pub home_attack: f64,
    pub home_defense: f64,
    pub away_attack: f64,
    pub away_defense: f64,
    pub efficiency: f64,
    pub first_half_goals_ratio: f64,
    pub corners_home: f64,
    pub corners_away: f64,
    pub shots_on_goal_home: f64,
    pub shots_on_goal_away: f64,
    pub rank: u32,
}

pub const FEATURE_DEFAULTS: FeatureDefaults = FeatureDefaults {
    elo: 1500.0,
    recent_avg_goals: 2.5,
    home_attack: 1.2,
    home_defense: 1.2,
    away_attack: 1.0,
    away_defense: 1.0,
    efficiency: 0.12,
    first_half_goals_ratio: 0.42,
    corners_home: 4.5,
    corners_away: 4.2,
    shots_on_goal_home: 5.2,
    shots_on_goal_away: 4.7,
    rank: 99,
};

/// A statistic is usable when present, finite and non-negative.
pub fn stat_or(value: Option<f64>, default: f64) -> f64 {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

/// `num / den`, or `default` when either side is unusable or `den` is zero.
pub fn ratio_or(num: Option<f64>, den: Option<f64>, default: f64) -> f64 {
    let (Some(num), Some(den)) = (num, den) else {
        return default;
    };
    if !num.is_finite() || !den.is_finite() || num < 0.0 || den <= 0.0 {
        return default;
    }
    num / den
}
