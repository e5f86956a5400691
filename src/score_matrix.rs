use std::collections::BTreeMap;

use serde::Serialize;

use crate::blend::Prob3;
use crate::config::EngineConfig;
use crate::features::TeamRawFeatures;
use crate::h2h::H2hFactor;
use crate::markets::{
    AWAY, DRAW, HOME, Market, MarketProbabilities, NO, YES, over_label, score_label, under_label,
};
use crate::numeric::{dixon_coles_factor, poisson, poisson_line_probability};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpectedGoals {
    pub total: f64,
    pub home: f64,
    pub away: f64,
}

/// Combined goals come from head-to-head history blended with both sides'
/// recent scoring; the split follows each side's venue attack strength.
pub fn expected_goals(
    home: &TeamRawFeatures,
    away: &TeamRawFeatures,
    h2h: &H2hFactor,
    h2h_weight: f64,
) -> ExpectedGoals {
    let recent = (home.recent_avg_goals + away.recent_avg_goals) / 2.0;
    let total = match h2h.avg_goals {
        Some(h2h_goals) => h2h_weight * h2h_goals + (1.0 - h2h_weight) * recent,
        None => recent,
    };
    let total = if total.is_finite() { total.max(0.0) } else { 0.0 };

    let home_attack = home.strength.home.attack;
    let away_attack = away.strength.away.attack;
    let share_den = home_attack + away_attack;
    let home_share = if share_den > 0.0 && share_den.is_finite() {
        home_attack / share_den
    } else {
        0.5
    };

    ExpectedGoals {
        total,
        home: total * home_share,
        away: total * (1.0 - home_share),
    }
}

/// Joint probability of every scoreline up to `max_goals` per side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMatrix {
    max_goals: u32,
    cells: Vec<f64>,
}

impl ScoreMatrix {
    pub fn build(home_xg: f64, away_xg: f64, max_goals: u32, rho: f64) -> Self {
        let clean = |xg: f64| if xg.is_finite() { xg.max(0.0) } else { 0.0 };
        let (lambda, mu) = (clean(home_xg), clean(away_xg));

        let raw: Vec<f64> = (0..=max_goals)
            .flat_map(|i| {
                (0..=max_goals).map(move |j| {
                    let base = poisson(lambda, i) * poisson(mu, j);
                    (base * dixon_coles_factor(i, j, lambda, mu, rho)).max(0.0)
                })
            })
            .collect();

        let sum: f64 = raw.iter().sum();
        let sum = if sum > 0.0 && sum.is_finite() { sum } else { 1.0 };
        Self {
            max_goals,
            cells: raw.into_iter().map(|p| p / sum).collect(),
        }
    }

    pub fn max_goals(&self) -> u32 {
        self.max_goals
    }

    pub fn probability(&self, home_goals: u32, away_goals: u32) -> f64 {
        if home_goals > self.max_goals || away_goals > self.max_goals {
            return 0.0;
        }
        let size = self.max_goals as usize + 1;
        self.cells[home_goals as usize * size + away_goals as usize]
    }

    /// `(home_goals, away_goals, probability)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        let size = self.max_goals + 1;
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, p)| (idx as u32 / size, idx as u32 % size, *p))
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    fn sum_where(&self, pred: impl Fn(u32, u32) -> bool) -> f64 {
        self.cells()
            .filter(|(i, j, _)| pred(*i, *j))
            .map(|(_, _, p)| p)
            .sum()
    }

    pub fn match_result(&self) -> Prob3 {
        Prob3 {
            home: self.sum_where(|i, j| i > j),
            draw: self.sum_where(|i, j| i == j),
            away: self.sum_where(|i, j| i < j),
        }
    }

    pub fn over_probability(&self, line: f64) -> f64 {
        self.sum_where(|i, j| (i + j) as f64 > line)
    }

    pub fn both_teams_score(&self) -> f64 {
        self.sum_where(|i, j| i > 0 && j > 0)
    }

    /// Most likely scorelines first; ties keep row-major order.
    pub fn top_scores(&self, n: usize) -> Vec<(u32, u32, f64)> {
        let mut all: Vec<(u32, u32, f64)> = self.cells().collect();
        all.sort_by(|a, b| b.2.total_cmp(&a.2));
        all.truncate(n);
        all
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoalModel {
    pub xg: ExpectedGoals,
    pub matrix: ScoreMatrix,
    pub markets: MarketProbabilities,
    /// Match-result triple from the matrix alone, kept apart for blending.
    pub match_result: Prob3,
}

pub fn build_goal_model(
    home: &TeamRawFeatures,
    away: &TeamRawFeatures,
    h2h: &H2hFactor,
    cfg: &EngineConfig,
) -> GoalModel {
    let xg = expected_goals(home, away, h2h, cfg.h2h_goals_weight);
    let matrix = ScoreMatrix::build(xg.home, xg.away, cfg.max_goals, cfg.dc_rho);
    let match_result = matrix.match_result();

    let mut markets = MarketProbabilities::new();
    markets.insert(Market::MatchResult, triple_market(match_result));
    markets.insert(
        Market::TotalGoals,
        over_under(matrix.over_probability(cfg.goals_line), cfg.goals_line),
    );
    let btts = matrix.both_teams_score();
    markets.insert(
        Market::BothTeamsScore,
        BTreeMap::from([(YES.to_string(), btts), (NO.to_string(), 1.0 - btts)]),
    );
    markets.insert(
        Market::CorrectScore,
        matrix
            .cells()
            .map(|(i, j, p)| (score_label(i, j), p))
            .collect(),
    );

    let corners_lambda = (home.corners.total + away.corners.total) / 2.0;
    let corners = poisson_line_probability(corners_lambda, cfg.corners_line);
    markets.insert(Market::TotalCorners, over_under(corners.over, cfg.corners_line));

    let shots_lambda = (home.shots_on_goal.total + away.shots_on_goal.total) / 2.0;
    let shots = poisson_line_probability(shots_lambda, cfg.shots_line);
    markets.insert(Market::TotalShotsOnGoal, over_under(shots.over, cfg.shots_line));

    GoalModel {
        xg,
        matrix,
        markets,
        match_result,
    }
}

pub fn triple_market(p: Prob3) -> BTreeMap<String, f64> {
    BTreeMap::from([
        (HOME.to_string(), p.home),
        (DRAW.to_string(), p.draw),
        (AWAY.to_string(), p.away),
    ])
}

fn over_under(over: f64, line: f64) -> BTreeMap<String, f64> {
    let over = over.clamp(0.0, 1.0);
    BTreeMap::from([(over_label(line), over), (under_label(line), 1.0 - over)])
}
