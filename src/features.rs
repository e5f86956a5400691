use std::cmp::Reverse;

use serde::Serialize;

use crate::defaults::{FEATURE_DEFAULTS, ratio_or, stat_or};
use crate::payload::{FixtureResult, SplitStat, StandingRow, TeamPayload, TeamStatistics};

const FORM_WINDOW: usize = 10;
const FORM_WEIGHT_STEP: f64 = 0.05;
const FIRST_HALF_END_MINUTE: u32 = 45;

const ELO_BASE: f64 = 2000.0;
const ELO_PER_RANK: f64 = 25.0;
const ELO_PER_POINT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttackDefense {
    pub attack: f64,
    pub defense: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Strength {
    pub home: AttackDefense,
    pub away: AttackDefense,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitAverages {
    pub home: f64,
    pub away: f64,
    pub total: f64,
}

impl SplitAverages {
    fn from_split(stat: Option<&SplitStat>, home_default: f64, away_default: f64) -> Self {
        let home = stat_or(stat.and_then(|s| s.home), home_default);
        let away = stat_or(stat.and_then(|s| s.away), away_default);
        Self {
            home,
            away,
            total: home + away,
        }
    }
}

/// Flat per-team feature set consumed by both probability models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TeamRawFeatures {
    pub elo: f64,
    /// Weighted recent form, 0 (ten losses) to 7.75 (ten wins).
    pub form: f64,
    pub strength: Strength,
    /// Goals per shot on target.
    pub efficiency: f64,
    pub first_half_goals_ratio: f64,
    pub corners: SplitAverages,
    pub shots_on_goal: SplitAverages,
    pub rank: u32,
    pub recent_avg_goals: f64,
}

pub fn extract_team_features(
    team_id: u32,
    payload: &TeamPayload,
    standings: &[StandingRow],
) -> TeamRawFeatures {
    let d = &FEATURE_DEFAULTS;
    let standing = standings.iter().find(|row| row.team_id == team_id);
    let stats = payload.statistics.as_ref();

    TeamRawFeatures {
        elo: standing.map_or(d.elo, elo_from_standing),
        form: weighted_form(team_id, &payload.recent),
        strength: strength_from_stats(stats),
        efficiency: ratio_or(
            stats.and_then(|s| s.goals_for_total),
            stats.and_then(|s| s.shots_on_target_total),
            d.efficiency,
        )
        .clamp(0.0, 1.0),
        first_half_goals_ratio: stats.map_or(d.first_half_goals_ratio, first_half_ratio),
        corners: SplitAverages::from_split(
            stats.map(|s| &s.corners_avg),
            d.corners_home,
            d.corners_away,
        ),
        shots_on_goal: SplitAverages::from_split(
            stats.map(|s| &s.shots_on_goal_avg),
            d.shots_on_goal_home,
            d.shots_on_goal_away,
        ),
        rank: standing
            .map(|row| row.rank)
            .filter(|rank| *rank > 0)
            .unwrap_or(d.rank),
        recent_avg_goals: recent_average_goals(&payload.recent),
    }
}

fn elo_from_standing(row: &StandingRow) -> f64 {
    ELO_BASE - row.rank as f64 * ELO_PER_RANK + row.points as f64 * ELO_PER_POINT
}

fn strength_from_stats(stats: Option<&TeamStatistics>) -> Strength {
    let d = &FEATURE_DEFAULTS;
    let gf = stats.map(|s| s.goals_for_avg);
    let ga = stats.map(|s| s.goals_against_avg);
    Strength {
        home: AttackDefense {
            attack: stat_or(gf.and_then(|s| s.home), d.home_attack),
            defense: stat_or(ga.and_then(|s| s.home), d.home_defense),
        },
        away: AttackDefense {
            attack: stat_or(gf.and_then(|s| s.away), d.away_attack),
            defense: stat_or(ga.and_then(|s| s.away), d.away_defense),
        },
    }
}

fn first_half_ratio(stats: &TeamStatistics) -> f64 {
    let default = FEATURE_DEFAULTS.first_half_goals_ratio;
    if stats.goals_by_minute.is_empty() {
        return default;
    }

    let mut first_half = 0.0;
    let mut bucket_total = 0.0;
    for (bucket, goals) in &stats.goals_by_minute {
        let goals = stat_or(Some(*goals), 0.0);
        bucket_total += goals;
        if bucket_end_minute(bucket).is_some_and(|end| end <= FIRST_HALF_END_MINUTE) {
            first_half += goals;
        }
    }

    let total = stats
        .goals_for_total
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(bucket_total);
    ratio_or(Some(first_half), Some(total), default).clamp(0.0, 1.0)
}

fn bucket_end_minute(bucket: &str) -> Option<u32> {
    bucket.split('-').nth(1)?.trim().parse::<u32>().ok()
}

/// The `FORM_WINDOW` most recent fixtures, newest first. Undated entries keep
/// their given order behind dated ones.
fn recent_window(fixtures: &[FixtureResult]) -> Vec<&FixtureResult> {
    let mut sorted: Vec<&FixtureResult> = fixtures.iter().collect();
    sorted.sort_by_key(|f| Reverse(f.kickoff()));
    sorted.truncate(FORM_WINDOW);
    sorted
}

fn points_for(team_id: u32, fixture: &FixtureResult) -> Option<f64> {
    if !fixture.is_completed() || !fixture.involves(team_id) {
        return None;
    }
    Some(match fixture.winner() {
        Some(winner) if winner == team_id => 1.0,
        Some(_) => 0.0,
        None => 0.5,
    })
}

/// Result score (1 / 0.5 / 0) weighted 1.0, 0.95, ... 0.55 from newest to oldest.
/// Unfinished fixtures still occupy their slot in the window.
pub fn weighted_form(team_id: u32, recent: &[FixtureResult]) -> f64 {
    recent_window(recent)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, fixture)| {
            let weight = 1.0 - FORM_WEIGHT_STEP * idx as f64;
            points_for(team_id, fixture).map(|p| p * weight)
        })
        .sum()
}

pub fn recent_average_goals(recent: &[FixtureResult]) -> f64 {
    let totals: Vec<f64> = recent_window(recent)
        .into_iter()
        .filter(|f| f.is_completed())
        .filter_map(|f| f.goals())
        .map(|(h, a)| f64::from(h) + f64::from(a))
        .collect();
    if totals.is_empty() {
        return FEATURE_DEFAULTS.recent_avg_goals;
    }
    totals.iter().sum::<f64>() / totals.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(day: u32, home_id: u32, away_id: u32, hg: u32, ag: u32) -> FixtureResult {
        FixtureResult {
            fixture_id: day as u64,
            date: Some(format!("2024-03-{day:02}T15:00:00+00:00")),
            status: Some("FT".to_string()),
            home_id,
            away_id,
            home_goals: Some(hg),
            away_goals: Some(ag),
        }
    }

    #[test]
    fn form_weights_newest_first() {
        // Oldest fixture is the win, newest the loss.
        let recent = vec![result(1, 7, 8, 3, 0), result(9, 9, 7, 2, 0)];
        let form = weighted_form(7, &recent);
        assert!((form - 0.95).abs() < 1e-12);
    }

    #[test]
    fn form_counts_draws_and_away_wins() {
        let recent = vec![result(3, 7, 8, 1, 1), result(2, 9, 7, 0, 2)];
        let form = weighted_form(7, &recent);
        assert!((form - (0.5 + 0.95)).abs() < 1e-12);
    }

    #[test]
    fn unfinished_fixtures_are_skipped() {
        let mut pending = result(20, 7, 8, 0, 0);
        pending.status = Some("NS".to_string());
        pending.home_goals = None;
        pending.away_goals = None;
        let recent = vec![pending, result(10, 7, 8, 2, 1)];
        assert!((weighted_form(7, &recent) - 0.95).abs() < 1e-12);
        assert!((recent_average_goals(&recent) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn huge_scores_are_skipped() {
        let recent = vec![result(12, 7, 8, u32::MAX, u32::MAX), result(10, 7, 8, 2, 1)];
        assert!((recent_average_goals(&recent) - 3.0).abs() < 1e-12);
        assert!((weighted_form(7, &recent) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn window_is_capped_at_ten() {
        let recent: Vec<FixtureResult> = (1..=14).map(|d| result(d, 7, 8, 1, 0)).collect();
        let expected: f64 = (0..10).map(|i| 1.0 - 0.05 * i as f64).sum();
        assert!((weighted_form(7, &recent) - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_payload_uses_defaults() {
        let f = extract_team_features(1, &TeamPayload::default(), &[]);
        let d = FEATURE_DEFAULTS;
        assert_eq!(f.elo, d.elo);
        assert_eq!(f.form, 0.0);
        assert_eq!(f.strength.home.attack, d.home_attack);
        assert_eq!(f.strength.away.defense, d.away_defense);
        assert_eq!(f.efficiency, d.efficiency);
        assert_eq!(f.first_half_goals_ratio, d.first_half_goals_ratio);
        assert_eq!(f.corners.total, d.corners_home + d.corners_away);
        assert_eq!(f.shots_on_goal.home, d.shots_on_goal_home);
        assert_eq!(f.rank, 99);
        assert_eq!(f.recent_avg_goals, 2.5);
    }

    #[test]
    fn standings_drive_elo_and_rank() {
        let standings = vec![StandingRow {
            team_id: 1,
            rank: 3,
            points: 40,
        }];
        let f = extract_team_features(1, &TeamPayload::default(), &standings);
        assert_eq!(f.elo, 2000.0 - 75.0 + 200.0);
        assert_eq!(f.rank, 3);
    }

    #[test]
    fn stats_feed_efficiency_and_first_half_ratio() {
        let mut stats = TeamStatistics::default();
        stats.goals_for_total = Some(20.0);
        stats.shots_on_target_total = Some(80.0);
        stats.goals_by_minute.insert("0-15".to_string(), 3.0);
        stats.goals_by_minute.insert("16-30".to_string(), 2.0);
        stats.goals_by_minute.insert("31-45".to_string(), 3.0);
        stats.goals_by_minute.insert("46-60".to_string(), 12.0);
        stats.goals_for_avg.home = Some(f64::NAN);
        let payload = TeamPayload {
            statistics: Some(stats),
            recent: Vec::new(),
        };
        let f = extract_team_features(1, &payload, &[]);
        assert!((f.efficiency - 0.25).abs() < 1e-12);
        assert!((f.first_half_goals_ratio - 0.4).abs() < 1e-12);
        assert_eq!(f.strength.home.attack, FEATURE_DEFAULTS.home_attack);
    }
}
