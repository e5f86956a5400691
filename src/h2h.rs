use serde::Serialize;

use crate::payload::FixtureResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct H2hFactor {
    /// (home team wins - away team wins) / meetings, in [-1, 1].
    pub factor: f64,
    pub avg_goals: Option<f64>,
    pub matches: usize,
}

impl H2hFactor {
    pub fn none() -> Self {
        Self {
            factor: 0.0,
            avg_goals: None,
            matches: 0,
        }
    }
}

/// Wins are credited by team identity, not by the venue of the old meeting.
/// Unfinished meetings and fixtures not between this pair are ignored.
pub fn aggregate_h2h(home_team_id: u32, away_team_id: u32, meetings: &[FixtureResult]) -> H2hFactor {
    let mut home_wins = 0i64;
    let mut away_wins = 0i64;
    let mut goals = 0u64;
    let mut n = 0usize;

    for m in meetings {
        if !m.is_completed() || !m.involves(home_team_id) || !m.involves(away_team_id) {
            continue;
        }
        let Some((h, a)) = m.goals() else { continue };
        match m.winner() {
            Some(id) if id == home_team_id => home_wins += 1,
            Some(id) if id == away_team_id => away_wins += 1,
            _ => {}
        }
        goals += u64::from(h) + u64::from(a);
        n += 1;
    }

    if n == 0 {
        return H2hFactor::none();
    }
    H2hFactor {
        factor: (home_wins - away_wins) as f64 / n as f64,
        avg_goals: Some(goals as f64 / n as f64),
        matches: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting(home_id: u32, away_id: u32, hg: u32, ag: u32) -> FixtureResult {
        FixtureResult {
            fixture_id: 0,
            date: None,
            status: Some("FT".to_string()),
            home_id,
            away_id,
            home_goals: Some(hg),
            away_goals: Some(ag),
        }
    }

    #[test]
    fn empty_history_is_neutral() {
        let f = aggregate_h2h(1, 2, &[]);
        assert_eq!(f.factor, 0.0);
        assert_eq!(f.avg_goals, None);
    }

    #[test]
    fn wins_follow_team_identity() {
        // Team 1 wins once at home and once away; team 2 wins once.
        let meetings = vec![
            meeting(1, 2, 2, 0),
            meeting(2, 1, 0, 1),
            meeting(2, 1, 3, 1),
            meeting(1, 2, 1, 1),
        ];
        let f = aggregate_h2h(1, 2, &meetings);
        assert!((f.factor - 0.25).abs() < 1e-12);
        assert_eq!(f.avg_goals, Some(9.0 / 4.0));
        assert_eq!(f.matches, 4);
    }

    #[test]
    fn factor_is_bounded() {
        let meetings = vec![meeting(2, 1, 4, 0), meeting(1, 2, 0, 2)];
        let f = aggregate_h2h(1, 2, &meetings);
        assert_eq!(f.factor, -1.0);
    }

    #[test]
    fn huge_scores_do_not_overflow() {
        let meetings = vec![meeting(1, 2, u32::MAX, 1), meeting(2, 1, 2, 2)];
        let f = aggregate_h2h(1, 2, &meetings);
        assert_eq!(f.matches, 1);
        assert_eq!(f.factor, 0.0);
        assert_eq!(f.avg_goals, Some(4.0));
    }

    #[test]
    fn unrelated_fixtures_ignored() {
        let meetings = vec![meeting(1, 3, 5, 0), meeting(1, 2, 1, 0)];
        let f = aggregate_h2h(1, 2, &meetings);
        assert_eq!(f.factor, 1.0);
        assert_eq!(f.matches, 1);
    }
}
