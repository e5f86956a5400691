use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::payload::{
    FixtureInput, FixtureRef, FixtureResult, FixtureTeams, LeagueRef, OddsQuote, OddsTable,
    SplitStat, StandingRow, TeamPayload, TeamRef, TeamStatistics,
};

const LEAGUE: LeagueRef = LeagueRef {
    id: 39,
    season: Some(2024),
};
const LEAGUE_SIZE: u32 = 20;
const BOOKMAKERS: [&str; 3] = ["Bet365", "Pinnacle", "Unibet"];
const MINUTE_BUCKETS: [&str; 6] = ["0-15", "16-30", "31-45", "46-60", "61-75", "76-90"];

/// A reproducible slate of `n` fixtures with plausible statistics and prices.
pub fn synthetic_slate(n: usize, seed: u64) -> Vec<FixtureInput> {
    let mut rng = StdRng::seed_from_u64(seed);
    let standings = synthetic_standings(&mut rng);
    (0..n)
        .map(|idx| synthetic_fixture(&mut rng, 1_000 + idx as u64, &standings))
        .collect()
}

fn synthetic_standings(rng: &mut impl Rng) -> Vec<StandingRow> {
    let mut points = 80;
    (1..=LEAGUE_SIZE)
        .map(|rank| {
            points -= rng.gen_range(1..5);
            StandingRow {
                team_id: team_id(rank),
                rank,
                points: points.max(0),
            }
        })
        .collect()
}

fn team_id(slot: u32) -> u32 {
    100 + slot
}

fn synthetic_fixture(
    rng: &mut impl Rng,
    fixture_id: u64,
    standings: &[StandingRow],
) -> FixtureInput {
    let home_slot = rng.gen_range(1..=LEAGUE_SIZE);
    let mut away_slot = rng.gen_range(1..LEAGUE_SIZE);
    if away_slot >= home_slot {
        away_slot += 1;
    }
    let (home_id, away_id) = (team_id(home_slot), team_id(away_slot));

    let head_to_head = (0..rng.gen_range(0..6))
        .map(|k| {
            let swap = rng.gen_bool(0.5);
            let (h, a) = if swap { (away_id, home_id) } else { (home_id, away_id) };
            result(rng, fixture_id * 100 + k, h, a, 2023 - k as i32, "FT")
        })
        .collect();

    FixtureInput {
        fixture: FixtureRef {
            fixture_id,
            teams: Some(FixtureTeams {
                home: TeamRef {
                    id: home_id,
                    name: format!("Club {home_slot}"),
                },
                away: TeamRef {
                    id: away_id,
                    name: format!("Club {away_slot}"),
                },
            }),
            league: Some(LEAGUE),
        },
        home: team_payload(rng, fixture_id, home_id),
        away: team_payload(rng, fixture_id, away_id),
        standings: standings.to_vec(),
        head_to_head,
        odds: synthetic_odds(rng),
    }
}

fn team_payload(rng: &mut impl Rng, fixture_id: u64, team_id: u32) -> TeamPayload {
    // Roughly one team in ten comes back without statistics.
    let statistics = (!rng.gen_bool(0.1)).then(|| team_statistics(rng));
    let recent = (0..10)
        .map(|k| {
            let opponent = 500 + rng.gen_range(0..50);
            let (h, a) = if k % 2 == 0 { (team_id, opponent) } else { (opponent, team_id) };
            // The newest fixture is occasionally still in progress.
            let status = if k == 0 && rng.gen_bool(0.2) { "2H" } else { "FT" };
            result(rng, fixture_id * 1_000 + u64::from(team_id) * 10 + k, h, a, 2024, status)
        })
        .collect();
    TeamPayload { statistics, recent }
}

fn team_statistics(rng: &mut impl Rng) -> TeamStatistics {
    let goals_for_total = rng.gen_range(15.0..75.0_f64).round();
    let goals_by_minute = MINUTE_BUCKETS
        .iter()
        .map(|bucket| (bucket.to_string(), rng.gen_range(0.0..12.0_f64).round()))
        .collect::<BTreeMap<_, _>>();
    TeamStatistics {
        goals_for_avg: split(rng, 0.6..2.4),
        goals_against_avg: split(rng, 0.5..2.2),
        goals_for_total: Some(goals_for_total),
        shots_on_target_total: Some((goals_for_total * rng.gen_range(2.5..4.5_f64)).round()),
        goals_by_minute,
        corners_avg: split(rng, 3.0..7.0),
        shots_on_goal_avg: split(rng, 3.0..7.0),
    }
}

fn split(rng: &mut impl Rng, range: std::ops::Range<f64>) -> SplitStat {
    let home = rng.gen_range(range.clone());
    let away = rng.gen_range(range);
    SplitStat {
        home: Some(home),
        away: Some(away),
        total: Some((home + away) / 2.0),
    }
}

fn result(
    rng: &mut impl Rng,
    fixture_id: u64,
    home_id: u32,
    away_id: u32,
    year: i32,
    status: &str,
) -> FixtureResult {
    let month = rng.gen_range(1..=12);
    let day = rng.gen_range(1..=28);
    FixtureResult {
        fixture_id,
        date: Some(format!("{year}-{month:02}-{day:02}T15:00:00+00:00")),
        status: Some(status.to_string()),
        home_id,
        away_id,
        home_goals: Some(rng.gen_range(0..4)),
        away_goals: Some(rng.gen_range(0..4)),
    }
}

fn synthetic_odds(rng: &mut impl Rng) -> OddsTable {
    let bookmakers = BOOKMAKERS
        .iter()
        .map(|name| {
            let mut quotes = Vec::new();
            let home = rng.gen_range(1.4..4.5);
            let draw = rng.gen_range(3.0..4.2);
            let away = rng.gen_range(1.6..6.0);
            quotes.push(quote("Match Winner", Some(1), "Home", None, home));
            quotes.push(quote("Match Winner", Some(1), "Draw", None, draw));
            quotes.push(quote("Match Winner", Some(1), "Away", None, away));

            let over = rng.gen_range(1.6..2.4);
            quotes.push(quote("Goals Over/Under", Some(5), "Over 2.5", None, over));
            quotes.push(quote("Goals Over/Under", Some(5), "Under 2.5", None, 3.9 - over));

            let yes = rng.gen_range(1.6..2.2);
            quotes.push(quote("Both Teams Score", Some(8), "Yes", None, yes));
            quotes.push(quote("Both Teams Score", Some(8), "No", None, 3.8 - yes));

            let one_all = rng.gen_range(5.5..8.0);
            quotes.push(quote("Exact Score", Some(10), "1:1", None, one_all));
            for side in ["Over", "Under"] {
                let odd = rng.gen_range(1.7..2.1);
                quotes.push(quote("Corners Over Under", Some(45), side, Some(9.5), odd));
            }
            (name.to_string(), quotes)
        })
        .collect();
    OddsTable { bookmakers }
}

fn quote(
    market: &str,
    market_id: Option<u32>,
    outcome: &str,
    line: Option<f64>,
    odd: f64,
) -> OddsQuote {
    OddsQuote {
        market: market.to_string(),
        market_id,
        outcome: outcome.to_string(),
        line,
        odd: (odd * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_slate() {
        assert_eq!(synthetic_slate(4, 7), synthetic_slate(4, 7));
        assert_ne!(synthetic_slate(4, 7), synthetic_slate(4, 8));
    }

    #[test]
    fn fixtures_are_well_formed() {
        for input in synthetic_slate(25, 1) {
            let teams = input.fixture.teams.as_ref().expect("teams");
            assert_ne!(teams.home.id, teams.away.id);
            assert!(input.fixture.league.is_some());
            assert_eq!(input.home.recent.len(), 10);
            assert!(input.odds.quote_count() > 0);
        }
    }
}
