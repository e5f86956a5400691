use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::blend::{Prob3, blend_match_result, power_match_result};
use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::features::extract_team_features;
use crate::h2h::{H2hFactor, aggregate_h2h};
use crate::markets::{Market, MarketProbabilities, YES, over_label, score_label};
use crate::payload::{
    FixtureInput, FixtureRef, FixtureResult, FixtureTeams, LeagueRef, OddsTable, StandingRow,
    TeamPayload, TeamRef, TeamStatistics,
};
use crate::power::{PowerScores, compute_power_scores};
use crate::score_matrix::{ExpectedGoals, build_goal_model, triple_market};
use crate::value::{
    Suggestion, ValuableBet, best_probability_value_bet, find_valuable_bets, most_likely_outcomes,
};

const MOST_LIKELY_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MainPrediction {
    pub home_win_prob: f64,
    pub draw_prob: f64,
    pub away_win_prob: f64,
    pub home_xg: f64,
    pub away_xg: f64,
}

impl MainPrediction {
    fn new(p: Prob3, xg: ExpectedGoals) -> Self {
        Self {
            home_win_prob: p.home,
            draw_prob: p.draw,
            away_win_prob: p.away,
            home_xg: xg.home,
            away_xg: xg.away,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectScore {
    pub score: String,
    pub prob: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GreenSuggestions {
    /// Highest-probability bet among those with positive EV.
    pub safest_value_bet: Option<ValuableBet>,
    /// Most probable outcomes regardless of odds, correct scores excluded.
    pub most_likely: Vec<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureAnalysis {
    pub fixture_name: String,
    pub fixture_id: u64,
    pub main_prediction: MainPrediction,
    pub power_scores: PowerScores,
    pub h2h: H2hFactor,
    pub markets: MarketProbabilities,
    pub correct_scores: Vec<CorrectScore>,
    pub valuable_bets: Vec<ValuableBet>,
    pub green_suggestions: GreenSuggestions,
    pub narrative: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Success(Box<FixtureAnalysis>),
    Failed {
        fixture_name: String,
        fixture_id: u64,
        error: String,
    },
}

impl AnalysisResult {
    pub fn fixture_id(&self) -> u64 {
        match self {
            AnalysisResult::Success(a) => a.fixture_id,
            AnalysisResult::Failed { fixture_id, .. } => *fixture_id,
        }
    }

    pub fn fixture_name(&self) -> &str {
        match self {
            AnalysisResult::Success(a) => &a.fixture_name,
            AnalysisResult::Failed { fixture_name, .. } => fixture_name,
        }
    }

    pub fn analysis(&self) -> Option<&FixtureAnalysis> {
        match self {
            AnalysisResult::Success(a) => Some(a.as_ref()),
            AnalysisResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisResult::Success(_) => None,
            AnalysisResult::Failed { error, .. } => Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error().is_some()
    }

    pub fn valuable_bets(&self) -> &[ValuableBet] {
        self.analysis()
            .map(|a| a.valuable_bets.as_slice())
            .unwrap_or_default()
    }
}

/// Runs the full pipeline for one fixture. Never panics on incomplete
/// statistics; a fixture without teams or league comes back as `Failed`.
pub fn analyze_fixture(input: &FixtureInput, cfg: &EngineConfig) -> AnalysisResult {
    let fixture_name = input.fixture.display_name();
    let fixture_id = input.fixture.fixture_id;
    match run_pipeline(input, cfg, &fixture_name) {
        Ok(analysis) => AnalysisResult::Success(Box::new(analysis)),
        Err(err) => {
            warn!(fixture_id, fixture = %fixture_name, error = %err, "fixture skipped");
            AnalysisResult::Failed {
                fixture_name,
                fixture_id,
                error: err.to_string(),
            }
        }
    }
}

fn validate(fixture: &FixtureRef) -> Result<(&FixtureTeams, LeagueRef), AnalysisError> {
    let teams = fixture
        .teams
        .as_ref()
        .ok_or(AnalysisError::MissingTeams(fixture.fixture_id))?;
    let league = fixture
        .league
        .ok_or(AnalysisError::MissingLeague(fixture.fixture_id))?;
    if teams.home.id == teams.away.id {
        return Err(AnalysisError::SameTeam {
            fixture_id: fixture.fixture_id,
            team_id: teams.home.id,
        });
    }
    Ok((teams, league))
}

fn run_pipeline(
    input: &FixtureInput,
    cfg: &EngineConfig,
    fixture_name: &str,
) -> Result<FixtureAnalysis, AnalysisError> {
    let fixture_id = input.fixture.fixture_id;
    let (teams, _league) = validate(&input.fixture)?;

    let home = extract_team_features(teams.home.id, &input.home, &input.standings);
    let away = extract_team_features(teams.away.id, &input.away, &input.standings);
    let h2h = aggregate_h2h(teams.home.id, teams.away.id, &input.head_to_head);

    let power_scores = compute_power_scores(&home, &away, &h2h, cfg.base_weights);
    let goals = build_goal_model(&home, &away, &h2h, cfg);
    let blended = blend_match_result(
        goals.match_result,
        power_match_result(power_scores.home.ift, power_scores.away.ift),
        cfg.goals_blend_weight,
    );

    let mut markets = goals.markets;
    markets.insert(Market::MatchResult, triple_market(blended));

    let valuable_bets = find_valuable_bets(
        fixture_id,
        fixture_name,
        &markets,
        &input.odds,
        &cfg.staking_rules(),
    );
    let correct_scores = goals
        .matrix
        .top_scores(cfg.top_correct_scores)
        .into_iter()
        .map(|(i, j, prob)| CorrectScore {
            score: score_label(i, j),
            prob,
        })
        .collect();
    let green_suggestions = GreenSuggestions {
        safest_value_bet: best_probability_value_bet(&valuable_bets).cloned(),
        most_likely: most_likely_outcomes(&markets, MOST_LIKELY_COUNT),
    };

    let main_prediction = MainPrediction::new(blended, goals.xg);
    let narrative = narrative(teams, &main_prediction, &markets, &valuable_bets, cfg);

    debug!(
        fixture_id,
        home_xg = goals.xg.home,
        away_xg = goals.xg.away,
        home = blended.home,
        draw = blended.draw,
        away = blended.away,
        value_bets = valuable_bets.len(),
        "fixture analysed"
    );

    Ok(FixtureAnalysis {
        fixture_name: fixture_name.to_string(),
        fixture_id,
        main_prediction,
        power_scores,
        h2h,
        markets,
        correct_scores,
        valuable_bets,
        green_suggestions,
        narrative,
    })
}

fn narrative(
    teams: &FixtureTeams,
    p: &MainPrediction,
    markets: &MarketProbabilities,
    bets: &[ValuableBet],
    cfg: &EngineConfig,
) -> String {
    let (home, away) = (side_name(&teams.home, "Home"), side_name(&teams.away, "Away"));
    let mut text = if p.draw_prob >= p.home_win_prob && p.draw_prob >= p.away_win_prob {
        format!("A draw is the likeliest result at {:.1}%.", p.draw_prob * 100.0)
    } else if p.home_win_prob >= p.away_win_prob {
        format!("{home} are favourites at {:.1}% to win at home.", p.home_win_prob * 100.0)
    } else {
        format!("{away} are favourites at {:.1}% to win away.", p.away_win_prob * 100.0)
    };

    text.push_str(&format!(" Expected goals {:.2} - {:.2}.", p.home_xg, p.away_xg));

    let over = markets
        .get(Market::TotalGoals, &over_label(cfg.goals_line))
        .unwrap_or(0.5);
    let btts = markets
        .get(Market::BothTeamsScore, YES)
        .unwrap_or(0.5);
    let goals_lean = if over >= 0.5 { "over" } else { "under" };
    text.push_str(&format!(
        " Leaning {goals_lean} {} goals ({:.1}% over); both teams score {:.1}%.",
        cfg.goals_line,
        over * 100.0,
        btts * 100.0
    ));

    match bets.first() {
        Some(bet) => text.push_str(&format!(
            " Best value: {} {} @ {:.2} with {} (EV {:+.1}%, stake {:.1}% of bankroll).",
            bet.market.name(),
            bet.outcome,
            bet.odd,
            bet.bookmaker_name,
            bet.value * 100.0,
            bet.kelly_stake * 100.0
        )),
        None => text.push_str(" No value against the quoted odds."),
    }
    text
}

fn side_name<'a>(team: &'a TeamRef, fallback: &'a str) -> &'a str {
    let name = team.name.trim();
    if name.is_empty() { fallback } else { name }
}

/// Analyses every fixture on a dedicated pool; output order follows input order.
pub fn analyze_slate(inputs: &[FixtureInput], cfg: &EngineConfig) -> Vec<AnalysisResult> {
    let results: Vec<AnalysisResult> = with_pool(cfg.parallelism, || {
        inputs
            .par_iter()
            .map(|input| analyze_fixture(input, cfg))
            .collect()
    });

    let failed = results.iter().filter(|r| r.is_failed()).count();
    let value_bets: usize = results.iter().map(|r| r.valuable_bets().len()).sum();
    info!(fixtures = results.len(), failed, value_bets, "slate analysed");
    results
}

fn with_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

/// The fetch layer the engine sits behind. Implementations own caching and
/// retries; every call may fail independently.
pub trait FixtureDataSource: Sync {
    fn team_statistics(&self, team_id: u32, league: LeagueRef) -> Result<Option<TeamStatistics>>;
    fn recent_fixtures(&self, team_id: u32, last: usize) -> Result<Vec<FixtureResult>>;
    fn standings(&self, league: LeagueRef) -> Result<Vec<StandingRow>>;
    fn head_to_head(&self, home_id: u32, away_id: u32) -> Result<Vec<FixtureResult>>;
    fn odds(&self, fixture_id: u64) -> Result<OddsTable>;
}

/// Runs every independent fetch for one fixture concurrently and waits for
/// all of them. A failed fetch leaves its input empty so the defaults apply.
pub fn gather_fixture_input<S>(source: &S, fixture: &FixtureRef, recent_window: usize) -> FixtureInput
where
    S: FixtureDataSource + ?Sized,
{
    let fixture_id = fixture.fixture_id;
    let (Some(teams), Some(league)) = (fixture.teams.as_ref(), fixture.league) else {
        return FixtureInput::bare(fixture.clone());
    };
    let (home_id, away_id) = (teams.home.id, teams.away.id);

    let ((home, away), (standings, (head_to_head, odds))) = rayon::join(
        || {
            rayon::join(
                || team_payload(source, fixture_id, home_id, league, recent_window),
                || team_payload(source, fixture_id, away_id, league, recent_window),
            )
        },
        || {
            rayon::join(
                || unavailable_on_err(source.standings(league), fixture_id, "standings"),
                || {
                    rayon::join(
                        || {
                            unavailable_on_err(
                                source.head_to_head(home_id, away_id),
                                fixture_id,
                                "head_to_head",
                            )
                        },
                        || unavailable_on_err(source.odds(fixture_id), fixture_id, "odds"),
                    )
                },
            )
        },
    );

    FixtureInput {
        fixture: fixture.clone(),
        home,
        away,
        standings,
        head_to_head,
        odds,
    }
}

fn team_payload<S>(
    source: &S,
    fixture_id: u64,
    team_id: u32,
    league: LeagueRef,
    recent_window: usize,
) -> TeamPayload
where
    S: FixtureDataSource + ?Sized,
{
    let (statistics, recent) = rayon::join(
        || {
            unavailable_on_err(
                source.team_statistics(team_id, league),
                fixture_id,
                "team_statistics",
            )
        },
        || {
            unavailable_on_err(
                source.recent_fixtures(team_id, recent_window),
                fixture_id,
                "recent_fixtures",
            )
        },
    );
    TeamPayload { statistics, recent }
}

fn unavailable_on_err<T: Default>(res: Result<T>, fixture_id: u64, input: &str) -> T {
    match res {
        Ok(value) => value,
        Err(err) => {
            warn!(fixture_id, input, error = %err, "fetch failed, input treated as unavailable");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_ref(id: u64) -> FixtureRef {
        FixtureRef {
            fixture_id: id,
            teams: Some(FixtureTeams {
                home: TeamRef {
                    id: 10,
                    name: "Home FC".to_string(),
                },
                away: TeamRef {
                    id: 20,
                    name: "Away United".to_string(),
                },
            }),
            league: Some(LeagueRef {
                id: 39,
                season: Some(2024),
            }),
        }
    }

    #[test]
    fn bare_fixture_uses_defaults() {
        let result = analyze_fixture(&FixtureInput::bare(fixture_ref(1)), &EngineConfig::default());
        let analysis = result.analysis().expect("analysis succeeds on defaults");
        let p = analysis.main_prediction;
        assert!((p.home_win_prob + p.draw_prob + p.away_win_prob - 1.0).abs() < 1e-9);
        assert_eq!(analysis.correct_scores.len(), 5);
        assert!(analysis.valuable_bets.is_empty());
        assert!(analysis.narrative.contains("No value"));
        assert_eq!(analysis.h2h.matches, 0);
    }

    #[test]
    fn blended_triple_replaces_goal_model_triple() {
        let analysis = analyze_fixture(&FixtureInput::bare(fixture_ref(1)), &EngineConfig::default());
        let analysis = analysis.analysis().expect("analysis");
        let p = analysis.main_prediction;
        assert_eq!(
            analysis.markets.get(Market::MatchResult, crate::markets::HOME),
            Some(p.home_win_prob)
        );
    }

    #[test]
    fn missing_pieces_fail_fast() {
        let mut no_teams = fixture_ref(2);
        no_teams.teams = None;
        let r = analyze_fixture(&FixtureInput::bare(no_teams), &EngineConfig::default());
        assert_eq!(r.error(), Some("fixture 2 has no teams"));
        assert_eq!(r.fixture_name(), "Fixture 2");

        let mut no_league = fixture_ref(3);
        no_league.league = None;
        let r = analyze_fixture(&FixtureInput::bare(no_league), &EngineConfig::default());
        assert!(r.is_failed());

        let mut same = fixture_ref(4);
        if let Some(teams) = same.teams.as_mut() {
            teams.away.id = teams.home.id;
        }
        let r = analyze_fixture(&FixtureInput::bare(same), &EngineConfig::default());
        assert!(r.error().unwrap_or_default().contains("both sides"));
    }

    #[test]
    fn failed_result_serializes_flat() {
        let r = AnalysisResult::Failed {
            fixture_name: "Fixture 9".to_string(),
            fixture_id: 9,
            error: "fixture 9 has no teams".to_string(),
        };
        let json = serde_json::to_value(&r).expect("serialize");
        assert_eq!(json["fixture_name"], "Fixture 9");
        assert_eq!(json["error"], "fixture 9 has no teams");
    }
}
