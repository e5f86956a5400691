use thiserror::Error;

/// Fixtures the engine refuses to analyse. Missing statistics are never an
/// error; they fall back to defaults.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("fixture {0} has no teams")]
    MissingTeams(u64),

    #[error("fixture {0} has no league")]
    MissingLeague(u64),

    #[error("fixture {fixture_id} lists team {team_id} on both sides")]
    SameTeam { fixture_id: u64, team_id: u32 },
}
