use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const FINISHED_STATUSES: &[&str] = &["FT", "AET", "PEN"];
/// Scores above this are treated as corrupt and the result as unscored.
const MAX_PLAUSIBLE_GOALS: u32 = 99;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitStat {
    #[serde(default, deserialize_with = "float_or_none")]
    pub home: Option<f64>,
    #[serde(default, deserialize_with = "float_or_none")]
    pub away: Option<f64>,
    #[serde(default, deserialize_with = "float_or_none")]
    pub total: Option<f64>,
}

/// Season aggregates for one team in one league. Every field is optional; the
/// extractor falls back to the defaults table for anything missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamStatistics {
    pub goals_for_avg: SplitStat,
    pub goals_against_avg: SplitStat,
    #[serde(deserialize_with = "float_or_none")]
    pub goals_for_total: Option<f64>,
    #[serde(deserialize_with = "float_or_none")]
    pub shots_on_target_total: Option<f64>,
    /// Goals scored per minute bucket, keyed like `"0-15"`, `"76-90"`.
    #[serde(deserialize_with = "minute_buckets")]
    pub goals_by_minute: BTreeMap<String, f64>,
    pub corners_avg: SplitStat,
    pub shots_on_goal_avg: SplitStat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureResult {
    #[serde(default)]
    pub fixture_id: u64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub home_id: u32,
    pub away_id: u32,
    #[serde(default)]
    pub home_goals: Option<u32>,
    #[serde(default)]
    pub away_goals: Option<u32>,
}

impl FixtureResult {
    pub fn goals(&self) -> Option<(u32, u32)> {
        let (h, a) = (self.home_goals?, self.away_goals?);
        (h <= MAX_PLAUSIBLE_GOALS && a <= MAX_PLAUSIBLE_GOALS).then_some((h, a))
    }

    /// A result counts once both scores are known and the status (when given) is final.
    pub fn is_completed(&self) -> bool {
        if self.goals().is_none() {
            return false;
        }
        match self.status.as_deref() {
            Some(status) => {
                let s = status.trim().to_ascii_uppercase();
                FINISHED_STATUSES.contains(&s.as_str())
            }
            None => true,
        }
    }

    pub fn kickoff(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.as_deref()?.trim();
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Id of the winning team, `None` for draws or unfinished fixtures.
    pub fn winner(&self) -> Option<u32> {
        if !self.is_completed() {
            return None;
        }
        let (h, a) = self.goals()?;
        if h > a {
            Some(self.home_id)
        } else if a > h {
            Some(self.away_id)
        } else {
            None
        }
    }

    pub fn involves(&self, team_id: u32) -> bool {
        self.home_id == team_id || self.away_id == team_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team_id: u32,
    pub rank: u32,
    #[serde(default)]
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub market: String,
    #[serde(default)]
    pub market_id: Option<u32>,
    pub outcome: String,
    #[serde(default)]
    pub line: Option<f64>,
    pub odd: f64,
}

/// Bookmaker name -> quoted prices. Ordered so repeated runs walk bookmakers identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OddsTable {
    pub bookmakers: BTreeMap<String, Vec<OddsQuote>>,
}

impl OddsTable {
    pub fn is_empty(&self) -> bool {
        self.bookmakers.values().all(|quotes| quotes.is_empty())
    }

    pub fn quote_count(&self) -> usize {
        self.bookmakers.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureTeams {
    pub home: TeamRef,
    pub away: TeamRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeagueRef {
    pub id: u32,
    #[serde(default)]
    pub season: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRef {
    pub fixture_id: u64,
    #[serde(default)]
    pub teams: Option<FixtureTeams>,
    #[serde(default)]
    pub league: Option<LeagueRef>,
}

impl FixtureRef {
    pub fn display_name(&self) -> String {
        match &self.teams {
            Some(t) => format!("{} vs {}", team_label(&t.home), team_label(&t.away)),
            None => format!("Fixture {}", self.fixture_id),
        }
    }
}

fn team_label(team: &TeamRef) -> String {
    let name = team.name.trim();
    if name.is_empty() {
        format!("Team {}", team.id)
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamPayload {
    pub statistics: Option<TeamStatistics>,
    /// Latest fixtures, any order; the extractor sorts by kickoff.
    pub recent: Vec<FixtureResult>,
}

/// Everything the engine needs for one fixture, as handed over by the fetch layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureInput {
    pub fixture: FixtureRef,
    #[serde(default)]
    pub home: TeamPayload,
    #[serde(default)]
    pub away: TeamPayload,
    #[serde(default)]
    pub standings: Vec<StandingRow>,
    #[serde(default)]
    pub head_to_head: Vec<FixtureResult>,
    #[serde(default)]
    pub odds: OddsTable,
}

impl FixtureInput {
    pub fn bare(fixture: FixtureRef) -> Self {
        Self {
            fixture,
            home: TeamPayload::default(),
            away: TeamPayload::default(),
            standings: Vec::new(),
            head_to_head: Vec::new(),
            odds: OddsTable::default(),
        }
    }
}

/// Walks `path` through nested objects and reads the leaf as a number.
/// Numeric strings such as `"1.35"` or `"55%"` are accepted.
pub fn num_at(root: &Value, path: &[&str]) -> Option<f64> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    value_as_f64(cur)
}

pub fn first_num_at(root: &Value, paths: &[&[&str]]) -> Option<f64> {
    paths.iter().find_map(|path| num_at(root, path))
}

fn value_as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_end_matches('%').replace(',', "");
    if s.is_empty() || s == "-" {
        return None;
    }
    s.parse::<f64>().ok()
}

fn u32_at(root: &Value, path: &[&str]) -> Option<u32> {
    num_at(root, path)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32)
}

fn str_at<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    cur.as_str()
}

fn parse_root(raw: &str, what: &str) -> Result<Option<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let root: Value =
        serde_json::from_str(trimmed).with_context(|| format!("invalid {what} json"))?;
    let body = match root {
        Value::Object(mut map) if map.contains_key("response") => {
            map.remove("response").unwrap_or(Value::Null)
        }
        other => other,
    };
    Ok((!body.is_null()).then_some(body))
}

fn split_at(root: &Value, prefix: &[&str]) -> SplitStat {
    let read = |leaf: &str| {
        let mut path = prefix.to_vec();
        path.push(leaf);
        num_at(root, &path)
    };
    SplitStat {
        home: read("home"),
        away: read("away"),
        total: read("total"),
    }
}

/// Parses a season statistics body (`{"response": {...}}` or the bare object).
/// `null` means the provider had nothing for this team.
pub fn parse_team_statistics_json(raw: &str) -> Result<Option<TeamStatistics>> {
    let Some(root) = parse_root(raw, "team statistics")? else {
        return Ok(None);
    };
    let root = match root {
        Value::Array(items) => match items.into_iter().next() {
            Some(first) => first,
            None => return Ok(None),
        },
        other => other,
    };

    let mut goals_by_minute = BTreeMap::new();
    if let Some(buckets) = root
        .get("goals")
        .and_then(|g| g.get("for"))
        .and_then(|g| g.get("minute"))
        .and_then(|m| m.as_object())
    {
        for (bucket, v) in buckets {
            if let Some(goals) = bucket_goals(v) {
                goals_by_minute.insert(bucket.clone(), goals);
            }
        }
    }

    Ok(Some(TeamStatistics {
        goals_for_avg: split_at(&root, &["goals", "for", "average"]),
        goals_against_avg: split_at(&root, &["goals", "against", "average"]),
        goals_for_total: num_at(&root, &["goals", "for", "total", "total"]),
        shots_on_target_total: first_num_at(
            &root,
            &[
                &["shots", "on", "total"],
                &["shots", "on_target", "total"],
                &["shots_on_target", "total"],
            ],
        ),
        goals_by_minute,
        corners_avg: split_at(&root, &["corners", "average"]),
        shots_on_goal_avg: split_at(&root, &["shots", "on_goal", "average"]),
    }))
}

/// Parses a fixtures list (last-N results or head-to-head meetings).
/// Entries without both team ids are dropped.
pub fn parse_fixture_results_json(raw: &str) -> Result<Vec<FixtureResult>> {
    let Some(root) = parse_root(raw, "fixtures")? else {
        return Ok(Vec::new());
    };
    let Some(items) = root.as_array() else {
        return Ok(Vec::new());
    };
    Ok(items.iter().filter_map(parse_fixture_result).collect())
}

fn parse_fixture_result(v: &Value) -> Option<FixtureResult> {
    let home_id = u32_at(v, &["teams", "home", "id"])?;
    let away_id = u32_at(v, &["teams", "away", "id"])?;
    Some(FixtureResult {
        fixture_id: num_at(v, &["fixture", "id"]).map_or(0, |n| n.max(0.0) as u64),
        date: str_at(v, &["fixture", "date"]).map(str::to_string),
        status: str_at(v, &["fixture", "status", "short"]).map(str::to_string),
        home_id,
        away_id,
        home_goals: u32_at(v, &["goals", "home"]),
        away_goals: u32_at(v, &["goals", "away"]),
    })
}

/// Parses league standings; grouped tables are flattened.
pub fn parse_standings_json(raw: &str) -> Result<Vec<StandingRow>> {
    let Some(root) = parse_root(raw, "standings")? else {
        return Ok(Vec::new());
    };
    let leagues: Vec<&Value> = match root.as_array() {
        Some(items) => items.iter().collect(),
        None => vec![&root],
    };

    let mut out = Vec::new();
    for league in leagues {
        let Some(groups) = league
            .get("league")
            .and_then(|l| l.get("standings"))
            .and_then(|s| s.as_array())
        else {
            continue;
        };
        for group in groups {
            let rows = match group.as_array() {
                Some(rows) => rows.iter().collect::<Vec<_>>(),
                None => vec![group],
            };
            for row in rows {
                let (Some(team_id), Some(rank)) =
                    (u32_at(row, &["team", "id"]), u32_at(row, &["rank"]))
                else {
                    continue;
                };
                let points = num_at(row, &["points"]).map_or(0, |p| p as i32);
                out.push(StandingRow {
                    team_id,
                    rank,
                    points,
                });
            }
        }
    }
    Ok(out)
}

/// Parses a pre-match odds body into a per-bookmaker table. Prices at or
/// below 1.0 are not real quotes and are dropped.
pub fn parse_odds_json(raw: &str) -> Result<OddsTable> {
    let Some(root) = parse_root(raw, "odds")? else {
        return Ok(OddsTable::default());
    };
    let events: Vec<&Value> = match root.as_array() {
        Some(items) => items.iter().collect(),
        None => vec![&root],
    };

    let mut table = OddsTable::default();
    for event in events {
        let Some(bookmakers) = event.get("bookmakers").and_then(|b| b.as_array()) else {
            continue;
        };
        for bookmaker in bookmakers {
            let Some(name) = str_at(bookmaker, &["name"]).map(str::trim) else {
                continue;
            };
            let Some(bets) = bookmaker.get("bets").and_then(|b| b.as_array()) else {
                continue;
            };
            let quotes = table.bookmakers.entry(name.to_string()).or_default();
            for bet in bets {
                let market = str_at(bet, &["name"]).unwrap_or_default().trim().to_string();
                let market_id = u32_at(bet, &["id"]);
                let Some(values) = bet.get("values").and_then(|v| v.as_array()) else {
                    continue;
                };
                for value in values {
                    let Some(outcome) = value.get("value").and_then(outcome_label) else {
                        continue;
                    };
                    let Some(odd) = num_at(value, &["odd"]).filter(|o| *o > 1.0) else {
                        continue;
                    };
                    quotes.push(OddsQuote {
                        market: market.clone(),
                        market_id,
                        outcome: outcome.trim().to_string(),
                        line: num_at(value, &["handicap"]),
                        odd,
                    });
                }
            }
        }
    }
    table.bookmakers.retain(|_, quotes| !quotes.is_empty());
    Ok(table)
}

fn outcome_label(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        other => value_as_f64(other).map(|n| n.to_string()),
    }
}

fn float_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value))
}

fn bucket_goals(v: &Value) -> Option<f64> {
    num_at(v, &["total"]).or_else(|| value_as_f64(v))
}

/// Unreadable buckets are dropped rather than failing the whole record.
fn minute_buckets<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Some(buckets) = value.as_object() else {
        return Ok(BTreeMap::new());
    };
    Ok(buckets
        .iter()
        .filter_map(|(bucket, v)| bucket_goals(v).map(|goals| (bucket.clone(), goals)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn num_at_reads_numbers_and_numeric_strings() {
        let v: Value = serde_json::json!({
            "a": {"b": "1.35", "c": 2, "d": "55%", "e": null, "f": "-"}
        });
        assert_eq!(num_at(&v, &["a", "b"]), Some(1.35));
        assert_eq!(num_at(&v, &["a", "c"]), Some(2.0));
        assert_eq!(num_at(&v, &["a", "d"]), Some(55.0));
        assert_eq!(num_at(&v, &["a", "e"]), None);
        assert_eq!(num_at(&v, &["a", "f"]), None);
        assert_eq!(num_at(&v, &["a", "missing", "deep"]), None);
    }

    #[test]
    fn completed_requires_final_status_and_scores() {
        let mut f = FixtureResult {
            fixture_id: 1,
            date: None,
            status: Some("FT".to_string()),
            home_id: 1,
            away_id: 2,
            home_goals: Some(2),
            away_goals: Some(2),
        };
        assert!(f.is_completed());
        assert_eq!(f.winner(), None);

        f.status = Some("NS".to_string());
        assert!(!f.is_completed());

        f.status = Some("aet".to_string());
        f.away_goals = Some(3);
        assert_eq!(f.winner(), Some(2));

        f.away_goals = None;
        assert!(!f.is_completed());
    }

    #[test]
    fn corrupt_scores_leave_result_unscored() {
        let raw = r#"{"response":[{
            "fixture":{"id":9,"status":{"short":"FT"}},
            "teams":{"home":{"id":1},"away":{"id":2}},
            "goals":{"home":4294967295,"away":1}
        }]}"#;
        let results = parse_fixture_results_json(raw).expect("fixtures should parse");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].home_goals, Some(u32::MAX));
        assert_eq!(results[0].goals(), None);
        assert!(!results[0].is_completed());
        assert_eq!(results[0].winner(), None);
    }

    #[test]
    fn typed_statistics_accept_string_numbers() {
        let raw = r#"{"goals_for_avg":{"home":"1.9","away":null},"goals_for_total":"31"}"#;
        let stats: TeamStatistics = serde_json::from_str(raw).expect("typed stats should parse");
        assert_eq!(stats.goals_for_avg.home, Some(1.9));
        assert_eq!(stats.goals_for_avg.away, None);
        assert_eq!(stats.goals_for_total, Some(31.0));
        assert!(stats.goals_by_minute.is_empty());
    }

    #[test]
    fn typed_minute_buckets_skip_unreadable_values() {
        let raw = r#"{"goals_by_minute":{"0-15":3,"16-30":null,"31-45":"4","46-60":"-","76-90":{"total":2}}}"#;
        let stats: TeamStatistics = serde_json::from_str(raw).expect("typed stats should parse");
        let expected = BTreeMap::from([
            ("0-15".to_string(), 3.0),
            ("31-45".to_string(), 4.0),
            ("76-90".to_string(), 2.0),
        ]);
        assert_eq!(stats.goals_by_minute, expected);

        let stats: TeamStatistics =
            serde_json::from_str(r#"{"goals_by_minute":null}"#).expect("null buckets should parse");
        assert!(stats.goals_by_minute.is_empty());
    }

    #[test]
    fn display_name_without_teams() {
        let f = FixtureRef {
            fixture_id: 77,
            teams: None,
            league: None,
        };
        assert_eq!(f.display_name(), "Fixture 77");
    }
}
