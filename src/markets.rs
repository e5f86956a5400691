use std::collections::BTreeMap;

use serde::Serialize;

pub const HOME: &str = "Home";
pub const DRAW: &str = "Draw";
pub const AWAY: &str = "Away";
pub const YES: &str = "Yes";
pub const NO: &str = "No";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Market {
    #[serde(rename = "Resultado Final")]
    MatchResult,
    #[serde(rename = "Total de Golos")]
    TotalGoals,
    #[serde(rename = "Ambas Marcam")]
    BothTeamsScore,
    #[serde(rename = "Placar Exato")]
    CorrectScore,
    #[serde(rename = "Total de Cantos")]
    TotalCorners,
    #[serde(rename = "Total de Chutes ao Gol")]
    TotalShotsOnGoal,
}

impl Market {
    pub const ALL: [Market; 6] = [
        Market::MatchResult,
        Market::TotalGoals,
        Market::BothTeamsScore,
        Market::CorrectScore,
        Market::TotalCorners,
        Market::TotalShotsOnGoal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Market::MatchResult => "Resultado Final",
            Market::TotalGoals => "Total de Golos",
            Market::BothTeamsScore => "Ambas Marcam",
            Market::CorrectScore => "Placar Exato",
            Market::TotalCorners => "Total de Cantos",
            Market::TotalShotsOnGoal => "Total de Chutes ao Gol",
        }
    }

    fn is_over_under(self) -> bool {
        matches!(
            self,
            Market::TotalGoals | Market::TotalCorners | Market::TotalShotsOnGoal
        )
    }

    /// Maps a bookmaker's market naming (or numeric id) onto the modelled markets.
    pub fn from_bookmaker(name: &str, id: Option<u32>) -> Option<Market> {
        let n = name.trim().to_lowercase();
        if n.is_empty() {
            return id.and_then(market_for_id);
        }
        // Order matters: corner and shot lines are also "over/under" markets.
        if n.contains("corner") || n.contains("cantos") {
            if n.contains("1st") || n.contains("first") || n.contains("half") {
                return None;
            }
            return Some(Market::TotalCorners);
        }
        if n.contains("shot") || n.contains("chutes") {
            return Some(Market::TotalShotsOnGoal);
        }
        let team_specific = n.contains("team") && !n.contains("both teams");
        if team_specific || n.contains("half") || n.contains("1st") || n.contains("2nd") {
            return None;
        }
        if n.contains("exact score") || n.contains("correct score") || n.contains("placar exato") {
            return Some(Market::CorrectScore);
        }
        if n.contains("both teams") || n.contains("btts") || n.contains("ambas marcam") {
            return Some(Market::BothTeamsScore);
        }
        if n == "match winner"
            || n == "1x2"
            || n.contains("full time result")
            || n.contains("resultado final")
        {
            return Some(Market::MatchResult);
        }
        if NON_GOAL_TOTALS.iter().any(|word| n.contains(word)) {
            return None;
        }
        // A numeric id, when present, must agree with the goals market.
        if id.is_some_and(|id| id != GOALS_OVER_UNDER_ID) {
            return None;
        }
        if n.contains("over/under") || n.contains("total de golos") || n == "totals" {
            return Some(Market::TotalGoals);
        }
        None
    }
}

const GOALS_OVER_UNDER_ID: u32 = 5;

/// Over/under markets on things other than full-time goals.
const NON_GOAL_TOTALS: &[&str] = &[
    "card",
    "booking",
    "foul",
    "offside",
    "extra time",
    "penalt",
    "throw",
    "goal kick",
];

fn market_for_id(id: u32) -> Option<Market> {
    match id {
        1 => Some(Market::MatchResult),
        GOALS_OVER_UNDER_ID => Some(Market::TotalGoals),
        8 => Some(Market::BothTeamsScore),
        10 => Some(Market::CorrectScore),
        45 => Some(Market::TotalCorners),
        _ => None,
    }
}

pub fn over_label(line: f64) -> String {
    format!("Over {line}")
}

pub fn under_label(line: f64) -> String {
    format!("Under {line}")
}

pub fn score_label(home_goals: u32, away_goals: u32) -> String {
    format!("{home_goals}-{away_goals}")
}

/// Brings a quoted outcome onto the labels the model emits, e.g.
/// `"1"` -> `"Home"`, `"Over"` + line 2.5 -> `"Over 2.5"`, `"2:1"` -> `"2-1"`.
pub fn normalize_outcome_label(market: Market, label: &str, line: Option<f64>) -> Option<String> {
    let raw = label.trim();
    let lower = raw.to_lowercase();
    match market {
        Market::MatchResult => match lower.as_str() {
            "home" | "1" | "casa" => Some(HOME.to_string()),
            "draw" | "x" | "empate" => Some(DRAW.to_string()),
            "away" | "2" | "fora" => Some(AWAY.to_string()),
            _ => None,
        },
        Market::BothTeamsScore => match lower.as_str() {
            "yes" | "sim" => Some(YES.to_string()),
            "no" | "não" | "nao" => Some(NO.to_string()),
            _ => None,
        },
        Market::CorrectScore => {
            let (h, a) = raw.split_once([':', '-'])?;
            let h = h.trim().parse::<u32>().ok()?;
            let a = a.trim().parse::<u32>().ok()?;
            Some(score_label(h, a))
        }
        m if m.is_over_under() => {
            let mut parts = lower.split_whitespace();
            let side = parts.next()?;
            let line = match parts.next() {
                Some(embedded) => embedded.parse::<f64>().ok()?,
                None => line?,
            };
            if !line.is_finite() {
                return None;
            }
            match side {
                "over" | "mais" => Some(over_label(line)),
                "under" | "menos" => Some(under_label(line)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Market -> outcome label -> model probability.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MarketProbabilities {
    markets: BTreeMap<Market, BTreeMap<String, f64>>,
}

impl MarketProbabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, market: Market, outcomes: BTreeMap<String, f64>) {
        self.markets.insert(market, outcomes);
    }

    pub fn get(&self, market: Market, outcome: &str) -> Option<f64> {
        self.markets.get(&market)?.get(outcome).copied()
    }

    pub fn market(&self, market: Market) -> Option<&BTreeMap<String, f64>> {
        self.markets.get(&market)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Market, &BTreeMap<String, f64>)> {
        self.markets.iter().map(|(m, outcomes)| (*m, outcomes))
    }

    pub fn market_total(&self, market: Market) -> Option<f64> {
        self.market(market).map(|outcomes| outcomes.values().sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookmaker_names_map_to_markets() {
        assert_eq!(Market::from_bookmaker("Match Winner", Some(1)), Some(Market::MatchResult));
        assert_eq!(Market::from_bookmaker("Goals Over/Under", Some(5)), Some(Market::TotalGoals));
        assert_eq!(Market::from_bookmaker("Both Teams Score", Some(8)), Some(Market::BothTeamsScore));
        assert_eq!(Market::from_bookmaker("Exact Score", Some(10)), Some(Market::CorrectScore));
        assert_eq!(Market::from_bookmaker("Corners Over Under", Some(45)), Some(Market::TotalCorners));
        assert_eq!(Market::from_bookmaker("Total ShotOnGoal", None), Some(Market::TotalShotsOnGoal));
        assert_eq!(Market::from_bookmaker("Goals Over/Under First Half", Some(6)), None);
        assert_eq!(Market::from_bookmaker("Total - Home", Some(16)), None);
        assert_eq!(Market::from_bookmaker("", Some(8)), Some(Market::BothTeamsScore));
        assert_eq!(Market::from_bookmaker("Over/Under", None), Some(Market::TotalGoals));
    }

    #[test]
    fn non_goal_totals_are_not_goals() {
        assert_eq!(Market::from_bookmaker("Cards Over/Under", Some(80)), None);
        assert_eq!(Market::from_bookmaker("Cards Over/Under", None), None);
        assert_eq!(Market::from_bookmaker("Over/Under Extra Time", None), None);
        assert_eq!(Market::from_bookmaker("Total Bookings Over/Under", None), None);
        assert_eq!(Market::from_bookmaker("Fouls Over/Under", None), None);
        assert_eq!(Market::from_bookmaker("Offsides Over/Under", None), None);
        assert_eq!(Market::from_bookmaker("Penalty Shootout Over/Under", None), None);
        assert_eq!(Market::from_bookmaker("Over/Under", Some(80)), None);
    }

    #[test]
    fn outcome_labels_normalize() {
        let n = normalize_outcome_label;
        assert_eq!(n(Market::MatchResult, "1", None).as_deref(), Some("Home"));
        assert_eq!(n(Market::MatchResult, "X", None).as_deref(), Some("Draw"));
        assert_eq!(n(Market::TotalGoals, "Over 2.5", None).as_deref(), Some("Over 2.5"));
        assert_eq!(n(Market::TotalGoals, "Under", Some(2.5)).as_deref(), Some("Under 2.5"));
        assert_eq!(n(Market::TotalCorners, "Over 9.5", None).as_deref(), Some("Over 9.5"));
        assert_eq!(n(Market::CorrectScore, "2:1", None).as_deref(), Some("2-1"));
        assert_eq!(n(Market::BothTeamsScore, "Sim", None).as_deref(), Some("Yes"));
        assert_eq!(n(Market::TotalGoals, "Over", None), None);
        assert_eq!(n(Market::MatchResult, "Home/Draw", None), None);
    }

    #[test]
    fn serializes_with_display_names() {
        let mut probs = MarketProbabilities::new();
        probs.insert(
            Market::BothTeamsScore,
            BTreeMap::from([(YES.to_string(), 0.55), (NO.to_string(), 0.45)]),
        );
        let json = serde_json::to_string(&probs).expect("serialize market probabilities");
        assert_eq!(json, r#"{"Ambas Marcam":{"No":0.45,"Yes":0.55}}"#);
        assert!((probs.market_total(Market::BothTeamsScore).unwrap() - 1.0).abs() < 1e-12);
    }
}
