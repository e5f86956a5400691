use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    /// Rescaled to sum to 1. Negative or non-finite entries count as zero;
    /// an all-zero triple becomes uniform.
    pub fn normalized(self) -> Self {
        let clean = |p: f64| if p.is_finite() { p.max(0.0) } else { 0.0 };
        let (h, d, a) = (clean(self.home), clean(self.draw), clean(self.away));
        let sum = h + d + a;
        if sum <= 0.0 {
            return Self::uniform();
        }
        Self {
            home: h / sum,
            draw: d / sum,
            away: a / sum,
        }
    }
}

/// Match-result reading of the two strength indices. Not normalized: the draw
/// term is `1 - |home - away|`, so the triple sums to more than 1.
pub fn power_match_result(home_ift: f64, away_ift: f64) -> Prob3 {
    let total = home_ift + away_ift;
    let (home, away) = if total > 0.0 && total.is_finite() {
        (home_ift / total, away_ift / total)
    } else {
        (0.5, 0.5)
    };
    Prob3 {
        home,
        draw: 1.0 - (home - away).abs(),
        away,
    }
}

/// Weighted average of the score-matrix and power-score triples, renormalized.
/// `goals_weight` is the score-matrix share (0.5 gives the even blend).
pub fn blend_match_result(goals: Prob3, power: Prob3, goals_weight: f64) -> Prob3 {
    let w = if goals_weight.is_finite() {
        goals_weight.clamp(0.0, 1.0)
    } else {
        0.5
    };
    Prob3 {
        home: w * goals.home + (1.0 - w) * power.home,
        draw: w * goals.draw + (1.0 - w) * power.draw,
        away: w * goals.away + (1.0 - w) * power.away,
    }
    .normalized()
}
