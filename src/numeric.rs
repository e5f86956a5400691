pub fn factorial(k: u32) -> f64 {
    (1..=k).fold(1.0_f64, |acc, n| acc * n as f64)
}

pub fn poisson(lambda: f64, k: u32) -> f64 {
    let lambda = if lambda.is_finite() { lambda.max(0.0) } else { 0.0 };
    let p = lambda.powi(k as i32) * (-lambda).exp() / factorial(k);
    if p.is_finite() { p } else { 0.0 }
}

/// Low-score correction multiplied onto the independent Poisson joint probability.
pub fn dixon_coles_factor(home_goals: u32, away_goals: u32, lambda: f64, mu: f64, rho: f64) -> f64 {
    match (home_goals, away_goals) {
        (0, 0) => (1.0 - lambda * mu * rho).max(0.0),
        (0, 1) => 1.0 + lambda * rho,
        (1, 0) => 1.0 + mu * rho,
        (1, 1) => (1.0 - rho).max(0.0),
        _ => 1.0,
    }
}

/// Linear rescale onto [0, 1]. A degenerate range (or a NaN input) maps to 0.5.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min || value.is_nan() {
        return 0.5;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

pub fn elo_win_probability(elo_a: f64, elo_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((elo_b - elo_a) / 400.0))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineProbability {
    pub under: f64,
    pub over: f64,
}

/// Probability that a Poisson count lands under/over a half line such as 9.5.
pub fn poisson_line_probability(lambda: f64, line: f64) -> LineProbability {
    let lambda = if lambda.is_finite() { lambda.max(0.0) } else { 0.0 };
    if !line.is_finite() || line < 0.0 {
        return LineProbability {
            under: 0.0,
            over: 1.0,
        };
    }

    // Recurrence instead of powi/factorial so long lines cannot overflow.
    let max_k = line.floor() as u32;
    let mut term = (-lambda).exp();
    let mut under = term;
    for k in 1..=max_k {
        term *= lambda / k as f64;
        under += term;
    }
    let under = under.clamp(0.0, 1.0);
    LineProbability {
        under,
        over: 1.0 - under,
    }
}
