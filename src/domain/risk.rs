//! Risk metrics over a close-price series.

use serde::Serialize;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RiskMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub value_at_risk: f64,
    pub var_confidence: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
}

impl RiskMetrics {
    /// Computes every metric from closes in chronological order.
    ///
    /// With fewer than two closes all metrics are zero.
    pub fn compute(closes: &[f64], risk_free_rate: f64, var_confidence: f64) -> Self {
        if closes.len() < 2 {
            return RiskMetrics {
                var_confidence,
                ..RiskMetrics::default()
            };
        }

        let returns = simple_returns(closes);
        let first = closes[0];
        let last = closes[closes.len() - 1];

        let total_return = if first > 0.0 {
            (last - first) / first
        } else {
            0.0
        };

        let years = returns.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(closes);
        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns, daily_rf);

        RiskMetrics {
            total_return,
            annualized_return,
            volatility: annualized_volatility(&returns),
            value_at_risk: historical_var(&returns, var_confidence),
            var_confidence,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

/// r[i] = (C[i] - C[i-1]) / C[i-1]; 0 when the previous close is not positive.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| {
            let prev = w[0];
            if prev > 0.0 { (w[1] - prev) / prev } else { 0.0 }
        })
        .collect()
}

fn mean_and_stddev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Population standard deviation of returns scaled by sqrt(252).
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    let (_, stddev) = mean_and_stddev(returns);
    stddev * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Historical VaR as a positive loss fraction.
///
/// Returns are sorted ascending and the one at `floor((1 - confidence) * n)`
/// (clamped to the last index) is negated.
pub fn historical_var(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let index = (((1.0 - confidence) * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    -sorted[index]
}

/// Maximum peak-to-trough decline and the longest run of candles spent below a prior peak.
pub fn compute_drawdown(closes: &[f64]) -> (f64, usize) {
    let Some(&first) = closes.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for &close in closes {
        if close >= peak {
            peak = close;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - close) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(returns: &[f64], daily_rf: f64) -> (f64, f64) {
    if returns.is_empty() {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let (mean, stddev) = mean_and_stddev(returns);
    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside_sq / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
