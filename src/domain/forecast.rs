//! Naive linear-trend price forecast.
//!
//! Fits an ordinary-least-squares line through the most recent closes and
//! extrapolates it forward one step per future candle.

use serde::Serialize;

use crate::domain::error::StockdashError;

pub const MAX_FORECAST_DAYS: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub last_price: f64,
    pub slope: f64,
    pub r_squared: f64,
    pub predictions: Vec<f64>,
}

impl Forecast {
    /// Fits the last `lookback` closes and projects `days` steps ahead.
    ///
    /// Predictions are rounded to cents.
    pub fn linear(
        ticker: &str,
        closes: &[f64],
        lookback: usize,
        days: usize,
    ) -> Result<Self, StockdashError> {
        if !(1..=MAX_FORECAST_DAYS).contains(&days) {
            return Err(StockdashError::InvalidParameter {
                name: "days".into(),
                reason: format!("must be between 1 and {MAX_FORECAST_DAYS}, got {days}"),
            });
        }
        if closes.len() < 2 || lookback < 2 {
            return Err(StockdashError::InsufficientData {
                ticker: ticker.to_string(),
                candles: closes.len(),
                minimum: 2,
            });
        }

        let window = &closes[closes.len().saturating_sub(lookback)..];
        let (intercept, slope, r_squared) = fit_line(window);
        let last_x = (window.len() - 1) as f64;

        let predictions = (1..=days)
            .map(|step| round_cents(intercept + slope * (last_x + step as f64)))
            .collect();

        Ok(Forecast {
            last_price: window[window.len() - 1],
            slope,
            r_squared,
            predictions,
        })
    }
}

/// OLS fit of `y` against x = 0..n, returning (intercept, slope, R²).
fn fit_line(y: &[f64]) -> (f64, f64, f64) {
    let n = y.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, &v) in y.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = v - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;
    // A flat series is fitted perfectly.
    let r_squared = if syy > 0.0 {
        (sxy * sxy) / (sxx * syy)
    } else {
        1.0
    };
    (intercept, slope, r_squared)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
