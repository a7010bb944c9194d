//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) candles are invalid.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || candles.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }

    let values = ema_over(candles.iter().map(|c| c.close), period)
        .into_iter()
        .zip(candles)
        .map(|(ema, candle)| IndicatorPoint {
            time: candle.time,
            valid: ema.is_some(),
            value: IndicatorValue::Simple(ema.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

/// SMA-seeded EMA over an arbitrary input stream; `None` during warmup.
pub(crate) fn ema_over<I>(inputs: I, period: usize) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = f64>,
{
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    inputs
        .into_iter()
        .enumerate()
        .map(|(i, x)| {
            if i + 1 < period {
                sum += x;
                None
            } else if i + 1 == period {
                sum += x;
                ema = sum / period as f64;
                Some(ema)
            } else {
                ema = x * k + ema * (1.0 - k);
                Some(ema)
            }
        })
        .collect()
}
