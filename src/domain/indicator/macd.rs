//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded once the slow EMA is valid
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 candles.

use crate::domain::candle::Candle;
use crate::domain::indicator::ema::ema_over;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, calculate_ema, raw_values,
};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };

    if candles.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let ema_fast = raw_values(&calculate_ema(candles, fast));
    let ema_slow = raw_values(&calculate_ema(candles, slow));
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();

    let macd_warmup = slow - 1;
    let mut signal_line = vec![0.0; candles.len()];
    if candles.len() > macd_warmup {
        let seeded = ema_over(macd_line[macd_warmup..].iter().copied(), signal_period);
        for (offset, value) in seeded.into_iter().enumerate() {
            if let Some(v) = value {
                signal_line[macd_warmup + offset] = v;
            }
        }
    }

    let signal_warmup = macd_warmup.saturating_add(signal_period - 1);
    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let valid = i >= signal_warmup;
            let (line, signal) = if valid {
                (macd_line[i], signal_line[i])
            } else {
                (0.0, 0.0)
            };
            IndicatorPoint {
                time: candle.time,
                valid,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(candles: &[Candle]) -> IndicatorSeries {
    calculate_macd(candles, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
