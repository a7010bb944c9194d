//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) candles are invalid.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

pub fn calculate_bollinger(
    candles: &[Candle],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());
    let warmup = period.saturating_sub(1);
    let mult = stddev_mult_x100 as f64 / 100.0;

    for (i, candle) in candles.iter().enumerate() {
        let valid = period > 0 && i >= warmup;

        let (upper, middle, lower) = if valid {
            let window = &candles[i + 1 - period..=i];
            let middle = window.iter().map(|c| c.close).sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|c| {
                    let diff = c.close - middle;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            let width = mult * variance.sqrt();
            (middle + width, middle, middle - width)
        } else {
            (0.0, 0.0, 0.0)
        };

        values.push(IndicatorPoint {
            time: candle.time,
            valid,
            value: IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    #[test]
    fn bollinger_warmup() {
        let candles = make_candles(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_bollinger(&candles, 3, 200);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[3].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn bollinger_constant_values() {
        let candles = make_candles(&[100.0; 5]);
        let series = calculate_bollinger(&candles, 3, 200);

        if let IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } = series.values[2].value
        {
            assert!((middle - 100.0).abs() < f64::EPSILON);
            assert!((upper - 100.0).abs() < f64::EPSILON);
            assert!((lower - 100.0).abs() < f64::EPSILON);
        } else {
            panic!("Expected Bollinger value");
        }
    }

    #[test]
    fn bollinger_population_stddev() {
        // window [2, 4, 6]: mean 4, population variance 8/3
        let candles = make_candles(&[2.0, 4.0, 6.0]);
        let series = calculate_bollinger(&candles, 3, 200);
        let sd = (8.0f64 / 3.0).sqrt();

        if let IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } = series.values[2].value
        {
            assert!((middle - 4.0).abs() < 1e-10);
            assert!((upper - (4.0 + 2.0 * sd)).abs() < 1e-10);
            assert!((lower - (4.0 - 2.0 * sd)).abs() < 1e-10);
        } else {
            panic!("Expected Bollinger value");
        }
    }

    #[test]
    fn bollinger_fractional_multiplier() {
        let candles = make_candles(&[2.0, 4.0, 6.0]);
        let series = calculate_bollinger(&candles, 3, 150);
        let sd = (8.0f64 / 3.0).sqrt();
        if let IndicatorValue::Bollinger { upper, .. } = series.values[2].value {
            assert!((upper - (4.0 + 1.5 * sd)).abs() < 1e-10);
        }
    }

    #[test]
    fn bollinger_zero_period_all_invalid() {
        let candles = make_candles(&[1.0, 2.0]);
        let series = calculate_bollinger(&candles, 0, 200);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }

    #[test]
    fn bollinger_empty() {
        assert!(calculate_bollinger(&[], 20, 200).values.is_empty());
    }
}
