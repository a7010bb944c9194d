//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//!
//! Every series has one point per input candle. Points inside the warm-up
//! window carry `valid = false`.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::candle::{Candle, serialize_time};
use crate::domain::error::StockdashError;

/// Largest period accepted when parsing an indicator spec.
pub const MAX_PERIOD: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorPoint {
    #[serde(serialize_with = "serialize_time")]
    pub time: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    /// The headline number of the value: the line for MACD, the middle band for Bollinger.
    pub fn primary(&self) -> f64 {
        match *self {
            IndicatorValue::Simple(v) => v,
            IndicatorValue::Macd { line, .. } => line,
            IndicatorValue::Bollinger { middle, .. } => middle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl IndicatorType {
    /// Number of leading candles for which the indicator is undefined.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma(n) | IndicatorType::Ema(n) => n.saturating_sub(1),
            IndicatorType::Rsi(n) => n,
            IndicatorType::Macd { slow, signal, .. } => slow
                .saturating_sub(1)
                .saturating_add(signal.saturating_sub(1)),
            IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
        }
    }

    pub fn compute(&self, candles: &[Candle]) -> IndicatorSeries {
        match *self {
            IndicatorType::Sma(n) => calculate_sma(candles, n),
            IndicatorType::Ema(n) => calculate_ema(candles, n),
            IndicatorType::Rsi(n) => calculate_rsi(candles, n),
            IndicatorType::Macd { fast, slow, signal } => {
                calculate_macd(candles, fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => calculate_bollinger(candles, period, stddev_mult_x100),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSeries {
    #[serde(rename = "indicator", serialize_with = "serialize_display")]
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Most recent valid value, if any.
    pub fn latest(&self) -> Option<IndicatorValue> {
        self.values.iter().rev().find(|p| p.valid).map(|p| p.value)
    }

    /// The last two valid values as (previous, latest).
    pub fn last_two(&self) -> Option<(IndicatorValue, IndicatorValue)> {
        let mut valid = self.values.iter().rev().filter(|p| p.valid);
        let latest = valid.next()?;
        let previous = valid.next()?;
        Some((previous.value, latest.value))
    }
}

fn serialize_display<S>(value: &IndicatorType, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(value)
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

impl FromStr for IndicatorType {
    type Err = StockdashError;

    /// Parses `SMA(20)`, `EMA(12)`, `RSI(14)`, `MACD(12,26,9)` and
    /// `BOLLINGER(20,2)`. Names are case-insensitive; a bare name uses the
    /// conventional defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        let invalid = |reason: &str| StockdashError::InvalidIndicator {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let (name, args) = match spec.find('(') {
            Some(open) => {
                let inner = spec[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("missing closing parenthesis"))?;
                (&spec[..open], Some(inner))
            }
            None => (spec, None),
        };

        let args: Vec<&str> = match args {
            Some(inner) => inner.split(',').map(str::trim).collect(),
            None => Vec::new(),
        };

        let period = |idx: usize, default: usize| -> Result<usize, StockdashError> {
            match args.get(idx) {
                None => Ok(default),
                Some(raw) => match raw.parse::<usize>() {
                    Ok(0) => Err(invalid("period must be positive")),
                    Ok(n) if n > MAX_PERIOD => {
                        Err(invalid(&format!("period must be at most {MAX_PERIOD}")))
                    }
                    Ok(n) => Ok(n),
                    Err(_) => Err(invalid("period must be an integer")),
                },
            }
        };

        let max_args = match name.trim().to_ascii_uppercase().as_str() {
            "SMA" | "EMA" | "RSI" => 1,
            "MACD" => 3,
            "BOLLINGER" | "BB" => 2,
            _ => return Err(invalid("unknown indicator")),
        };
        if args.len() > max_args {
            return Err(invalid("too many arguments"));
        }

        match name.trim().to_ascii_uppercase().as_str() {
            "SMA" => Ok(IndicatorType::Sma(period(0, 20)?)),
            "EMA" => Ok(IndicatorType::Ema(period(0, 20)?)),
            "RSI" => Ok(IndicatorType::Rsi(period(0, 14)?)),
            "MACD" => {
                let fast = period(0, macd::DEFAULT_FAST)?;
                let slow = period(1, macd::DEFAULT_SLOW)?;
                let signal = period(2, macd::DEFAULT_SIGNAL)?;
                if fast >= slow {
                    return Err(invalid("fast period must be shorter than slow period"));
                }
                Ok(IndicatorType::Macd { fast, slow, signal })
            }
            _ => {
                let period = period(0, bollinger::DEFAULT_PERIOD)?;
                let mult = match args.get(1) {
                    None => bollinger::DEFAULT_MULT_X100,
                    Some(raw) => {
                        let mult: f64 = raw
                            .parse()
                            .map_err(|_| invalid("multiplier must be a number"))?;
                        if !mult.is_finite() || mult <= 0.0 || mult > 10.0 {
                            return Err(invalid("multiplier must be in (0, 10]"));
                        }
                        let x100 = (mult * 100.0).round() as u32;
                        if x100 == 0 {
                            return Err(invalid("multiplier rounds to zero"));
                        }
                        x100
                    }
                };
                Ok(IndicatorType::Bollinger {
                    period,
                    stddev_mult_x100: mult,
                })
            }
        }
    }
}

/// Parses a comma-separated list such as `SMA(20),MACD(12,26,9)`.
///
/// Commas inside parentheses belong to the indicator arguments.
pub fn parse_indicator_list(list: &str) -> Result<Vec<IndicatorType>, StockdashError> {
    let mut specs = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in list.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                specs.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    specs.push(&list[start..]);

    let mut types: Vec<IndicatorType> = Vec::new();
    for spec in specs.into_iter().filter(|s| !s.trim().is_empty()) {
        let parsed = spec.parse::<IndicatorType>()?;
        if !types.contains(&parsed) {
            types.push(parsed);
        }
    }
    Ok(types)
}

/// Computes each distinct requested indicator once.
pub fn compute_indicators(
    candles: &[Candle],
    types: &[IndicatorType],
) -> HashMap<IndicatorType, IndicatorSeries> {
    let mut out = HashMap::with_capacity(types.len());
    for indicator_type in types {
        if !out.contains_key(indicator_type) {
            out.insert(indicator_type.clone(), indicator_type.compute(candles));
        }
    }
    out
}

/// Unwraps `Simple` values for indicators built on top of others, using 0.0 for warmup points.
pub(crate) fn raw_values(series: &IndicatorSeries) -> Vec<f64> {
    series
        .values
        .iter()
        .map(|p| match p.value {
            IndicatorValue::Simple(v) => v,
            _ => 0.0,
        })
        .collect()
}
