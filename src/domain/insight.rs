//! Rule-based insight scorer.
//!
//! Each rule that fires contributes a weighted bullish or bearish [`Signal`].
//! The score is the signed weight total normalised to [-100, 100].

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorSeries, IndicatorType, IndicatorValue, compute_indicators,
};

const RSI: IndicatorType = IndicatorType::Rsi(14);
const SMA_SHORT: IndicatorType = IndicatorType::Sma(20);
const SMA_LONG: IndicatorType = IndicatorType::Sma(50);
const MACD: IndicatorType = IndicatorType::Macd {
    fast: 12,
    slow: 26,
    signal: 9,
};
const BOLLINGER: IndicatorType = IndicatorType::Bollinger {
    period: 20,
    stddev_mult_x100: 200,
};

/// Indicators the scorer reads.
pub const INSIGHT_INDICATORS: [IndicatorType; 5] = [RSI, SMA_SHORT, SMA_LONG, MACD, BOLLINGER];

const MOMENTUM_LOOKBACK: usize = 5;
const MOMENTUM_THRESHOLD: f64 = 0.02;
const SENTIMENT_THRESHOLD: f64 = 20.0;
const MAX_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub name: &'static str,
    pub weight: u32,
    pub bullish: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Neutral,
    Bearish,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Bullish => f.write_str("bullish"),
            Sentiment::Neutral => f.write_str("neutral"),
            Sentiment::Bearish => f.write_str("bearish"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub sentiment: Sentiment,
    pub score: f64,
    pub confidence: f64,
    pub signals: Vec<Signal>,
    pub summary: String,
}

impl Insight {
    /// Scores `candles`, computing the indicators it needs.
    pub fn evaluate(candles: &[Candle]) -> Self {
        let indicators = compute_indicators(candles, &INSIGHT_INDICATORS);
        Self::from_indicators(candles, &indicators)
    }

    /// Scores `candles` against already computed indicator series.
    ///
    /// Rules whose indicator is missing from the map or still warming up do not fire.
    pub fn from_indicators(
        candles: &[Candle],
        indicators: &HashMap<IndicatorType, IndicatorSeries>,
    ) -> Self {
        Self::from_signals(collect_signals(candles, indicators))
    }

    pub fn from_signals(signals: Vec<Signal>) -> Self {
        let total: u32 = signals.iter().map(|s| s.weight).sum();
        let signed: i64 = signals
            .iter()
            .map(|s| if s.bullish { s.weight as i64 } else { -(s.weight as i64) })
            .sum();

        let score = if total > 0 {
            100.0 * signed as f64 / total as f64
        } else {
            0.0
        };

        let sentiment = if score >= SENTIMENT_THRESHOLD {
            Sentiment::Bullish
        } else if score <= -SENTIMENT_THRESHOLD {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        };

        let base = match signals.len() {
            0..=2 => 0.4,
            3..=4 => 0.6,
            _ => 0.8,
        };
        let confidence = (0.6 * base + 0.4 * score.abs() / 100.0).min(MAX_CONFIDENCE);

        let summary = if signals.is_empty() {
            "Insufficient data for insight".to_string()
        } else {
            signals
                .iter()
                .map(|s| format!("{}{}", if s.bullish { '+' } else { '-' }, s.name))
                .collect::<Vec<_>>()
                .join(", ")
        };

        Insight {
            sentiment,
            score,
            confidence,
            signals,
            summary,
        }
    }
}

fn latest(
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
    key: &IndicatorType,
) -> Option<IndicatorValue> {
    indicators.get(key).and_then(IndicatorSeries::latest)
}

fn collect_signals(
    candles: &[Candle],
    indicators: &HashMap<IndicatorType, IndicatorSeries>,
) -> Vec<Signal> {
    let mut signals = Vec::new();
    let Some(close) = candles.last().map(|c| c.close) else {
        return signals;
    };

    if let Some(IndicatorValue::Simple(rsi)) = latest(indicators, &RSI) {
        if rsi < 30.0 {
            signals.push(Signal {
                name: "RSI oversold",
                weight: 2,
                bullish: true,
            });
        } else if rsi > 70.0 {
            signals.push(Signal {
                name: "RSI overbought",
                weight: 2,
                bullish: false,
            });
        }
    }

    if let Some(series) = indicators.get(&MACD) {
        let histograms = series.last_two().map(|(prev, last)| match (prev, last) {
            (
                IndicatorValue::Macd { histogram: p, .. },
                IndicatorValue::Macd { histogram: l, .. },
            ) => (Some(p), l),
            _ => (None, 0.0),
        });
        let histograms = histograms.or_else(|| match series.latest() {
            Some(IndicatorValue::Macd { histogram, .. }) => Some((None, histogram)),
            _ => None,
        });

        if let Some((prev, last)) = histograms {
            match prev {
                Some(p) if p <= 0.0 && last > 0.0 => signals.push(Signal {
                    name: "MACD bullish crossover",
                    weight: 3,
                    bullish: true,
                }),
                Some(p) if p >= 0.0 && last < 0.0 => signals.push(Signal {
                    name: "MACD bearish crossover",
                    weight: 3,
                    bullish: false,
                }),
                _ if last > 0.0 => signals.push(Signal {
                    name: "MACD positive",
                    weight: 2,
                    bullish: true,
                }),
                _ if last < 0.0 => signals.push(Signal {
                    name: "MACD negative",
                    weight: 2,
                    bullish: false,
                }),
                _ => {}
            }
        }
    }

    let sma_short = match latest(indicators, &SMA_SHORT) {
        Some(IndicatorValue::Simple(v)) => Some(v),
        _ => None,
    };
    if let Some(sma) = sma_short {
        if close > sma {
            signals.push(Signal {
                name: "price above SMA(20)",
                weight: 1,
                bullish: true,
            });
        } else if close < sma {
            signals.push(Signal {
                name: "price below SMA(20)",
                weight: 1,
                bullish: false,
            });
        }
    }

    if let (Some(short), Some(IndicatorValue::Simple(long))) =
        (sma_short, latest(indicators, &SMA_LONG))
    {
        if short > long {
            signals.push(Signal {
                name: "SMA(20) above SMA(50)",
                weight: 2,
                bullish: true,
            });
        } else if short < long {
            signals.push(Signal {
                name: "SMA(20) below SMA(50)",
                weight: 2,
                bullish: false,
            });
        }
    }

    if let Some(IndicatorValue::Bollinger { upper, lower, .. }) = latest(indicators, &BOLLINGER) {
        if close < lower {
            signals.push(Signal {
                name: "price below lower band",
                weight: 2,
                bullish: true,
            });
        } else if close > upper {
            signals.push(Signal {
                name: "price above upper band",
                weight: 2,
                bullish: false,
            });
        }
    }

    if candles.len() > MOMENTUM_LOOKBACK {
        let base = candles[candles.len() - 1 - MOMENTUM_LOOKBACK].close;
        if base > 0.0 {
            let momentum = (close - base) / base;
            if momentum > MOMENTUM_THRESHOLD {
                signals.push(Signal {
                    name: "positive momentum",
                    weight: 1,
                    bullish: true,
                });
            } else if momentum < -MOMENTUM_THRESHOLD {
                signals.push(Signal {
                    name: "negative momentum",
                    weight: 1,
                    bullish: false,
                });
            }
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;
    use approx::assert_relative_eq;

    fn signal(weight: u32, bullish: bool) -> Signal {
        Signal {
            name: "test",
            weight,
            bullish,
        }
    }

    #[test]
    fn no_signals_is_neutral() {
        let insight = Insight::from_signals(Vec::new());
        assert_eq!(insight.sentiment, Sentiment::Neutral);
        assert_eq!(insight.score, 0.0);
        assert_relative_eq!(insight.confidence, 0.24, epsilon = 1e-12);
        assert_eq!(insight.summary, "Insufficient data for insight");
    }

    #[test]
    fn score_is_normalised_signed_weight() {
        let insight =
            Insight::from_signals(vec![signal(2, true), signal(1, false), signal(1, true)]);
        // (2 - 1 + 1) / 4
        assert_relative_eq!(insight.score, 50.0, epsilon = 1e-12);
        assert_eq!(insight.sentiment, Sentiment::Bullish);
        assert_relative_eq!(insight.confidence, 0.6 * 0.6 + 0.4 * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn sentiment_thresholds() {
        // 2 bullish of weight 3 vs 2 bearish of weight 2 -> 100 * 2 / 10 = 20
        let at_threshold = Insight::from_signals(vec![
            signal(3, true),
            signal(3, true),
            signal(2, false),
            signal(2, false),
        ]);
        assert_relative_eq!(at_threshold.score, 20.0, epsilon = 1e-12);
        assert_eq!(at_threshold.sentiment, Sentiment::Bullish);

        let bearish = Insight::from_signals(vec![signal(1, false)]);
        assert_eq!(bearish.sentiment, Sentiment::Bearish);
        assert_relative_eq!(bearish.score, -100.0, epsilon = 1e-12);
    }

    #[test]
    fn confidence_is_capped() {
        let signals = (0..6).map(|_| signal(1, true)).collect();
        let insight = Insight::from_signals(signals);
        // 0.6 * 0.8 + 0.4 = 0.88
        assert_relative_eq!(insight.confidence, 0.88, epsilon = 1e-12);
        assert!(insight.confidence <= 0.95);
    }

    #[test]
    fn summary_prefixes_direction() {
        let insight = Insight::from_signals(vec![
            Signal {
                name: "RSI oversold",
                weight: 2,
                bullish: true,
            },
            Signal {
                name: "MACD negative",
                weight: 2,
                bullish: false,
            },
        ]);
        assert_eq!(insight.summary, "+RSI oversold, -MACD negative");
        assert_eq!(insight.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn empty_candles_have_no_signals() {
        let insight = Insight::evaluate(&[]);
        assert!(insight.signals.is_empty());
    }

    #[test]
    fn steady_uptrend_is_bullish() {
        let prices: Vec<f64> = (0..80).map(|i| 100.0 + 0.05 * (i * i) as f64).collect();
        let insight = Insight::evaluate(&make_candles(&prices));

        let names: Vec<&str> = insight.signals.iter().map(|s| s.name).collect();
        assert!(names.contains(&"RSI overbought"));
        assert!(names.contains(&"price above SMA(20)"));
        assert!(names.contains(&"SMA(20) above SMA(50)"));
        assert!(names.contains(&"positive momentum"));
        assert!(names.contains(&"MACD positive"));
        assert_eq!(insight.sentiment, Sentiment::Bullish);
    }

    #[test]
    fn steady_downtrend_is_bearish() {
        let prices: Vec<f64> = (0..80).map(|i| 400.0 - 0.05 * (i * i) as f64).collect();
        let insight = Insight::evaluate(&make_candles(&prices));
        assert!(insight.signals.iter().any(|s| s.name == "RSI oversold"));
        assert_eq!(insight.sentiment, Sentiment::Bearish);
        assert!(insight.score < 0.0);
    }

    #[test]
    fn short_history_uses_only_momentum() {
        let insight = Insight::evaluate(&make_candles(&[100.0, 100.0, 100.0, 100.0, 100.0, 110.0]));
        assert_eq!(insight.signals.len(), 1);
        assert_eq!(insight.signals[0].name, "positive momentum");
    }

    fn macd_series(histograms: &[f64]) -> IndicatorSeries {
        let candles = make_candles(&vec![100.0; histograms.len()]);
        IndicatorSeries {
            indicator_type: MACD,
            values: candles
                .iter()
                .zip(histograms)
                .map(|(c, &h)| crate::domain::indicator::IndicatorPoint {
                    time: c.time,
                    valid: true,
                    value: IndicatorValue::Macd {
                        line: h,
                        signal: 0.0,
                        histogram: h,
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn macd_crossover_weighs_three() {
        let candles = make_candles(&[100.0, 100.0]);
        let mut indicators = HashMap::new();

        indicators.insert(MACD, macd_series(&[-0.5, 0.25]));
        let up = Insight::from_indicators(&candles, &indicators);
        assert_eq!(
            up.signals,
            vec![Signal {
                name: "MACD bullish crossover",
                weight: 3,
                bullish: true
            }]
        );

        indicators.insert(MACD, macd_series(&[0.5, -0.25]));
        let down = Insight::from_indicators(&candles, &indicators);
        assert_eq!(down.signals[0].name, "MACD bearish crossover");
        assert!(!down.signals[0].bullish);

        indicators.insert(MACD, macd_series(&[0.5, 0.25]));
        let held = Insight::from_indicators(&candles, &indicators);
        assert_eq!(
            held.signals,
            vec![Signal {
                name: "MACD positive",
                weight: 2,
                bullish: true
            }]
        );
    }

    #[test]
    fn macd_single_valid_point_uses_sign() {
        let candles = make_candles(&[100.0]);
        let mut indicators = HashMap::new();
        indicators.insert(MACD, macd_series(&[-1.0]));
        let insight = Insight::from_indicators(&candles, &indicators);
        assert_eq!(insight.signals[0].name, "MACD negative");
    }
}
