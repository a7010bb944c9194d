//! Dashboard analysis bundle for one ticker.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::candle::{Candle, closes, serialize_time};
use crate::domain::error::StockdashError;
use crate::domain::forecast::Forecast;
use crate::domain::indicator::{IndicatorType, IndicatorValue, compute_indicators};
use crate::domain::insight::Insight;
use crate::domain::risk::RiskMetrics;

pub const DEFAULT_INDICATORS: [IndicatorType; 7] = [
    IndicatorType::Sma(20),
    IndicatorType::Sma(50),
    IndicatorType::Ema(12),
    IndicatorType::Ema(26),
    IndicatorType::Rsi(14),
    IndicatorType::Macd {
        fast: 12,
        slow: 26,
        signal: 9,
    },
    IndicatorType::Bollinger {
        period: 20,
        stddev_mult_x100: 200,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    pub risk_free_rate: f64,
    pub var_confidence: f64,
    pub forecast_days: usize,
    pub forecast_lookback: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            risk_free_rate: 0.02,
            var_confidence: 0.95,
            forecast_days: 7,
            forecast_lookback: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub ticker: String,
    pub candles: usize,
    #[serde(serialize_with = "serialize_time")]
    pub from: NaiveDateTime,
    #[serde(serialize_with = "serialize_time")]
    pub to: NaiveDateTime,
    pub last_close: f64,
    /// Latest valid value per indicator, keyed by display name. Indicators
    /// still warming up are absent.
    pub indicators: BTreeMap<String, IndicatorValue>,
    pub risk: RiskMetrics,
    pub insight: Insight,
    pub forecast: Option<Forecast>,
}

impl Analysis {
    pub fn build(
        ticker: &str,
        candles: &[Candle],
        params: &AnalysisParams,
    ) -> Result<Self, StockdashError> {
        let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
            return Err(insufficient(ticker, 0));
        };
        if candles.len() < 2 {
            return Err(insufficient(ticker, candles.len()));
        }

        let series = compute_indicators(candles, &DEFAULT_INDICATORS);
        let indicators = series
            .iter()
            .filter_map(|(t, s)| s.latest().map(|v| (t.to_string(), v)))
            .collect();

        let close_prices = closes(candles);
        let risk = RiskMetrics::compute(
            &close_prices,
            params.risk_free_rate,
            params.var_confidence,
        );
        let insight = Insight::from_indicators(candles, &series);
        let forecast = Forecast::linear(
            ticker,
            &close_prices,
            params.forecast_lookback,
            params.forecast_days,
        )
        .ok();

        Ok(Analysis {
            ticker: ticker.to_string(),
            candles: candles.len(),
            from: first.time,
            to: last.time,
            last_close: last.close,
            indicators,
            risk,
            insight,
            forecast,
        })
    }
}

fn insufficient(ticker: &str, candles: usize) -> StockdashError {
    StockdashError::InsufficientData {
        ticker: ticker.to_string(),
        candles,
        minimum: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    #[test]
    fn rejects_fewer_than_two_candles() {
        let params = AnalysisParams::default();
        assert!(matches!(
            Analysis::build("AAPL", &[], &params),
            Err(StockdashError::InsufficientData { candles: 0, .. })
        ));
        assert!(matches!(
            Analysis::build("AAPL", &make_candles(&[1.0]), &params),
            Err(StockdashError::InsufficientData { candles: 1, .. })
        ));
    }

    #[test]
    fn short_history_has_no_warm_indicators() {
        let candles = make_candles(&[10.0, 11.0, 12.0]);
        let analysis = Analysis::build("AAPL", &candles, &AnalysisParams::default()).unwrap();
        assert!(analysis.indicators.is_empty());
        assert_eq!(analysis.candles, 3);
        assert_eq!(analysis.last_close, 12.0);
        assert_eq!(analysis.forecast.as_ref().unwrap().predictions.len(), 7);
    }

    #[test]
    fn full_history_has_every_indicator() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();
        let analysis =
            Analysis::build("MSFT", &make_candles(&prices), &AnalysisParams::default()).unwrap();

        for name in [
            "SMA(20)",
            "SMA(50)",
            "EMA(12)",
            "EMA(26)",
            "RSI(14)",
            "MACD(12,26,9)",
            "BOLLINGER(20,2)",
        ] {
            assert!(analysis.indicators.contains_key(name), "missing {name}");
        }
        assert!(analysis.risk.volatility > 0.0);
        assert!(!analysis.insight.signals.is_empty());
    }

    #[test]
    fn bad_forecast_params_leave_forecast_empty() {
        let params = AnalysisParams {
            forecast_days: 0,
            ..AnalysisParams::default()
        };
        let analysis = Analysis::build("AAPL", &make_candles(&[1.0, 2.0]), &params).unwrap();
        assert!(analysis.forecast.is_none());
    }

    #[test]
    fn serializes_for_the_dashboard() {
        let analysis =
            Analysis::build("AAPL", &make_candles(&[1.0, 2.0]), &AnalysisParams::default())
                .unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["from"], "2024-01-01 00:00");
        assert_eq!(json["insight"]["sentiment"], "neutral");
    }
}
