//! Price alerts kept by the backend and checked against the live book.
//!
//! `price_above` fires when the last price is at or above the threshold,
//! `price_below` when it is at or below, and `volume_spike` when the quoted
//! volume reaches the threshold.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::candle::serialize_time;
use crate::domain::error::StockdashError;
use crate::domain::quote::LiveBook;
use crate::domain::timeframe::normalize_ticker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PriceAbove,
    PriceBelow,
    VolumeSpike,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PriceAbove => "price_above",
            AlertKind::PriceBelow => "price_below",
            AlertKind::VolumeSpike => "volume_spike",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = StockdashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "price_above" => Ok(AlertKind::PriceAbove),
            "price_below" => Ok(AlertKind::PriceBelow),
            "volume_spike" => Ok(AlertKind::VolumeSpike),
            _ => Err(StockdashError::InvalidParameter {
                name: "alert_type".into(),
                reason: format!(
                    "unknown alert type {s:?} (expected price_above, price_below or volume_spike)"
                ),
            }),
        }
    }
}

/// An alert row as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub ticker: String,
    pub alert_type: AlertKind,
    pub threshold_value: f64,
    #[serde(default = "active", deserialize_with = "flag")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn active() -> bool {
    true
}

/// sqlite hands booleans back as 0/1.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}

impl Alert {
    /// The observed value when the ticker's quote crosses the threshold.
    pub fn triggered_by(&self, book: &LiveBook) -> Option<(f64, NaiveDateTime)> {
        if !self.is_active {
            return None;
        }
        let quote = book.quote(&self.ticker.to_ascii_uppercase())?;
        let (value, hit) = match self.alert_type {
            AlertKind::PriceAbove => (quote.price, quote.price >= self.threshold_value),
            AlertKind::PriceBelow => (quote.price, quote.price <= self.threshold_value),
            AlertKind::VolumeSpike => {
                let volume = quote.volume as f64;
                (volume, quote.volume > 0 && volume >= self.threshold_value)
            }
        };
        hit.then_some((value, quote.updated_at))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggeredAlert {
    pub alert: Alert,
    pub value: f64,
    #[serde(serialize_with = "serialize_time")]
    pub at: NaiveDateTime,
}

/// Every active alert in `alerts` that the current book crosses.
pub fn check_alerts(alerts: &[Alert], book: &LiveBook) -> Vec<TriggeredAlert> {
    alerts
        .iter()
        .filter_map(|alert| {
            alert.triggered_by(book).map(|(value, at)| TriggeredAlert {
                alert: alert.clone(),
                value,
                at,
            })
        })
        .collect()
}

/// A validated request to create an alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAlert {
    pub ticker: String,
    pub alert_type: AlertKind,
    pub threshold: f64,
}

impl NewAlert {
    pub fn parse(
        ticker: &str,
        alert_type: &str,
        threshold: Option<f64>,
    ) -> Result<Self, StockdashError> {
        let ticker = normalize_ticker(ticker)?;
        let alert_type = alert_type.parse()?;
        let threshold = threshold
            .filter(|t| t.is_finite() && *t > 0.0)
            .ok_or_else(|| StockdashError::InvalidParameter {
                name: "threshold".into(),
                reason: "threshold must be a positive number".into(),
            })?;
        Ok(NewAlert {
            ticker,
            alert_type,
            threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    fn book() -> LiveBook {
        let mut book = LiveBook::new(vec!["AAPL".into(), "TSLA".into()]);
        book.apply("AAPL", 190.0, Some(5_000), at()).unwrap();
        book.apply("TSLA", 250.0, None, at()).unwrap();
        book
    }

    fn alert(id: i64, ticker: &str, alert_type: AlertKind, threshold: f64) -> Alert {
        Alert {
            id,
            ticker: ticker.into(),
            alert_type,
            threshold_value: threshold,
            is_active: true,
            created_at: None,
        }
    }

    fn fires(alert: Alert, book: &LiveBook) -> bool {
        alert.triggered_by(book).is_some()
    }

    #[test]
    fn kind_parses_backend_names() {
        let kind = |s: &str| s.parse::<AlertKind>();
        assert_eq!(kind("price_above").unwrap(), AlertKind::PriceAbove);
        assert_eq!(kind(" Price_Below ").unwrap(), AlertKind::PriceBelow);
        assert_eq!(AlertKind::VolumeSpike.to_string(), "volume_spike");
        assert!(kind("price").is_err());
    }

    #[test]
    fn deserializes_sqlite_row() {
        let json = r#"{"id": 7, "user_id": 1, "ticker": "AAPL", "alert_type": "price_below",
            "threshold_value": 180.5, "is_active": 1, "created_at": "2024-06-03 10:00:00",
            "triggered_at": null}"#;
        let alert: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.id, 7);
        assert_eq!(alert.alert_type, AlertKind::PriceBelow);
        assert!(alert.is_active);
        assert_eq!(alert.created_at.as_deref(), Some("2024-06-03 10:00:00"));

        let inactive: Alert = serde_json::from_str(
            r#"{"id": 8, "ticker": "AAPL", "alert_type": "price_above",
                "threshold_value": 1, "is_active": false}"#,
        )
        .unwrap();
        assert!(!inactive.is_active);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let book = book();
        assert_eq!(
            alert(1, "AAPL", AlertKind::PriceAbove, 190.0).triggered_by(&book),
            Some((190.0, at()))
        );
        assert!(!fires(alert(2, "AAPL", AlertKind::PriceAbove, 190.01), &book));
        assert!(fires(alert(3, "TSLA", AlertKind::PriceBelow, 250.0), &book));
        assert!(!fires(alert(4, "TSLA", AlertKind::PriceBelow, 249.0), &book));
    }

    #[test]
    fn volume_spike_needs_reported_volume() {
        let book = book();
        assert_eq!(
            alert(1, "AAPL", AlertKind::VolumeSpike, 4_000.0).triggered_by(&book),
            Some((5_000.0, at()))
        );
        assert!(!fires(alert(2, "TSLA", AlertKind::VolumeSpike, 0.5), &book));
    }

    #[test]
    fn unquoted_and_inactive_alerts_never_fire() {
        let book = book();
        assert!(!fires(alert(1, "NVDA", AlertKind::PriceAbove, 1.0), &book));

        let mut inactive = alert(2, "AAPL", AlertKind::PriceAbove, 1.0);
        inactive.is_active = false;
        assert!(!fires(inactive, &book));
    }

    #[test]
    fn check_alerts_keeps_only_hits() {
        let alerts = vec![
            alert(1, "AAPL", AlertKind::PriceAbove, 200.0),
            alert(2, "aapl", AlertKind::PriceBelow, 195.0),
            alert(3, "TSLA", AlertKind::PriceAbove, 240.0),
        ];
        let hits = check_alerts(&alerts, &book());
        let ids: Vec<i64> = hits.iter().map(|h| h.alert.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(hits[1].value, 250.0);
    }

    #[test]
    fn new_alert_validation() {
        let alert = NewAlert::parse("tsla", "price_above", Some(300.0)).unwrap();
        assert_eq!(alert.ticker, "TSLA");
        assert_eq!(alert.alert_type, AlertKind::PriceAbove);

        assert!(matches!(
            NewAlert::parse("", "price_above", Some(1.0)),
            Err(StockdashError::InvalidTicker { .. })
        ));
        assert!(matches!(
            NewAlert::parse("TSLA", "sideways", Some(1.0)),
            Err(StockdashError::InvalidParameter { name, .. }) if name == "alert_type"
        ));
        for threshold in [None, Some(0.0), Some(-3.0), Some(f64::NAN)] {
            assert!(matches!(
                NewAlert::parse("TSLA", "price_below", threshold),
                Err(StockdashError::InvalidParameter { name, .. }) if name == "threshold"
            ));
        }
    }

    #[test]
    fn new_alert_serializes_for_backend() {
        let alert = NewAlert::parse("msft", "volume_spike", Some(1e6)).unwrap();
        let json = serde_json::to_value(alert).unwrap();
        assert_eq!(json["ticker"], "MSFT");
        assert_eq!(json["alert_type"], "volume_spike");
        assert_eq!(json["threshold"], 1e6);
    }
}
