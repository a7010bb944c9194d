//! Live quote book for the watched tickers.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::domain::candle::serialize_time;
use crate::domain::error::StockdashError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub price: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub volume: i64,
    #[serde(serialize_with = "serialize_time")]
    pub updated_at: NaiveDateTime,
}

impl Quote {
    fn seed(price: f64, volume: Option<i64>, at: NaiveDateTime) -> Self {
        Quote {
            price,
            high: price,
            low: price,
            open: price,
            previous_close: price,
            volume: volume.unwrap_or(0),
            updated_at: at,
        }
    }

    pub fn change(&self) -> f64 {
        self.price - self.previous_close
    }

    /// Percent change against the previous close; 0 when that close is not positive.
    pub fn change_percent(&self) -> f64 {
        if self.previous_close > 0.0 {
            self.change() / self.previous_close * 100.0
        } else {
            0.0
        }
    }
}

/// Latest quote per watched ticker.
#[derive(Debug, Clone, Default)]
pub struct LiveBook {
    watched: Vec<String>,
    quotes: HashMap<String, Quote>,
}

impl LiveBook {
    pub fn new(tickers: Vec<String>) -> Self {
        LiveBook {
            watched: tickers,
            quotes: HashMap::new(),
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.watched
    }

    pub fn is_watched(&self, ticker: &str) -> bool {
        self.watched.iter().any(|t| t == ticker)
    }

    pub fn quote(&self, ticker: &str) -> Option<&Quote> {
        self.quotes.get(ticker)
    }

    /// Records a trade price.
    ///
    /// Returns `Ok(false)` when the ticker is not watched. The first price for
    /// a ticker seeds open, previous close, high and low; later prices extend
    /// the high/low range.
    pub fn apply(
        &mut self,
        ticker: &str,
        price: f64,
        volume: Option<i64>,
        at: NaiveDateTime,
    ) -> Result<bool, StockdashError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(StockdashError::InvalidParameter {
                name: "price".into(),
                reason: format!("{ticker} price must be positive and finite, got {price}"),
            });
        }
        if !self.is_watched(ticker) {
            debug!(ticker, "ignoring price for unwatched ticker");
            return Ok(false);
        }

        match self.quotes.get_mut(ticker) {
            Some(quote) => {
                quote.price = price;
                quote.high = quote.high.max(price);
                quote.low = quote.low.min(price);
                if let Some(v) = volume {
                    quote.volume = v;
                }
                quote.updated_at = at;
            }
            None => {
                self.quotes
                    .insert(ticker.to_string(), Quote::seed(price, volume, at));
            }
        }
        Ok(true)
    }

    /// Applies a `{ticker: price}` snapshot, returning the tickers that changed.
    ///
    /// Invalid prices are skipped and reported at debug level.
    pub fn apply_snapshot(
        &mut self,
        prices: &HashMap<String, f64>,
        at: NaiveDateTime,
    ) -> Vec<String> {
        let mut updated = Vec::new();
        for ticker in &self.watched.clone() {
            let Some(&price) = prices.get(ticker) else {
                continue;
            };
            match self.apply(ticker, price, None, at) {
                Ok(true) => updated.push(ticker.clone()),
                Ok(false) => {}
                Err(e) => debug!(error = %e, "skipping price"),
            }
        }
        updated
    }

    /// `{ticker: price}` for every ticker that has a quote.
    pub fn prices(&self) -> BTreeMap<String, f64> {
        self.quotes
            .iter()
            .map(|(t, q)| (t.clone(), q.price))
            .collect()
    }

    pub fn stats(&self) -> BTreeMap<String, Quote> {
        self.quotes
            .iter()
            .map(|(t, q)| (t.clone(), q.clone()))
            .collect()
    }
}
