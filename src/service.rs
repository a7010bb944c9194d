//! Dashboard use cases shared by the CLI and the web API.
//!
//! History is loaded from the backend first; successful fetches are written
//! through to the candle cache, and the cache answers when the backend fails
//! or returns nothing.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::alert::{Alert, NewAlert};
use crate::domain::analysis::{Analysis, AnalysisParams};
use crate::domain::candle::{Candle, closes};
use crate::domain::error::StockdashError;
use crate::domain::forecast::Forecast;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, compute_indicators};
use crate::domain::sentiment::{NewsArticle, NewsSentiment, SentimentLabel};
use crate::domain::timeframe::{Interval, Period, normalize_ticker};
use crate::domain::watchlist::WatchlistEntry;
use crate::ports::cache_port::CandleCache;
use crate::ports::market_port::{
    AlertCreated, BackendMessage, ChatReply, ChatRequest, MarketDataPort,
};

/// Where a history series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistorySource {
    Backend,
    Cache,
}

#[derive(Debug, Clone)]
pub struct History {
    pub ticker: String,
    pub source: HistorySource,
    pub candles: Vec<Candle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorReport {
    pub ticker: String,
    pub source: HistorySource,
    pub candles: usize,
    pub series: Vec<IndicatorSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub ticker: String,
    pub days: usize,
    pub last_price: f64,
    pub predictions: Vec<f64>,
    pub slope: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsReport {
    pub ticker: String,
    pub overall: SentimentLabel,
    pub sentiment: NewsSentiment,
    pub articles: Vec<NewsArticle>,
}

pub struct DashboardService {
    market: Arc<dyn MarketDataPort>,
    cache: Option<Arc<dyn CandleCache>>,
    params: AnalysisParams,
}

impl DashboardService {
    pub fn new(
        market: Arc<dyn MarketDataPort>,
        cache: Option<Arc<dyn CandleCache>>,
        params: AnalysisParams,
    ) -> Self {
        Self {
            market,
            cache,
            params,
        }
    }

    /// Loads history, falling back to the cache.
    ///
    /// When the backend fails and the cache has nothing, the backend error is
    /// returned; when both are simply empty the result is `NoData`.
    pub async fn history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<History, StockdashError> {
        let ticker = normalize_ticker(ticker)?;

        let backend_error = match self.market.fetch_history(&ticker, period, interval).await {
            Ok(candles) if !candles.is_empty() => {
                self.write_through(&ticker, interval, &candles);
                return Ok(History {
                    ticker,
                    source: HistorySource::Backend,
                    candles,
                });
            }
            Ok(_) => {
                info!(ticker = %ticker, "backend returned no history, trying cache");
                None
            }
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "backend history failed, trying cache");
                Some(e)
            }
        };

        let cached = self.load_cached(&ticker, period, interval)?;
        if !cached.is_empty() {
            info!(ticker = %ticker, candles = cached.len(), "serving history from cache");
            return Ok(History {
                ticker,
                source: HistorySource::Cache,
                candles: cached,
            });
        }

        Err(backend_error.unwrap_or(StockdashError::NoData { ticker }))
    }

    fn write_through(&self, ticker: &str, interval: Interval, candles: &[Candle]) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.store_candles(ticker, interval, candles) {
            Ok(n) => debug!(ticker, stored = n, "cached history"),
            Err(e) => warn!(ticker, error = %e, "failed to cache history"),
        }
    }

    /// Cached candles covering `period`, measured back from the newest cached candle.
    fn load_cached(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Candle>, StockdashError> {
        let Some(cache) = &self.cache else {
            return Ok(Vec::new());
        };
        let Some((_, last, _)) = cache.cached_range(ticker, interval)? else {
            debug!(ticker, "cache miss");
            return Ok(Vec::new());
        };
        let from = match period {
            Period::Max => None,
            _ => Some(last - Duration::days(period.days())),
        };
        cache.load_candles(ticker, interval, from, None)
    }

    pub async fn indicators(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
        types: &[IndicatorType],
    ) -> Result<IndicatorReport, StockdashError> {
        let history = self.history(ticker, period, interval).await?;
        let mut computed = compute_indicators(&history.candles, types);
        let series = types
            .iter()
            .filter_map(|t| computed.remove(t))
            .collect();
        Ok(IndicatorReport {
            ticker: history.ticker,
            source: history.source,
            candles: history.candles.len(),
            series,
        })
    }

    pub async fn analysis(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Analysis, StockdashError> {
        let history = self.history(ticker, period, interval).await?;
        Analysis::build(&history.ticker, &history.candles, &self.params)
    }

    /// Daily-close forecast; `days` defaults to the configured horizon.
    pub async fn predict(
        &self,
        ticker: &str,
        days: Option<usize>,
    ) -> Result<Prediction, StockdashError> {
        let days = days.unwrap_or(self.params.forecast_days);
        let history = self
            .history(ticker, Period::SixMonths, Interval::OneDay)
            .await?;
        let forecast = Forecast::linear(
            &history.ticker,
            &closes(&history.candles),
            self.params.forecast_lookback,
            days,
        )?;
        Ok(Prediction {
            ticker: history.ticker,
            days,
            last_price: forecast.last_price,
            predictions: forecast.predictions,
            slope: forecast.slope,
            r_squared: forecast.r_squared,
        })
    }

    pub async fn news(&self, ticker: &str, refresh: bool) -> Result<NewsReport, StockdashError> {
        let ticker = normalize_ticker(ticker)?;
        let mut articles = self.market.fetch_news(&ticker, refresh).await?;
        let sentiment = NewsSentiment::aggregate(&mut articles);
        debug!(ticker = %ticker, articles = articles.len(), "scored news");
        Ok(NewsReport {
            ticker,
            overall: sentiment.overall(),
            sentiment,
            articles,
        })
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, StockdashError> {
        if request.message.trim().is_empty() {
            return Err(StockdashError::InvalidParameter {
                name: "message".into(),
                reason: "Message is required".into(),
            });
        }
        let request = ChatRequest {
            ticker: request
                .ticker
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(normalize_ticker)
                .transpose()?,
            ..request
        };
        self.market.send_chat(&request).await
    }

    pub async fn watchlist(&self) -> Result<Vec<WatchlistEntry>, StockdashError> {
        self.market.fetch_watchlist().await
    }

    pub async fn add_to_watchlist(&self, ticker: &str) -> Result<BackendMessage, StockdashError> {
        let ticker = normalize_ticker(ticker)?;
        let reply = self.market.add_to_watchlist(&ticker).await?;
        info!(ticker = %ticker, "added to watchlist");
        Ok(reply)
    }

    pub async fn remove_from_watchlist(
        &self,
        ticker: &str,
    ) -> Result<BackendMessage, StockdashError> {
        let ticker = normalize_ticker(ticker)?;
        let reply = self.market.remove_from_watchlist(&ticker).await?;
        info!(ticker = %ticker, "removed from watchlist");
        Ok(reply)
    }

    pub async fn alerts(&self) -> Result<Vec<Alert>, StockdashError> {
        self.market.fetch_alerts().await
    }

    pub async fn create_alert(
        &self,
        ticker: &str,
        alert_type: &str,
        threshold: Option<f64>,
    ) -> Result<AlertCreated, StockdashError> {
        let alert = NewAlert::parse(ticker, alert_type, threshold)?;
        let created = self.market.create_alert(&alert).await?;
        info!(
            ticker = %alert.ticker,
            alert_type = %alert.alert_type,
            id = created.alert_id,
            "created alert"
        );
        Ok(created)
    }

    pub async fn delete_alert(&self, id: i64) -> Result<BackendMessage, StockdashError> {
        if id <= 0 {
            return Err(StockdashError::InvalidParameter {
                name: "id".into(),
                reason: format!("alert id must be positive, got {id}"),
            });
        }
        self.market.delete_alert(id).await
    }
}
