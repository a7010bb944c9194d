//! HTTP adapter for the dashboard backend's REST API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::alert::{Alert, NewAlert};
use crate::domain::candle::{Candle, parse_time};
use crate::domain::config_validation::DashboardSettings;
use crate::domain::error::StockdashError;
use crate::domain::sentiment::NewsArticle;
use crate::domain::timeframe::{Interval, Period};
use crate::domain::watchlist::WatchlistEntry;
use crate::ports::market_port::{
    AlertCreated, BackendMessage, ChatReply, ChatRequest, MarketDataPort,
};

pub struct BackendHttpAdapter {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

/// One history row as served by `/api/history/<ticker>`.
#[derive(Debug, Deserialize)]
struct WireCandle {
    time: String,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    open: Option<f64>,
    #[serde(default)]
    high: Option<f64>,
    #[serde(default)]
    low: Option<f64>,
    #[serde(default)]
    close: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
}

impl WireCandle {
    fn into_candle(self) -> Option<Candle> {
        let time = parse_time(&self.time)?;
        let close = self.close.or(self.price)?;
        Some(Candle {
            time,
            open: self.open.unwrap_or(close),
            high: self.high.unwrap_or(close),
            low: self.low.unwrap_or(close),
            close,
            volume: self.volume.map(|v| v.round() as i64).unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn transport_err(e: reqwest::Error) -> StockdashError {
    StockdashError::Backend {
        reason: e.to_string(),
    }
}

impl BackendHttpAdapter {
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StockdashError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_err)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    pub fn from_settings(settings: &DashboardSettings) -> Result<Self, StockdashError> {
        Self::new(
            &settings.base_url,
            settings.access_token.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, StockdashError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(transport_err)?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, StockdashError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(StockdashError::BackendStatus {
                status: status.as_u16(),
                message,
            });
        }
        response.json::<T>().await.map_err(|e| StockdashError::Backend {
            reason: format!("malformed response: {}", e),
        })
    }
}

#[async_trait]
impl MarketDataPort for BackendHttpAdapter {
    async fn fetch_history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Candle>, StockdashError> {
        let request = self
            .client
            .get(self.url(&format!("/api/history/{}", ticker)))
            .query(&[("period", period.as_str()), ("interval", interval.as_str())]);
        let rows: Vec<WireCandle> = self.send(request).await?;

        let total = rows.len();
        let mut candles: Vec<Candle> = rows
            .into_iter()
            .filter_map(WireCandle::into_candle)
            .collect();
        if candles.len() < total {
            warn!(ticker, dropped = total - candles.len(), "skipped malformed history rows");
        }
        candles.sort_by_key(|c| c.time);
        debug!(ticker, %period, %interval, candles = candles.len(), "fetched history");
        Ok(candles)
    }

    async fn fetch_prices(&self) -> Result<HashMap<String, f64>, StockdashError> {
        let request = self.client.get(self.url("/api/prices"));
        self.send(request).await
    }

    async fn fetch_news(
        &self,
        ticker: &str,
        refresh: bool,
    ) -> Result<Vec<NewsArticle>, StockdashError> {
        let request = self
            .client
            .get(self.url(&format!("/api/news/{}", ticker)))
            .query(&[("refresh", if refresh { "true" } else { "false" })]);
        self.send(request).await
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, StockdashError> {
        let request = self.client.post(self.url("/api/chat")).json(request);
        self.send(request).await
    }

    async fn fetch_watchlist(&self) -> Result<Vec<WatchlistEntry>, StockdashError> {
        let request = self.client.get(self.url("/api/watchlist"));
        self.send(request).await
    }

    async fn add_to_watchlist(&self, ticker: &str) -> Result<BackendMessage, StockdashError> {
        let request = self
            .client
            .post(self.url("/api/watchlist"))
            .json(&serde_json::json!({ "ticker": ticker }));
        self.send(request).await
    }

    async fn remove_from_watchlist(
        &self,
        ticker: &str,
    ) -> Result<BackendMessage, StockdashError> {
        let request = self
            .client
            .delete(self.url(&format!("/api/watchlist/{}", ticker)));
        self.send(request).await
    }

    async fn fetch_alerts(&self) -> Result<Vec<Alert>, StockdashError> {
        let request = self.client.get(self.url("/api/alerts"));
        let rows: Vec<serde_json::Value> = self.send(request).await?;

        let total = rows.len();
        let alerts: Vec<Alert> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect();
        if alerts.len() < total {
            warn!(dropped = total - alerts.len(), "skipped malformed alert rows");
        }
        Ok(alerts)
    }

    async fn create_alert(&self, alert: &NewAlert) -> Result<AlertCreated, StockdashError> {
        let request = self.client.post(self.url("/api/alerts")).json(alert);
        self.send(request).await
    }

    async fn delete_alert(&self, id: i64) -> Result<BackendMessage, StockdashError> {
        let request = self.client.delete(self.url(&format!("/api/alerts/{}", id)));
        self.send(request).await
    }
}
