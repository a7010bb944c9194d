//! Market data port: the dashboard backend's REST surface.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::alert::{Alert, NewAlert};
use crate::domain::candle::Candle;
use crate::domain::error::StockdashError;
use crate::domain::sentiment::NewsArticle;
use crate::domain::timeframe::{Interval, Period};
use crate::domain::watchlist::WatchlistEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Free-form dashboard state forwarded to the assistant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Acknowledgement the backend returns for watchlist and alert writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendMessage {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCreated {
    pub message: String,
    pub alert_id: i64,
}

#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// OHLCV history, oldest first.
    async fn fetch_history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Candle>, StockdashError>;

    /// Latest price per ticker the backend tracks.
    async fn fetch_prices(&self) -> Result<HashMap<String, f64>, StockdashError>;

    async fn fetch_news(
        &self,
        ticker: &str,
        refresh: bool,
    ) -> Result<Vec<NewsArticle>, StockdashError>;

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, StockdashError>;

    async fn fetch_watchlist(&self) -> Result<Vec<WatchlistEntry>, StockdashError>;

    async fn add_to_watchlist(&self, ticker: &str) -> Result<BackendMessage, StockdashError>;

    async fn remove_from_watchlist(
        &self,
        ticker: &str,
    ) -> Result<BackendMessage, StockdashError>;

    /// Every alert the backend holds for the account, active or not.
    async fn fetch_alerts(&self) -> Result<Vec<Alert>, StockdashError>;

    async fn create_alert(&self, alert: &NewAlert) -> Result<AlertCreated, StockdashError>;

    /// Deactivates the alert; the backend keeps the row.
    async fn delete_alert(&self, id: i64) -> Result<BackendMessage, StockdashError>;
}
