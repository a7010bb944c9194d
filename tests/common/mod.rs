#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Mutex;
use stockdash::domain::alert::{Alert, AlertKind, NewAlert};
use stockdash::domain::candle::Candle;
use stockdash::domain::error::StockdashError;
use stockdash::domain::sentiment::NewsArticle;
use stockdash::domain::timeframe::{Interval, Period};
use stockdash::domain::watchlist::WatchlistEntry;
use stockdash::ports::market_port::{
    AlertCreated, BackendMessage, ChatReply, ChatRequest, MarketDataPort,
};

/// In-memory stand-in for the dashboard backend.
pub struct MockMarketPort {
    pub history: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
    pub prices: HashMap<String, f64>,
    pub news: HashMap<String, Vec<NewsArticle>>,
    pub chat_reply: Option<String>,
    pub watchlist: Mutex<Vec<WatchlistEntry>>,
    pub alerts: Mutex<Vec<Alert>>,
    pub history_calls: Mutex<Vec<(String, Period, Interval)>>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub alert_deletes: Mutex<Vec<i64>>,
}

impl MockMarketPort {
    pub fn new() -> Self {
        Self {
            history: HashMap::new(),
            errors: HashMap::new(),
            prices: HashMap::new(),
            news: HashMap::new(),
            chat_reply: None,
            watchlist: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            history_calls: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
            alert_deletes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_history(mut self, ticker: &str, candles: Vec<Candle>) -> Self {
        self.history.insert(ticker.to_string(), candles);
        self
    }

    /// Every request for `ticker` fails with a backend error.
    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn with_price(mut self, ticker: &str, price: f64) -> Self {
        self.prices.insert(ticker.to_string(), price);
        self
    }

    pub fn with_news(mut self, ticker: &str, articles: Vec<NewsArticle>) -> Self {
        self.news.insert(ticker.to_string(), articles);
        self
    }

    pub fn with_chat_reply(mut self, reply: &str) -> Self {
        self.chat_reply = Some(reply.to_string());
        self
    }

    pub fn with_watchlist(self, tickers: &[&str]) -> Self {
        self.watchlist
            .lock()
            .unwrap()
            .extend(tickers.iter().map(|t| watch_entry(t, 100.0)));
        self
    }

    pub fn with_alert(self, alert: Alert) -> Self {
        self.alerts.lock().unwrap().push(alert);
        self
    }

    fn check(&self, ticker: &str) -> Result<(), StockdashError> {
        match self.errors.get(ticker) {
            Some(reason) => Err(StockdashError::Backend {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MarketDataPort for MockMarketPort {
    async fn fetch_history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Candle>, StockdashError> {
        self.history_calls
            .lock()
            .unwrap()
            .push((ticker.to_string(), period, interval));
        self.check(ticker)?;
        Ok(self.history.get(ticker).cloned().unwrap_or_default())
    }

    async fn fetch_prices(&self) -> Result<HashMap<String, f64>, StockdashError> {
        Ok(self.prices.clone())
    }

    async fn fetch_news(
        &self,
        ticker: &str,
        _refresh: bool,
    ) -> Result<Vec<NewsArticle>, StockdashError> {
        self.check(ticker)?;
        Ok(self.news.get(ticker).cloned().unwrap_or_default())
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, StockdashError> {
        self.chat_requests.lock().unwrap().push(request.clone());
        match &self.chat_reply {
            Some(response) => Ok(ChatReply {
                response: response.clone(),
            }),
            None => Err(StockdashError::BackendStatus {
                status: 503,
                message: "AI chat is not available. Please set OPENAI_API_KEY.".into(),
            }),
        }
    }

    async fn fetch_watchlist(&self) -> Result<Vec<WatchlistEntry>, StockdashError> {
        Ok(self.watchlist.lock().unwrap().clone())
    }

    async fn add_to_watchlist(&self, ticker: &str) -> Result<BackendMessage, StockdashError> {
        self.check(ticker)?;
        let mut watchlist = self.watchlist.lock().unwrap();
        if watchlist.iter().any(|e| e.ticker == ticker) {
            return Err(StockdashError::BackendStatus {
                status: 400,
                message: "Ticker already in watchlist".into(),
            });
        }
        watchlist.push(watch_entry(ticker, 0.0));
        Ok(BackendMessage {
            message: format!("Added {ticker} to watchlist"),
        })
    }

    async fn remove_from_watchlist(
        &self,
        ticker: &str,
    ) -> Result<BackendMessage, StockdashError> {
        let mut watchlist = self.watchlist.lock().unwrap();
        let before = watchlist.len();
        watchlist.retain(|e| e.ticker != ticker);
        if watchlist.len() == before {
            return Err(StockdashError::BackendStatus {
                status: 404,
                message: "Ticker not in watchlist".into(),
            });
        }
        Ok(BackendMessage {
            message: format!("Removed {ticker} from watchlist"),
        })
    }

    async fn fetch_alerts(&self) -> Result<Vec<Alert>, StockdashError> {
        Ok(self.alerts.lock().unwrap().clone())
    }

    async fn create_alert(&self, alert: &NewAlert) -> Result<AlertCreated, StockdashError> {
        let mut alerts = self.alerts.lock().unwrap();
        let id = alerts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        alerts.push(Alert {
            id,
            ticker: alert.ticker.clone(),
            alert_type: alert.alert_type,
            threshold_value: alert.threshold,
            is_active: true,
            created_at: None,
        });
        Ok(AlertCreated {
            message: "Alert created".into(),
            alert_id: id,
        })
    }

    async fn delete_alert(&self, id: i64) -> Result<BackendMessage, StockdashError> {
        self.alert_deletes.lock().unwrap().push(id);
        for alert in self.alerts.lock().unwrap().iter_mut().filter(|a| a.id == id) {
            alert.is_active = false;
        }
        Ok(BackendMessage {
            message: "Alert deleted".into(),
        })
    }
}

pub fn watch_entry(ticker: &str, price: f64) -> WatchlistEntry {
    WatchlistEntry {
        ticker: ticker.to_string(),
        price,
        change: 0.0,
        change_percent: 0.0,
    }
}

pub fn price_alert(id: i64, ticker: &str, alert_type: AlertKind, threshold: f64) -> Alert {
    Alert {
        id,
        ticker: ticker.to_string(),
        alert_type,
        threshold_value: threshold,
        is_active: true,
        created_at: None,
    }
}

pub fn time(date: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_candle(date: &str, close: f64) -> Candle {
    Candle {
        time: time(date),
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10_000,
    }
}

/// `count` daily candles from `start`, closing on a gentle oscillating uptrend.
pub fn generate_candles(start: &str, count: usize, base: f64) -> Vec<Candle> {
    let start = time(start);
    (0..count)
        .map(|i| {
            let close = base + i as f64 * 0.2 + (i as f64 * 0.7).sin() * 2.0;
            Candle {
                time: start + Duration::days(i as i64),
                open: close - 0.3,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000 + i as i64 * 10,
            }
        })
        .collect()
}

pub fn article(title: &str, description: &str) -> NewsArticle {
    NewsArticle {
        title: title.to_string(),
        description: description.to_string(),
        url: format!("https://news.example/{}", title.len()),
        published_at: "2024-06-03T12:00:00Z".to_string(),
        source: "Example Wire".to_string(),
        ..NewsArticle::default()
    }
}
