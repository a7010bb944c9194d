//! Live price feed: polls the backend and fans updates out to subscribers.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast, watch};
use tracing::{debug, info, warn};

use crate::domain::alert::{self, TriggeredAlert};
use crate::domain::error::StockdashError;
use crate::domain::quote::{LiveBook, Quote};
use crate::ports::market_port::MarketDataPort;

/// Events pushed to live subscribers, framed as `{"event": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum FeedEvent {
    PriceUpdate(BTreeMap<String, f64>),
    StatsUpdate(BTreeMap<String, Quote>),
    AlertTriggered(TriggeredAlert),
}

impl FeedEvent {
    /// Keeps only the entries for `tickers`; `None` when nothing remains.
    pub fn retain_tickers(&self, tickers: &[String]) -> Option<FeedEvent> {
        fn keep<V: Clone>(map: &BTreeMap<String, V>, tickers: &[String]) -> BTreeMap<String, V> {
            map.iter()
                .filter(|(t, _)| tickers.contains(t))
                .map(|(t, v)| (t.clone(), v.clone()))
                .collect()
        }
        match self {
            FeedEvent::PriceUpdate(m) => {
                let kept = keep(m, tickers);
                (!kept.is_empty()).then_some(FeedEvent::PriceUpdate(kept))
            }
            FeedEvent::StatsUpdate(m) => {
                let kept = keep(m, tickers);
                (!kept.is_empty()).then_some(FeedEvent::StatsUpdate(kept))
            }
            FeedEvent::AlertTriggered(hit) => tickers
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&hit.alert.ticker))
                .then(|| self.clone()),
        }
    }
}

pub struct PriceFeed {
    market: Arc<dyn MarketDataPort>,
    book: Arc<RwLock<LiveBook>>,
    tx: broadcast::Sender<FeedEvent>,
    interval: Duration,
    alerts: bool,
}

impl PriceFeed {
    pub fn new(
        market: Arc<dyn MarketDataPort>,
        book: Arc<RwLock<LiveBook>>,
        interval: Duration,
        capacity: usize,
    ) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            market,
            book,
            tx,
            interval,
            alerts: false,
        }
    }

    /// Checks backend alerts against the book after every poll that updated it.
    pub fn with_alerts(mut self, enabled: bool) -> Self {
        self.alerts = enabled;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<FeedEvent> {
        self.tx.clone()
    }

    pub fn book(&self) -> Arc<RwLock<LiveBook>> {
        Arc::clone(&self.book)
    }

    /// Fetches one price snapshot, applies it and publishes the result.
    ///
    /// Returns the tickers whose quote changed. Nothing is published when no
    /// watched ticker was updated.
    pub async fn poll_once(&self) -> Result<Vec<String>, StockdashError> {
        let prices = self.market.fetch_prices().await?;
        let now = Local::now().naive_local();

        let (updated, price_map, stats) = {
            let mut book = self.book.write().await;
            let updated = book.apply_snapshot(&prices, now);
            (updated, book.prices(), book.stats())
        };

        if updated.is_empty() {
            debug!("price poll had no watched tickers");
            return Ok(updated);
        }

        // A send error only means there are no subscribers right now.
        let _ = self.tx.send(FeedEvent::PriceUpdate(price_map));
        let _ = self.tx.send(FeedEvent::StatsUpdate(stats));
        debug!(tickers = updated.len(), "published price update");
        Ok(updated)
    }

    /// Publishes every active alert the book now crosses.
    ///
    /// Triggered alerts are deactivated on the backend so they fire once; a
    /// failed deactivation is logged and the alert may fire again next tick.
    pub async fn check_alerts(&self) -> Result<Vec<TriggeredAlert>, StockdashError> {
        let alerts = self.market.fetch_alerts().await?;
        let triggered = {
            let book = self.book.read().await;
            alert::check_alerts(&alerts, &book)
        };

        for hit in &triggered {
            info!(
                id = hit.alert.id,
                ticker = %hit.alert.ticker,
                alert_type = %hit.alert.alert_type,
                threshold = hit.alert.threshold_value,
                value = hit.value,
                "alert triggered"
            );
            if let Err(e) = self.market.delete_alert(hit.alert.id).await {
                warn!(id = hit.alert.id, error = %e, "failed to deactivate alert");
            }
            let _ = self.tx.send(FeedEvent::AlertTriggered(hit.clone()));
        }
        Ok(triggered)
    }

    async fn tick(&self) {
        match self.poll_once().await {
            Ok(updated) if self.alerts && !updated.is_empty() => {
                if let Err(e) = self.check_alerts().await {
                    warn!(error = %e, "alert check failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "price poll failed"),
        }
    }

    /// Polls until `shutdown` turns true. Failed polls are retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            interval_secs = self.interval.as_secs(),
            alerts = self.alerts,
            "price feed started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("price feed stopped");
    }
}
