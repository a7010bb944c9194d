//! HTTP request handlers for the dashboard API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::alert::Alert;
use crate::domain::analysis::Analysis;
use crate::domain::candle::Candle;
use crate::domain::indicator::parse_indicator_list;
use crate::domain::quote::Quote;
use crate::domain::timeframe::{Interval, Period};
use crate::domain::watchlist::WatchlistEntry;
use crate::ports::market_port::{AlertCreated, BackendMessage, ChatReply, ChatRequest};
use crate::service::{IndicatorReport, NewsReport, Prediction};

use super::{AppState, WebError};

const HISTORY_PERIOD: Period = Period::OneDay;
const HISTORY_INTERVAL: Interval = Interval::OneMinute;
const ANALYSIS_PERIOD: Period = Period::SixMonths;
const ANALYSIS_INTERVAL: Interval = Interval::OneDay;
const DEFAULT_INDICATOR_LIST: &str = "SMA(20),EMA(12),RSI(14),MACD(12,26,9),BOLLINGER(20,2)";

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub period: Option<String>,
    pub interval: Option<String>,
    pub indicators: Option<String>,
}

impl RangeQuery {
    fn resolve(&self, period: Period, interval: Interval) -> Result<(Period, Interval), WebError> {
        let period = match self.period.as_deref() {
            Some(p) if !p.is_empty() => p.parse()?,
            _ => period,
        };
        let interval = match self.interval.as_deref() {
            Some(i) if !i.is_empty() => i.parse()?,
            _ => interval,
        };
        Ok((period, interval))
    }
}

/// One candle in the backend's history shape, with `price` mirroring the close.
#[derive(Debug, Serialize)]
pub struct HistoryPoint {
    #[serde(serialize_with = "crate::domain::candle::serialize_time")]
    pub time: chrono::NaiveDateTime,
    pub price: f64,
    pub volume: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl From<&Candle> for HistoryPoint {
    fn from(c: &Candle) -> Self {
        Self {
            time: c.time,
            price: c.close,
            volume: c.volume,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
        }
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn prices(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, f64>> {
    Json(state.book.read().await.prices())
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, Quote>> {
    Json(state.book.read().await.stats())
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<HistoryPoint>>, WebError> {
    let (period, interval) = query.resolve(HISTORY_PERIOD, HISTORY_INTERVAL)?;
    let history = state.service.history(&ticker, period, interval).await?;
    Ok(Json(history.candles.iter().map(HistoryPoint::from).collect()))
}

pub async fn indicators(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<IndicatorReport>, WebError> {
    let (period, interval) = query.resolve(ANALYSIS_PERIOD, ANALYSIS_INTERVAL)?;
    let types = parse_indicator_list(
        query
            .indicators
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_INDICATOR_LIST),
    )?;
    if types.is_empty() {
        return Err(WebError::bad_request("No indicators requested"));
    }
    let report = state
        .service
        .indicators(&ticker, period, interval, &types)
        .await?;
    Ok(Json(report))
}

pub async fn analysis(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Analysis>, WebError> {
    let (period, interval) = query.resolve(ANALYSIS_PERIOD, ANALYSIS_INTERVAL)?;
    Ok(Json(state.service.analysis(&ticker, period, interval).await?))
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub ticker: Option<String>,
    pub days: Option<String>,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<Prediction>, WebError> {
    let ticker = query.ticker.as_deref().unwrap_or("AAPL");
    let days = match query.days.as_deref() {
        Some(d) => Some(
            d.trim()
                .parse::<usize>()
                .map_err(|_| WebError::bad_request(format!("Invalid days: {d}")))?,
        ),
        None => None,
    };
    Ok(Json(state.service.predict(ticker, days).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub refresh: Option<String>,
}

pub async fn news(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<NewsReport>, WebError> {
    let refresh = query
        .refresh
        .as_deref()
        .is_some_and(|r| r.eq_ignore_ascii_case("true"));
    Ok(Json(state.service.news(&ticker, refresh).await?))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, WebError> {
    Ok(Json(state.service.chat(request).await?))
}

/// Backend watchlist with prices overlaid from the live book.
pub async fn watchlist(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WatchlistEntry>>, WebError> {
    let mut entries = state.service.watchlist().await?;
    let book = state.book.read().await;
    for entry in &mut entries {
        entry.refresh_from(&book);
    }
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct WatchRequest {
    pub ticker: Option<String>,
}

pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WatchRequest>,
) -> Result<(StatusCode, Json<BackendMessage>), WebError> {
    let Some(ticker) = request.ticker.filter(|t| !t.trim().is_empty()) else {
        return Err(WebError::bad_request("Ticker is required"));
    };
    let reply = state.service.add_to_watchlist(&ticker).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<BackendMessage>, WebError> {
    Ok(Json(state.service.remove_from_watchlist(&ticker).await?))
}

pub async fn alerts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Alert>>, WebError> {
    Ok(Json(state.service.alerts().await?))
}

#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    pub ticker: Option<String>,
    pub alert_type: Option<String>,
    pub threshold: Option<f64>,
}

pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AlertRequest>,
) -> Result<(StatusCode, Json<AlertCreated>), WebError> {
    let (Some(ticker), Some(alert_type)) = (request.ticker, request.alert_type) else {
        return Err(WebError::bad_request("Missing required fields"));
    };
    let created = state
        .service
        .create_alert(&ticker, &alert_type, request.threshold)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BackendMessage>, WebError> {
    let id = id
        .trim()
        .parse::<i64>()
        .map_err(|_| WebError::bad_request(format!("Invalid alert id: {id}")))?;
    Ok(Json(state.service.delete_alert(id).await?))
}

pub async fn not_found(uri: Uri) -> Response {
    WebError::not_found(format!("No route for {}", uri.path())).into_response()
}
