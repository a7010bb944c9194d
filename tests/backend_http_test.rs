//! HTTP backend adapter tests against a local stand-in for the dashboard backend.

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use stockdash::adapters::backend_http::BackendHttpAdapter;
use stockdash::domain::alert::{AlertKind, NewAlert};
use stockdash::domain::error::StockdashError;
use stockdash::domain::sentiment::SentimentLabel;
use stockdash::domain::timeframe::{Interval, Period};
use stockdash::ports::market_port::{ChatRequest, MarketDataPort};

const TOKEN: &str = "secret-token";

async fn history(
    Path(ticker): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if ticker == "FAIL" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Failed to fetch historical data"})),
        );
    }
    let period = query.get("period").cloned().unwrap_or_default();
    let interval = query.get("interval").cloned().unwrap_or_default();
    // Only period=5d&interval=1d yields a parseable third timestamp.
    let third = if period == "5d" && interval == "1d" {
        "09:30"
    } else {
        "bad"
    };
    let rows = json!([
        {
            "time": "2024-06-04 09:30", "price": 11.0, "volume": 200.0,
            "open": 10.5, "high": 11.2, "low": 10.4, "close": 11.0
        },
        {
            "time": "2024-06-03 09:30", "price": 10.0, "volume": 100,
            "open": 9.5, "high": 10.2, "low": 9.4, "close": 10.0
        },
        {"time": "garbage", "price": 1.0},
        {"time": format!("2024-06-05 {third}"), "price": 12.0}
    ]);
    (StatusCode::OK, Json(rows))
}

async fn prices() -> Json<Value> {
    Json(json!({"AAPL": 190.5, "TSLA": 250.25}))
}

async fn news(
    Path(ticker): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let refreshed = query.get("refresh").map(String::as_str) == Some("true");
    Json(json!([
        {
            "title": format!("{ticker} refreshed={refreshed}"),
            "description": null,
            "url": "https://news.example/1",
            "publishedAt": "2024-06-03T12:00:00Z",
            "source": "Wire",
            "sentiment": "negative",
            "sentiment_score": -0.4,
            "sentiment_label": "negative"
        }
    ]))
}

async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let expected = format!("Bearer {TOKEN}");
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"msg": "Missing Authorization Header"})),
        );
    }
    let reply = format!(
        "{} about {}",
        body["message"].as_str().unwrap_or_default(),
        body["ticker"].as_str().unwrap_or("nothing")
    );
    (StatusCode::OK, Json(json!({ "response": reply })))
}

async fn watchlist() -> Json<Value> {
    Json(json!([
        {"ticker": "AAPL", "price": 190.0, "change": 1.5, "changePercent": 0.79},
        {"ticker": "MSFT", "price": 410.0, "change": -2.0, "changePercent": -0.49}
    ]))
}

async fn add_watch(Json(body): Json<Value>) -> impl IntoResponse {
    let ticker = body["ticker"].as_str().unwrap_or_default().to_string();
    if ticker == "AAPL" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Ticker already in watchlist"})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({"message": format!("Added {ticker} to watchlist")})),
    )
}

async fn remove_watch(Path(ticker): Path<String>) -> impl IntoResponse {
    if ticker == "NVDA" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Ticker not in watchlist"})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({"message": format!("Removed {ticker} from watchlist")})),
    )
}

async fn alerts() -> Json<Value> {
    Json(json!([
        {
            "id": 7, "user_id": 1, "ticker": "AAPL", "alert_type": "price_above",
            "threshold_value": 200.0, "is_active": 1,
            "created_at": "2024-06-03 10:00:00", "triggered_at": null
        },
        {
            "id": 8, "user_id": 1, "ticker": "TSLA", "alert_type": "sideways",
            "threshold_value": 1.0, "is_active": 1
        },
        {
            "id": 9, "user_id": 1, "ticker": "TSLA", "alert_type": "price_below",
            "threshold_value": 180.0, "is_active": 0
        }
    ]))
}

async fn create_alert(Json(body): Json<Value>) -> impl IntoResponse {
    let complete = ["ticker", "alert_type", "threshold"]
        .iter()
        .all(|field| !body[field].is_null());
    if !complete {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing required fields"})),
        );
    }
    let id = body["threshold"].as_f64().unwrap_or_default() as i64;
    let message = format!("Alert created for {}", body["ticker"].as_str().unwrap_or_default());
    (
        StatusCode::CREATED,
        Json(json!({"message": message, "alert_id": id})),
    )
}

async fn delete_alert(Path(id): Path<i64>) -> impl IntoResponse {
    if id != 7 {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Alert not found"})));
    }
    (StatusCode::OK, Json(json!({"message": "Alert deleted"})))
}

async fn spawn_backend() -> String {
    let router = Router::new()
        .route("/api/history/{ticker}", get(history))
        .route("/api/prices", get(prices))
        .route("/api/news/{ticker}", get(news))
        .route("/api/chat", post(chat))
        .route("/api/watchlist", get(watchlist).post(add_watch))
        .route("/api/watchlist/{ticker}", delete(remove_watch))
        .route("/api/alerts", get(alerts).post(create_alert))
        .route("/api/alerts/{id}", delete(delete_alert));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/")
}

fn adapter(base_url: &str, token: Option<&str>) -> BackendHttpAdapter {
    BackendHttpAdapter::new(base_url, token.map(String::from), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn history_is_parsed_sorted_and_filtered() {
    let base = spawn_backend().await;
    let candles = adapter(&base, None)
        .fetch_history("AAPL", Period::FiveDays, Interval::OneDay)
        .await
        .unwrap();

    assert_eq!(candles.len(), 3);
    assert_eq!(candles[0].close, 10.0);
    assert_eq!(candles[0].volume, 100);
    assert_eq!(candles[1].volume, 200);
    assert_eq!(candles[2].close, 12.0);
    assert!(candles.windows(2).all(|w| w[0].time < w[1].time));
}

#[tokio::test]
async fn history_query_carries_period_and_interval() {
    let base = spawn_backend().await;
    // The stand-in only emits a valid third row for period=5d&interval=1d.
    let candles = adapter(&base, None)
        .fetch_history("AAPL", Period::OneMonth, Interval::OneHour)
        .await
        .unwrap();
    assert_eq!(candles.len(), 2);
}

#[tokio::test]
async fn error_body_becomes_backend_status() {
    let base = spawn_backend().await;
    let err = adapter(&base, None)
        .fetch_history("FAIL", Period::OneDay, Interval::OneMinute)
        .await
        .unwrap_err();
    match err {
        StockdashError::BackendStatus { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Failed to fetch historical data");
        }
        other => panic!("expected BackendStatus, got {other}"),
    }
}

#[tokio::test]
async fn prices_map() {
    let base = spawn_backend().await;
    let prices = adapter(&base, None).fetch_prices().await.unwrap();
    assert_eq!(prices["AAPL"], 190.5);
    assert_eq!(prices["TSLA"], 250.25);
}

#[tokio::test]
async fn news_passes_refresh_and_reads_labels() {
    let base = spawn_backend().await;
    let articles = adapter(&base, None).fetch_news("TSLA", true).await.unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "TSLA refreshed=true");
    assert_eq!(articles[0].description, "");
    assert_eq!(articles[0].published_at, "2024-06-03T12:00:00Z");
    assert_eq!(articles[0].sentiment_label, Some(SentimentLabel::Negative));
    assert_eq!(articles[0].sentiment_score, Some(-0.4));
}

#[tokio::test]
async fn chat_sends_bearer_token() {
    let base = spawn_backend().await;
    let request = ChatRequest {
        message: "Outlook?".into(),
        ticker: Some("NVDA".into()),
        context: None,
    };

    let reply = adapter(&base, Some(TOKEN)).send_chat(&request).await.unwrap();
    assert_eq!(reply.response, "Outlook? about NVDA");

    let err = adapter(&base, None).send_chat(&request).await.unwrap_err();
    assert!(matches!(err, StockdashError::BackendStatus { status: 401, .. }));
}

#[tokio::test]
async fn watchlist_rows_and_writes() {
    let base = spawn_backend().await;
    let backend = adapter(&base, Some(TOKEN));

    let entries = backend.fetch_watchlist().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].ticker, "MSFT");
    assert_eq!(entries[1].change_percent, -0.49);

    let added = backend.add_to_watchlist("NVDA").await.unwrap();
    assert_eq!(added.message, "Added NVDA to watchlist");
    let err = backend.add_to_watchlist("AAPL").await.unwrap_err();
    assert!(matches!(err, StockdashError::BackendStatus { status: 400, .. }));

    let removed = backend.remove_from_watchlist("MSFT").await.unwrap();
    assert_eq!(removed.message, "Removed MSFT from watchlist");
    match backend.remove_from_watchlist("NVDA").await.unwrap_err() {
        StockdashError::BackendStatus { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Ticker not in watchlist");
        }
        other => panic!("expected BackendStatus, got {other}"),
    }
}

#[tokio::test]
async fn alerts_skip_malformed_rows() {
    let base = spawn_backend().await;
    let alerts = adapter(&base, Some(TOKEN)).fetch_alerts().await.unwrap();

    let ids: Vec<i64> = alerts.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![7, 9]);
    assert_eq!(alerts[0].alert_type, AlertKind::PriceAbove);
    assert!(alerts[0].is_active);
    assert!(!alerts[1].is_active);
}

#[tokio::test]
async fn alert_create_and_delete() {
    let base = spawn_backend().await;
    let backend = adapter(&base, Some(TOKEN));

    let alert = NewAlert::parse("aapl", "price_below", Some(42.0)).unwrap();
    let created = backend.create_alert(&alert).await.unwrap();
    assert_eq!(created.alert_id, 42);
    assert_eq!(created.message, "Alert created for AAPL");

    assert_eq!(backend.delete_alert(7).await.unwrap().message, "Alert deleted");
    let err = backend.delete_alert(99).await.unwrap_err();
    assert!(matches!(err, StockdashError::BackendStatus { status: 404, .. }));
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = adapter(&format!("http://{addr}"), None)
        .fetch_prices()
        .await
        .unwrap_err();
    assert!(matches!(err, StockdashError::Backend { .. }));
}
