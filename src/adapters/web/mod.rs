//! Dashboard web API.
//!
//! JSON endpoints over the dashboard service plus a websocket relay of the
//! live price feed.

mod error;
mod handlers;
mod ws;

pub use error::{WebError, status_from_error};
pub use handlers::*;
pub use ws::ws_handler;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::price_feed::FeedEvent;
use crate::domain::quote::LiveBook;
use crate::service::DashboardService;

pub struct AppState {
    pub service: Arc<DashboardService>,
    pub book: Arc<RwLock<LiveBook>>,
    pub feed: broadcast::Sender<FeedEvent>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/prices", get(handlers::prices))
        .route("/api/stats", get(handlers::stats))
        .route("/api/history/{ticker}", get(handlers::history))
        .route("/api/indicators/{ticker}", get(handlers::indicators))
        .route("/api/analysis/{ticker}", get(handlers::analysis))
        .route("/api/predict", get(handlers::predict))
        .route("/api/news/{ticker}", get(handlers::news))
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/watchlist",
            get(handlers::watchlist).post(handlers::add_to_watchlist),
        )
        .route(
            "/api/watchlist/{ticker}",
            delete(handlers::remove_from_watchlist),
        )
        .route(
            "/api/alerts",
            get(handlers::alerts).post(handlers::create_alert),
        )
        .route("/api/alerts/{id}", delete(handlers::delete_alert))
        .route("/ws", get(ws::ws_handler))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}
