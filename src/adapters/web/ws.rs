//! Websocket relay of the live price feed.
//!
//! On connect a client receives the current `price_update` and
//! `stats_update`. It may then send `{"action":"subscribe","ticker":"AAPL"}`
//! or `unsubscribe`; once it holds at least one subscription only updates
//! for its subscribed tickers are forwarded.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::adapters::price_feed::FeedEvent;
use crate::domain::quote::LiveBook;
use crate::domain::timeframe::normalize_ticker;

use super::AppState;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub(crate) enum ClientCommand {
    Subscribe { ticker: String },
    Unsubscribe { ticker: String },
}

#[derive(Debug, Default)]
pub(crate) struct Subscriptions {
    tickers: Vec<String>,
}

impl Subscriptions {
    /// Applies a command. Returns the event to send back immediately, if any.
    ///
    /// Tickers outside the watch list are ignored.
    pub(crate) fn apply(&mut self, command: ClientCommand, book: &LiveBook) -> Option<FeedEvent> {
        match command {
            ClientCommand::Subscribe { ticker } => {
                let ticker = normalize_ticker(&ticker).ok().filter(|t| book.is_watched(t))?;
                if !self.tickers.contains(&ticker) {
                    self.tickers.push(ticker.clone());
                }
                let price = book.quote(&ticker).map(|q| q.price).unwrap_or(0.0);
                Some(FeedEvent::PriceUpdate(BTreeMap::from([(ticker, price)])))
            }
            ClientCommand::Unsubscribe { ticker } => {
                let ticker = normalize_ticker(&ticker).ok()?;
                self.tickers.retain(|t| *t != ticker);
                None
            }
        }
    }

    pub(crate) fn filter(&self, event: &FeedEvent) -> Option<FeedEvent> {
        if self.tickers.is_empty() {
            return Some(event.clone());
        }
        event.retain_tickers(&self.tickers)
    }
}

/// `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn send_event(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    event: &FeedEvent,
) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to serialize feed event");
            true
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("websocket client connected");
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so no update between the two is lost.
    let mut feed_rx = state.feed.subscribe();
    let snapshot = {
        let book = state.book.read().await;
        [
            FeedEvent::PriceUpdate(book.prices()),
            FeedEvent::StatsUpdate(book.stats()),
        ]
    };
    for event in &snapshot {
        if !send_event(&mut sender, event).await {
            return;
        }
    }

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<ClientCommand>(16);
    let book = Arc::clone(&state.book);

    let mut send_task = tokio::spawn(async move {
        let mut subscriptions = Subscriptions::default();
        loop {
            tokio::select! {
                received = feed_rx.recv() => match received {
                    Ok(event) => {
                        let Some(event) = subscriptions.filter(&event) else { continue };
                        if !send_event(&mut sender, &event).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(skipped = n, "websocket client lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                command = cmd_rx.recv() => {
                    let Some(command) = command else { break };
                    let reply = subscriptions.apply(command, &*book.read().await);
                    let Some(event) = reply else { continue };
                    if !send_event(&mut sender, &event).await {
                        break;
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => {
                        if cmd_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        debug!(message = %text.as_str(), "ignoring unknown websocket message")
                    }
                },
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    warn!(error = %e, "websocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!("websocket client disconnected");
}
