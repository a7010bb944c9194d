//! Watchlist rows relayed from the backend.

use serde::{Deserialize, Serialize};

use crate::domain::quote::LiveBook;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub ticker: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default)]
    pub change_percent: f64,
}

impl WatchlistEntry {
    /// Replaces backend figures with the live quote when the book has one.
    pub fn refresh_from(&mut self, book: &LiveBook) -> bool {
        let Some(quote) = book.quote(&self.ticker.to_ascii_uppercase()) else {
            return false;
        };
        self.price = quote.price;
        self.change = quote.change();
        self.change_percent = quote.change_percent();
        true
    }
}
