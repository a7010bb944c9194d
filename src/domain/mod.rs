//! Core domain types and analytics.

pub mod alert;
pub mod analysis;
pub mod candle;
pub mod config_validation;
pub mod error;
pub mod forecast;
pub mod indicator;
pub mod insight;
pub mod quote;
pub mod risk;
pub mod sentiment;
pub mod timeframe;
pub mod watchlist;
