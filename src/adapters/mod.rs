//! Concrete adapter implementations for ports.

pub mod backend_http;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod price_feed;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;
