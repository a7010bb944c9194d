//! Port traits the domain talks through.

pub mod cache_port;
pub mod config_port;
pub mod market_port;
