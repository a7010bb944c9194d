//! stockdash: technical analysis, risk metrics and a live price relay for a
//! stock dashboard backend.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], use cases in [`service`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod service;
