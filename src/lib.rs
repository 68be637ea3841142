//! fxsignal — multi-timeframe FX signal generator and backtester.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
