//! Core domain types and logic.

pub mod aggregate;
pub mod analysis;
pub mod candle;
pub mod config_validation;
pub mod confluence;
pub mod error;
pub mod indicator;
pub mod pattern;
pub mod performance;
pub mod signal;
pub mod simulator;
