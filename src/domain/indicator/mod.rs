//! Technical indicator types and the per-series indicator engine.
//!
//! Every indicator output is aligned 1:1 with its input candles. Warm-up
//! values are explicit invalid points; they are never coerced to zero. The
//! analysis layer applies the documented warm-up defaults (RSI 50, ADX 20)
//! through [`IndicatorSnapshot`], nowhere else.

pub mod adx;
pub mod atr;
pub mod ema;
pub mod rsi;

use chrono::{DateTime, Utc};

use super::candle::Candle;

/// A single point in an indicator time series.
#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: f64,
}

/// A time series of indicator values aligned with a candle slice.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn at(&self, index: usize) -> Option<f64> {
        self.values
            .get(index)
            .filter(|p| p.valid)
            .map(|p| p.value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Indicator parameters, fixed at construction. Parameter sweeps build new
/// configs instead of mutating a shared one.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub adx_period: usize,
    pub atr_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            ema_fast: 20,
            ema_slow: 50,
            rsi_period: 14,
            adx_period: 14,
            atr_period: 14,
        }
    }
}

/// Indicator values at one index. `None` means the indicator is still in its
/// warm-up window.
#[derive(Debug, Clone)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub atr: Option<f64>,
}

impl IndicatorSnapshot {
    /// RSI with the documented warm-up default of 50 (neutral momentum).
    pub fn rsi_or_default(&self) -> f64 {
        self.rsi.unwrap_or(50.0)
    }

    /// ADX with the documented warm-up default of 20 (weak trend).
    pub fn adx_or_default(&self) -> f64 {
        self.adx.unwrap_or(20.0)
    }
}

/// All indicator series the analyzers need for one candle slice.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub ema_fast: IndicatorSeries,
    pub ema_slow: IndicatorSeries,
    pub rsi: IndicatorSeries,
    pub atr: IndicatorSeries,
    pub adx: adx::AdxSeries,
}

impl IndicatorSet {
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        IndicatorSet {
            ema_fast: ema::calculate_ema(candles, config.ema_fast),
            ema_slow: ema::calculate_ema(candles, config.ema_slow),
            rsi: rsi::calculate_rsi(candles, config.rsi_period),
            atr: atr::calculate_atr(candles, config.atr_period),
            adx: adx::calculate_adx(candles, config.adx_period),
        }
    }

    pub fn snapshot_at(&self, candles: &[Candle], index: usize) -> Option<IndicatorSnapshot> {
        let candle = candles.get(index)?;
        Some(IndicatorSnapshot {
            timestamp: candle.timestamp,
            close: candle.close,
            ema_fast: self.ema_fast.at(index),
            ema_slow: self.ema_slow.at(index),
            rsi: self.rsi.at(index),
            adx: self.adx.adx.at(index),
            plus_di: self.adx.plus_di.at(index),
            minus_di: self.adx.minus_di.at(index),
            atr: self.atr.at(index),
        })
    }
}
