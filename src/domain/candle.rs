//! OHLCV candle and candle-series representation.

use chrono::{DateTime, Utc};

use super::error::FxSignalError;

/// Timeframe granularity of a candle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    H4,
    Daily,
    Weekly,
}

impl Granularity {
    /// Short code used in file names and signal records ("H4", "D", "W").
    pub fn code(&self) -> &'static str {
        match self {
            Granularity::H4 => "H4",
            Granularity::Daily => "D",
            Granularity::Weekly => "W",
        }
    }

    pub fn from_code(code: &str) -> Option<Granularity> {
        match code.to_uppercase().as_str() {
            "H4" => Some(Granularity::H4),
            "D" | "DAILY" => Some(Granularity::Daily),
            "W" | "WEEKLY" => Some(Granularity::Weekly),
            _ => None,
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A single OHLCV bar. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// max(high-low, |high-prev_close|, |low-prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn check(&self) -> Result<(), String> {
        if !(self.low <= self.open && self.open <= self.high) {
            return Err(format!("open {} outside [low, high]", self.open));
        }
        if !(self.low <= self.close && self.close <= self.high) {
            return Err(format!("close {} outside [low, high]", self.close));
        }
        if self.volume < 0.0 {
            return Err(format!("negative volume {}", self.volume));
        }
        Ok(())
    }
}

/// Pip size for a pair: 0.01 for JPY-quoted pairs, 0.0001 otherwise.
pub fn pip_size(pair: &str) -> f64 {
    let quote = pair.rsplit('_').next().unwrap_or(pair);
    if quote == "JPY" { 0.01 } else { 0.0001 }
}

/// An ordered candle series for one pair and granularity.
///
/// Timestamps are strictly increasing with no duplicates; validated at
/// construction. Consumers never mutate a series in place.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    pair: String,
    granularity: Granularity,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(
        pair: impl Into<String>,
        granularity: Granularity,
        candles: Vec<Candle>,
    ) -> Result<Self, FxSignalError> {
        let pair = pair.into();

        for (i, candle) in candles.iter().enumerate() {
            if let Err(reason) = candle.check() {
                return Err(FxSignalError::InvalidSeries {
                    pair,
                    reason: format!("candle {}: {}", i, reason),
                });
            }
        }

        for window in candles.windows(2) {
            if window[1].timestamp <= window[0].timestamp {
                return Err(FxSignalError::InvalidSeries {
                    pair,
                    reason: format!(
                        "timestamps not strictly increasing at {}",
                        window[1].timestamp
                    ),
                });
            }
        }

        Ok(CandleSeries {
            pair,
            granularity,
            candles,
        })
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}
