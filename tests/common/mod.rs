#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fxsignal::domain::candle::{Candle, CandleSeries, Granularity};
use fxsignal::domain::error::FxSignalError;
use fxsignal::domain::signal::{SignalGenerator, TradeAction, TradingSignal};
use fxsignal::ports::price_port::PricePort;

pub struct MockPricePort {
    pub data: HashMap<(String, String), Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, pair: &str, granularity: Granularity, candles: Vec<Candle>) -> Self {
        self.data
            .insert((pair.to_string(), granularity.code().to_string()), candles);
        self
    }

    pub fn with_error(mut self, pair: &str, reason: &str) -> Self {
        self.errors.insert(pair.to_string(), reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn get_history(
        &self,
        pair: &str,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Candle>, FxSignalError> {
        if let Some(reason) = self.errors.get(pair) {
            return Err(FxSignalError::Data {
                reason: reason.clone(),
            });
        }
        let key = (pair.to_string(), granularity.code().to_string());
        let mut candles = self.data.get(&key).cloned().unwrap_or_default();
        if candles.len() > count {
            candles.drain(..candles.len() - count);
        }
        Ok(candles)
    }

    fn list_pairs(&self) -> Result<Vec<String>, FxSignalError> {
        let mut pairs: Vec<String> = self.data.keys().map(|(pair, _)| pair.clone()).collect();
        pairs.sort();
        pairs.dedup();
        Ok(pairs)
    }
}

pub fn start_time() -> DateTime<Utc> {
    // A Monday, so weekly aggregation starts on a bucket boundary.
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn h4_candle(i: usize, close: f64) -> Candle {
    Candle {
        timestamp: start_time() + Duration::hours(4 * i as i64),
        open: close - 0.0005,
        high: close + 0.001,
        low: close - 0.0015,
        close,
        volume: 100.0,
    }
}

pub fn h4_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| h4_candle(i, close))
        .collect()
}

pub fn daily_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: start_time() + Duration::days(i as i64),
            open: close - 0.0008,
            high: close + 0.0002,
            low: close - 0.001,
            close,
            volume: 100.0,
        })
        .collect()
}

pub fn h4_series(pair: &str, closes: &[f64]) -> CandleSeries {
    CandleSeries::new(pair, Granularity::H4, h4_candles(closes)).unwrap()
}

pub fn daily_series(pair: &str, closes: &[f64]) -> CandleSeries {
    CandleSeries::new(pair, Granularity::Daily, daily_candles(closes)).unwrap()
}

/// Down `down` bars then up `up` bars; drives a single EMA crossover.
pub fn v_shape(down: usize, up: usize) -> Vec<f64> {
    let mut closes: Vec<f64> = (0..down).map(|i| 1.30 - i as f64 * 0.002).collect();
    let bottom = *closes.last().unwrap();
    closes.extend((1..=up).map(|i| bottom + i as f64 * 0.004));
    closes
}

/// Emits a scripted action at fixed bar indices, quiet otherwise.
pub struct ScriptedGenerator {
    pub script: Vec<(usize, TradeAction)>,
}

impl SignalGenerator for ScriptedGenerator {
    fn generate(
        &self,
        series: &CandleSeries,
        index: usize,
    ) -> Result<Option<TradingSignal>, FxSignalError> {
        let candle = &series.candles()[index];
        Ok(self
            .script
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, action)| TradingSignal {
                pair: series.pair().to_string(),
                timeframe: series.granularity(),
                action: *action,
                price: candle.close,
                ema_fast: None,
                ema_slow: None,
                confidence: 0.7,
                timestamp: candle.timestamp,
            }))
    }

    fn min_history(&self) -> usize {
        0
    }
}
