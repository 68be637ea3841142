//! Relative Strength Index with Wilder smoothing.
//!
//! Seed averages are simple means over the first n deltas; after that
//! avg = (avg*(n-1) + new)/n. RSI = 100 - 100/(1 + avg_gain/avg_loss),
//! and 100 when avg_loss is zero. The first n points are invalid (n price
//! changes are needed for the seed).

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 || candles.len() < 2 {
        let values = candles
            .iter()
            .map(|c| IndicatorPoint {
                timestamp: c.timestamp,
                valid: false,
                value: 0.0,
            })
            .collect();
        return IndicatorSeries { values };
    }

    let mut gains = Vec::with_capacity(candles.len() - 1);
    let mut losses = Vec::with_capacity(candles.len() - 1);
    for window in candles.windows(2) {
        let change = window[1].close - window[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut values = Vec::with_capacity(candles.len());
    values.push(IndicatorPoint {
        timestamp: candles[0].timestamp,
        valid: false,
        value: 0.0,
    });

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, candle) in candles.iter().enumerate().skip(1) {
        let delta_idx = i - 1;

        if delta_idx < period - 1 {
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: 0.0,
            });
            continue;
        }

        if delta_idx == period - 1 {
            avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
            avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[delta_idx]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[delta_idx]) / period as f64;
        }

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: rsi,
        });
    }

    IndicatorSeries { values }
}
