//! Exponential Moving Average.
//!
//! α = 2/(n+1), seeded with the SMA of the first n closes, then
//! ema[i] = close[i]*α + ema[i-1]*(1-α). The first (n-1) points are invalid.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 {
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

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(candles.len());
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, candle) in candles.iter().enumerate() {
        if i < period - 1 {
            sum += candle.close;
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: 0.0,
            });
        } else if i == period - 1 {
            sum += candle.close;
            ema = sum / period as f64;
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: true,
                value: ema,
            });
        } else {
            ema = candle.close * alpha + ema * (1.0 - alpha);
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: true,
                value: ema,
            });
        }
    }

    IndicatorSeries { values }
}
