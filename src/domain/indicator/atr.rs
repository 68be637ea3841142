//! Average True Range.
//!
//! True range per bar needs the previous close, so the first bar is excluded
//! from the rolling window. ATR is the simple rolling mean of true range over
//! `period` bars; the first valid point is at index `period`.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};

pub fn calculate_atr(candles: &[Candle], period: usize) -> IndicatorSeries {
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

    // true_ranges[i-1] corresponds to candle index i.
    let true_ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();

    let values = rolling_mean_points(candles, &true_ranges, period);
    IndicatorSeries { values }
}

/// Rolling mean over a derived series that starts at candle index 1,
/// emitting aligned points with explicit warm-up invalidity. Shared with the
/// ADX smoothing, which uses the same technique.
pub(super) fn rolling_mean_points(
    candles: &[Candle],
    derived: &[f64],
    period: usize,
) -> Vec<IndicatorPoint> {
    let mut values = Vec::with_capacity(candles.len());

    for (i, candle) in candles.iter().enumerate() {
        // candle i maps to derived[i-1]; a full window needs `period` entries.
        if i < period || derived.len() < i {
            values.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: 0.0,
            });
            continue;
        }

        let window = &derived[i - period..i];
        let mean = window.iter().sum::<f64>() / period as f64;
        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: mean,
        });
    }

    values
}
