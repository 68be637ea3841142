//! Average Directional Index and Directional Indicators.
//!
//! Per bar, only the larger positive directional move counts as +DM or -DM.
//! +DM, -DM, and true range are smoothed with the same rolling-mean technique
//! as ATR; DI = 100*smoothed(DM)/smoothed(TR), DX = 100*|+DI - -DI|/(+DI + -DI),
//! ADX = rolling mean of DX over the same period. ADX therefore becomes valid
//! at index 2*period - 1.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};

use super::atr::rolling_mean_points;

/// ADX plus both directional indicator series, aligned with the input.
#[derive(Debug, Clone)]
pub struct AdxSeries {
    pub adx: IndicatorSeries,
    pub plus_di: IndicatorSeries,
    pub minus_di: IndicatorSeries,
}

pub fn calculate_adx(candles: &[Candle], period: usize) -> AdxSeries {
    if period == 0 || candles.len() < 2 {
        let invalid = || IndicatorSeries {
            values: candles
                .iter()
                .map(|c| IndicatorPoint {
                    timestamp: c.timestamp,
                    valid: false,
                    value: 0.0,
                })
                .collect(),
        };
        return AdxSeries {
            adx: invalid(),
            plus_di: invalid(),
            minus_di: invalid(),
        };
    }

    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    let mut true_ranges = Vec::with_capacity(candles.len() - 1);

    for window in candles.windows(2) {
        let up_move = window[1].high - window[0].high;
        let down_move = window[0].low - window[1].low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
        true_ranges.push(window[1].true_range(window[0].close));
    }

    let smoothed_plus = rolling_mean_points(candles, &plus_dm, period);
    let smoothed_minus = rolling_mean_points(candles, &minus_dm, period);
    let smoothed_tr = rolling_mean_points(candles, &true_ranges, period);

    let mut plus_di_points = Vec::with_capacity(candles.len());
    let mut minus_di_points = Vec::with_capacity(candles.len());
    let mut dx_values: Vec<f64> = Vec::with_capacity(candles.len());

    for i in 0..candles.len() {
        let timestamp = candles[i].timestamp;
        let (valid, plus_di, minus_di) = if smoothed_tr[i].valid && smoothed_tr[i].value > 0.0 {
            (
                true,
                100.0 * smoothed_plus[i].value / smoothed_tr[i].value,
                100.0 * smoothed_minus[i].value / smoothed_tr[i].value,
            )
        } else {
            (false, 0.0, 0.0)
        };

        plus_di_points.push(IndicatorPoint {
            timestamp,
            valid,
            value: plus_di,
        });
        minus_di_points.push(IndicatorPoint {
            timestamp,
            valid,
            value: minus_di,
        });

        let dx = if valid && plus_di + minus_di > 0.0 {
            100.0 * (plus_di - minus_di).abs() / (plus_di + minus_di)
        } else {
            0.0
        };
        dx_values.push(dx);
    }

    // DX values are meaningful from index `period`; a full ADX window of
    // `period` DX values first ends at index 2*period - 1.
    let mut adx_points = Vec::with_capacity(candles.len());
    for (i, candle) in candles.iter().enumerate() {
        if i + 1 < 2 * period {
            adx_points.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: false,
                value: 0.0,
            });
        } else {
            let window = &dx_values[i + 1 - period..=i];
            let adx = window.iter().sum::<f64>() / period as f64;
            adx_points.push(IndicatorPoint {
                timestamp: candle.timestamp,
                valid: true,
                value: adx,
            });
        }
    }

    AdxSeries {
        adx: IndicatorSeries { values: adx_points },
        plus_di: IndicatorSeries {
            values: plus_di_points,
        },
        minus_di: IndicatorSeries {
            values: minus_di_points,
        },
    }
}
