//! Candlestick pattern quality score for the H4 execution gate.
//!
//! Scores the last two candles against a trend direction: 0.9 for an
//! engulfing pattern in the trend direction, 0.8 for a hammer/shooting-star
//! shape, 0.7 for a strong directional body, else 0.5 (neutral). The score
//! gates H4 tradeability only; it never sets direction by itself.

use super::analysis::TrendDirection;
use super::candle::Candle;

pub const ENGULFING_SCORE: f64 = 0.9;
pub const WICK_REJECTION_SCORE: f64 = 0.8;
pub const STRONG_BODY_SCORE: f64 = 0.7;
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Wick must be at least this multiple of the body for a hammer/shooting star.
const WICK_BODY_RATIO: f64 = 2.0;
/// Body must cover at least this fraction of the range for a strong candle.
const STRONG_BODY_FRACTION: f64 = 0.7;

pub fn pattern_quality(prev: &Candle, last: &Candle, direction: TrendDirection) -> f64 {
    match direction {
        TrendDirection::Up => {
            if is_bullish_engulfing(prev, last) {
                ENGULFING_SCORE
            } else if is_hammer(last) {
                WICK_REJECTION_SCORE
            } else if is_strong_body(last) && last.is_bullish() {
                STRONG_BODY_SCORE
            } else {
                NEUTRAL_SCORE
            }
        }
        TrendDirection::Down => {
            if is_bearish_engulfing(prev, last) {
                ENGULFING_SCORE
            } else if is_shooting_star(last) {
                WICK_REJECTION_SCORE
            } else if is_strong_body(last) && last.is_bearish() {
                STRONG_BODY_SCORE
            } else {
                NEUTRAL_SCORE
            }
        }
        TrendDirection::Sideways => NEUTRAL_SCORE,
    }
}

/// Bullish candle whose body engulfs the prior bearish body.
fn is_bullish_engulfing(prev: &Candle, last: &Candle) -> bool {
    prev.is_bearish() && last.is_bullish() && last.open <= prev.close && last.close >= prev.open
}

/// Bearish candle whose body engulfs the prior bullish body.
fn is_bearish_engulfing(prev: &Candle, last: &Candle) -> bool {
    prev.is_bullish() && last.is_bearish() && last.open >= prev.close && last.close <= prev.open
}

/// Long lower wick rejecting the downside.
fn is_hammer(candle: &Candle) -> bool {
    let body = candle.body();
    body > 0.0 && candle.lower_wick() >= WICK_BODY_RATIO * body
}

/// Long upper wick rejecting the upside.
fn is_shooting_star(candle: &Candle) -> bool {
    let body = candle.body();
    body > 0.0 && candle.upper_wick() >= WICK_BODY_RATIO * body
}

fn is_strong_body(candle: &Candle) -> bool {
    let range = candle.range();
    range > 0.0 && candle.body() >= STRONG_BODY_FRACTION * range
}
