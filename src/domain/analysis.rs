//! Per-timeframe trend classification.
//!
//! Turns the latest indicator snapshot of one timeframe into direction,
//! strength, bias, a tradeability verdict, and a confidence score. Weekly,
//! daily, and H4 use different confidence weightings and different
//! tradeability gates; the daily pullback and H4 execution gates live here.

use super::candle::{Candle, Granularity};
use super::indicator::{IndicatorSet, IndicatorSnapshot};
use super::pattern::pattern_quality;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendStrength {
    Weak,
    Moderate,
    Strong,
}

impl TrendStrength {
    /// Contribution of a tradeable timeframe to the confluence score.
    pub fn score(&self) -> f64 {
        match self {
            TrendStrength::Strong => 1.0,
            TrendStrength::Moderate => 0.8,
            TrendStrength::Weak => 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

/// One timeframe's classified state at the evaluation index. Derived fresh
/// per evaluation; never persisted.
#[derive(Debug, Clone)]
pub struct TimeframeAnalysis {
    pub timeframe: Granularity,
    pub direction: TrendDirection,
    pub strength: TrendStrength,
    pub bias: Bias,
    pub tradeable: bool,
    pub confidence: f64,
    pub close: f64,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: f64,
    pub adx: f64,
    pub atr: Option<f64>,
}

/// Analyzer gates. The pullback and breakout values have no derivation in
/// the strategy literature; they are tuning defaults, not constants.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Daily gate: max |close - ema_fast| / ema_fast.
    pub pullback_pct: f64,
    /// H4 gate: swing high/low lookback in bars.
    pub breakout_lookback: usize,
    /// H4 gate: minimum candlestick pattern quality.
    pub min_pattern_quality: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            pullback_pct: 0.002,
            breakout_lookback: 5,
            min_pattern_quality: 0.6,
        }
    }
}

const ADX_STRONG: f64 = 25.0;
const ADX_MODERATE: f64 = 20.0;

/// Confidence blend weights for (ema separation, rsi deviation, adx).
/// Each triple sums to 1. The higher the timeframe, the more EMA structure
/// dominates; H4 leans on momentum instead.
fn confidence_weights(timeframe: Granularity) -> (f64, f64, f64) {
    match timeframe {
        Granularity::Weekly => (0.5, 0.2, 0.3),
        Granularity::Daily => (0.4, 0.3, 0.3),
        Granularity::H4 => (0.3, 0.4, 0.3),
    }
}

/// EMA separation saturates at 1% of the slow EMA.
const EMA_SEPARATION_FULL_SCALE: f64 = 0.01;
/// ADX saturates at 50.
const ADX_FULL_SCALE: f64 = 50.0;

/// Classify the latest bar of one timeframe.
///
/// EMAs still in warm-up yield a sideways, non-tradeable analysis rather
/// than an error; the caller treats that as "no opinion from this timeframe".
pub fn analyze_timeframe(
    candles: &[Candle],
    timeframe: Granularity,
    indicators: &IndicatorSet,
    config: &AnalyzerConfig,
) -> Option<TimeframeAnalysis> {
    if candles.is_empty() {
        return None;
    }
    let index = candles.len() - 1;
    let snapshot = indicators.snapshot_at(candles, index)?;

    let direction = classify_direction(&snapshot);
    let bias = classify_bias(direction, &snapshot);
    let strength = classify_strength(&snapshot);

    let base_tradeable =
        strength != TrendStrength::Weak && direction != TrendDirection::Sideways && bias != Bias::Neutral;

    let tradeable = base_tradeable
        && match timeframe {
            Granularity::Weekly => true,
            Granularity::Daily => passes_pullback_gate(&snapshot, config),
            Granularity::H4 => passes_execution_gate(candles, direction, &snapshot, config),
        };

    let confidence = blend_confidence(timeframe, &snapshot);

    Some(TimeframeAnalysis {
        timeframe,
        direction,
        strength,
        bias,
        tradeable,
        confidence,
        close: snapshot.close,
        ema_fast: snapshot.ema_fast,
        ema_slow: snapshot.ema_slow,
        rsi: snapshot.rsi_or_default(),
        adx: snapshot.adx_or_default(),
        atr: snapshot.atr,
    })
}

fn classify_direction(snapshot: &IndicatorSnapshot) -> TrendDirection {
    match (snapshot.ema_fast, snapshot.ema_slow) {
        (Some(fast), Some(slow)) if fast > slow => TrendDirection::Up,
        (Some(fast), Some(slow)) if fast < slow => TrendDirection::Down,
        _ => TrendDirection::Sideways,
    }
}

fn classify_bias(direction: TrendDirection, snapshot: &IndicatorSnapshot) -> Bias {
    let rsi = snapshot.rsi_or_default();
    match direction {
        TrendDirection::Up if rsi > 50.0 => Bias::Bullish,
        TrendDirection::Down if rsi < 50.0 => Bias::Bearish,
        _ => Bias::Neutral,
    }
}

fn classify_strength(snapshot: &IndicatorSnapshot) -> TrendStrength {
    let adx = snapshot.adx_or_default();
    if adx > ADX_STRONG {
        TrendStrength::Strong
    } else if adx > ADX_MODERATE {
        TrendStrength::Moderate
    } else {
        TrendStrength::Weak
    }
}

/// Daily gate: price must have pulled back to within `pullback_pct` of the
/// fast EMA.
fn passes_pullback_gate(snapshot: &IndicatorSnapshot, config: &AnalyzerConfig) -> bool {
    match snapshot.ema_fast {
        Some(fast) if fast != 0.0 => (snapshot.close - fast).abs() / fast <= config.pullback_pct,
        _ => false,
    }
}

/// H4 gate: close must break the prior N-bar swing high/low in the trend
/// direction, RSI must agree, and the last two candles must show a pattern
/// of at least `min_pattern_quality`.
fn passes_execution_gate(
    candles: &[Candle],
    direction: TrendDirection,
    snapshot: &IndicatorSnapshot,
    config: &AnalyzerConfig,
) -> bool {
    let n = config.breakout_lookback;
    let len = candles.len();
    if len < n + 2 {
        return false;
    }

    let last = &candles[len - 1];
    let prev = &candles[len - 2];
    // swing window: the n bars before the last one.
    let window = &candles[len - 1 - n..len - 1];

    let rsi = snapshot.rsi_or_default();
    let broke_out = match direction {
        TrendDirection::Up => {
            let swing_high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            last.close > swing_high && rsi > 50.0
        }
        TrendDirection::Down => {
            let swing_low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            last.close < swing_low && rsi < 50.0
        }
        TrendDirection::Sideways => false,
    };

    broke_out && pattern_quality(prev, last, direction) >= config.min_pattern_quality
}

fn blend_confidence(timeframe: Granularity, snapshot: &IndicatorSnapshot) -> f64 {
    let (w_sep, w_rsi, w_adx) = confidence_weights(timeframe);

    let separation = match (snapshot.ema_fast, snapshot.ema_slow) {
        (Some(fast), Some(slow)) if slow != 0.0 => {
            ((fast - slow).abs() / slow / EMA_SEPARATION_FULL_SCALE).min(1.0)
        }
        _ => 0.0,
    };
    let rsi_deviation = (snapshot.rsi_or_default() - 50.0).abs() / 50.0;
    let adx_norm = (snapshot.adx_or_default() / ADX_FULL_SCALE).min(1.0);

    (w_sep * separation + w_rsi * rsi_deviation + w_adx * adx_norm).min(1.0)
}
