//! Multi-timeframe confluence scoring.
//!
//! Combines two or three timeframe analyses (ordered coarsest to finest)
//! into one score, a BUY/SELL/HOLD action, and entry/stop/target levels
//! sized from the finest timeframe's ATR.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::analysis::{TimeframeAnalysis, TrendDirection};
use super::signal::TradeAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfluenceStrength {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfluenceConfig {
    /// Minimum score for a signal to be considered tradeable.
    pub min_score: f64,
    pub stop_atr_mult: f64,
    pub target_atr_mult: f64,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        ConfluenceConfig {
            min_score: 1.2,
            stop_atr_mult: 1.5,
            target_atr_mult: 3.0,
        }
    }
}

/// Per-pair priority weights, empirically tuned per instrument. Pairs
/// without an entry weigh 1.0.
#[derive(Debug, Clone, Default)]
pub struct PairWeights {
    weights: HashMap<String, f64>,
}

impl PairWeights {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        PairWeights { weights }
    }

    pub fn set(&mut self, pair: impl Into<String>, weight: f64) {
        self.weights.insert(pair.into(), weight);
    }

    pub fn weight(&self, pair: &str) -> f64 {
        self.weights.get(pair).copied().unwrap_or(1.0)
    }
}

/// The fused multi-timeframe verdict for one pair at one instant.
#[derive(Debug, Clone)]
pub struct ConfluenceAssessment {
    pub pair: String,
    pub timestamp: DateTime<Utc>,
    pub analyses: Vec<TimeframeAnalysis>,
    pub score: f64,
    pub strength: Option<ConfluenceStrength>,
    pub action: TradeAction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub risk_reward: f64,
    pub confidence: f64,
}

/// Score ceiling used to normalize confidence: three strong timeframes.
const MAX_RAW_SCORE: f64 = 3.0;

/// Fuse 2-3 timeframe analyses, ordered coarsest first, finest last.
/// Entry, stop, and target come from the finest timeframe; its ATR must be
/// out of warm-up for the levels to be non-degenerate.
pub fn assess(
    pair: &str,
    timestamp: DateTime<Utc>,
    analyses: Vec<TimeframeAnalysis>,
    weights: &PairWeights,
    config: &ConfluenceConfig,
) -> Option<ConfluenceAssessment> {
    let finest = analyses.last()?;

    let raw_score: f64 = analyses
        .iter()
        .filter(|a| a.tradeable)
        .map(|a| a.strength.score())
        .sum();
    let score = raw_score * weights.weight(pair);

    let action = unanimous_action(&analyses);
    let entry = finest.close;
    let atr = finest.atr.unwrap_or(0.0);

    let (stop, target) = match action {
        TradeAction::Buy => (
            entry - config.stop_atr_mult * atr,
            entry + config.target_atr_mult * atr,
        ),
        TradeAction::Sell => (
            entry + config.stop_atr_mult * atr,
            entry - config.target_atr_mult * atr,
        ),
        TradeAction::Hold => (entry, entry),
    };

    // Degenerate risk (stop == entry) is reported as ratio 0, never an error;
    // callers reject it by policy.
    let risk = (entry - stop).abs();
    let risk_reward = if risk == 0.0 {
        0.0
    } else {
        (target - entry).abs() / risk
    };

    let confidence = (score / MAX_RAW_SCORE).min(1.0) * majority_fraction(&analyses);

    let strength = if score < config.min_score {
        None
    } else if score < 1.5 {
        Some(ConfluenceStrength::Weak)
    } else if score < 2.0 {
        Some(ConfluenceStrength::Moderate)
    } else if score < 2.5 {
        Some(ConfluenceStrength::Strong)
    } else {
        Some(ConfluenceStrength::VeryStrong)
    };

    Some(ConfluenceAssessment {
        pair: pair.to_string(),
        timestamp,
        analyses,
        score,
        strength,
        action,
        entry,
        stop,
        target,
        risk_reward,
        confidence,
    })
}

/// BUY/SELL only when every tradeable timeframe agrees on direction;
/// partial agreement and no-tradeable-timeframes both mean HOLD.
fn unanimous_action(analyses: &[TimeframeAnalysis]) -> TradeAction {
    let mut tradeable = analyses.iter().filter(|a| a.tradeable);
    let Some(first) = tradeable.next() else {
        return TradeAction::Hold;
    };
    if tradeable.any(|a| a.direction != first.direction) {
        return TradeAction::Hold;
    }
    match first.direction {
        TrendDirection::Up => TradeAction::Buy,
        TrendDirection::Down => TradeAction::Sell,
        TrendDirection::Sideways => TradeAction::Hold,
    }
}

/// Fraction of all timeframes (tradeable or not) in the largest directional
/// group. On a tie the fraction is the same whichever group is picked, so
/// the result is deterministic.
fn majority_fraction(analyses: &[TimeframeAnalysis]) -> f64 {
    if analyses.is_empty() {
        return 0.0;
    }
    let up = analyses
        .iter()
        .filter(|a| a.direction == TrendDirection::Up)
        .count();
    let down = analyses
        .iter()
        .filter(|a| a.direction == TrendDirection::Down)
        .count();
    let sideways = analyses.len() - up - down;

    let majority = up.max(down).max(sideways);
    majority as f64 / analyses.len() as f64
}
