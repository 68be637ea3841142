//! Signal generation.
//!
//! Two generator variants behind one trait: a fast/slow EMA crossover
//! detector for the simpler daily and weekly runs, and the multi-timeframe
//! confluence variant that aggregates the input series upward and fuses the
//! per-timeframe analyses. Both evaluate a prefix of the series ending at
//! the given index, so a backtest replay sees exactly what a live run would
//! have seen at that bar.

use chrono::{DateTime, Utc};

use super::aggregate::{aggregate_daily_candles, aggregate_weekly_candles};
use super::analysis::{AnalyzerConfig, TimeframeAnalysis, analyze_timeframe};
use super::candle::{Candle, CandleSeries, Granularity};
use super::confluence::{ConfluenceConfig, PairWeights, assess};
use super::error::FxSignalError;
use super::indicator::{IndicatorConfig, IndicatorSet, ema::calculate_ema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Hold => "HOLD",
        };
        write!(f, "{}", label)
    }
}

/// Terminal output of the signal path.
#[derive(Debug, Clone)]
pub struct TradingSignal {
    pub pair: String,
    pub timeframe: Granularity,
    pub action: TradeAction,
    pub price: f64,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// A strategy that may emit a signal at one bar of a series.
///
/// `Ok(None)` means "no signal at this bar", including the warm-up window
/// before `min_history` bars exist. Errors are reserved for contract
/// violations such as an out-of-range index.
pub trait SignalGenerator: Send + Sync {
    fn generate(
        &self,
        series: &CandleSeries,
        index: usize,
    ) -> Result<Option<TradingSignal>, FxSignalError>;

    /// Bars required before the generator can emit anything.
    fn min_history(&self) -> usize;
}

pub const DEFAULT_MIN_HISTORY: usize = 50;

/// Fixed confidence for crossover signals; crossover carries no magnitude
/// information, unlike the confluence score.
const CROSSOVER_CONFIDENCE: f64 = 0.7;

/// Fires exactly at the bar where the fast EMA crosses the slow one.
/// Equality on the previous bar counts as "not yet crossed", equality on the
/// current bar is not a crossover.
#[derive(Debug, Clone)]
pub struct CrossoverSignalGenerator {
    config: IndicatorConfig,
    min_history: usize,
}

impl CrossoverSignalGenerator {
    pub fn new(config: IndicatorConfig) -> Self {
        CrossoverSignalGenerator {
            config,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }

    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history;
        self
    }
}

impl SignalGenerator for CrossoverSignalGenerator {
    fn generate(
        &self,
        series: &CandleSeries,
        index: usize,
    ) -> Result<Option<TradingSignal>, FxSignalError> {
        let candles = checked_prefix(series, index)?;
        if candles.len() < self.min_history.max(2) {
            return Ok(None);
        }

        let fast = calculate_ema(candles, self.config.ema_fast);
        let slow = calculate_ema(candles, self.config.ema_slow);

        let (Some(fast_prev), Some(slow_prev), Some(fast_now), Some(slow_now)) = (
            fast.at(index - 1),
            slow.at(index - 1),
            fast.at(index),
            slow.at(index),
        ) else {
            return Ok(None);
        };

        let action = if fast_prev <= slow_prev && fast_now > slow_now {
            TradeAction::Buy
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            TradeAction::Sell
        } else {
            return Ok(None);
        };

        let candle = &candles[index];
        Ok(Some(TradingSignal {
            pair: series.pair().to_string(),
            timeframe: series.granularity(),
            action,
            price: candle.close,
            ema_fast: Some(fast_now),
            ema_slow: Some(slow_now),
            confidence: CROSSOVER_CONFIDENCE,
            timestamp: candle.timestamp,
        }))
    }

    fn min_history(&self) -> usize {
        self.min_history
    }
}

/// Aggregates the input upward (H4 → daily + weekly, daily → weekly),
/// analyzes each timeframe, and emits a signal when the fused score clears
/// the configured threshold with a unanimous direction.
#[derive(Debug, Clone)]
pub struct ConfluenceSignalGenerator {
    indicator: IndicatorConfig,
    analyzer: AnalyzerConfig,
    confluence: ConfluenceConfig,
    weights: PairWeights,
    min_history: usize,
}

impl ConfluenceSignalGenerator {
    pub fn new(
        indicator: IndicatorConfig,
        analyzer: AnalyzerConfig,
        confluence: ConfluenceConfig,
        weights: PairWeights,
    ) -> Self {
        ConfluenceSignalGenerator {
            indicator,
            analyzer,
            confluence,
            weights,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }

    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history;
        self
    }

    /// Timeframe stack for an input granularity, coarsest first.
    fn analyses_for(
        &self,
        prefix: &[Candle],
        input: Granularity,
    ) -> Result<Vec<TimeframeAnalysis>, FxSignalError> {
        let mut stacks: Vec<(Granularity, Vec<Candle>)> = Vec::new();
        match input {
            Granularity::H4 => {
                stacks.push((Granularity::Weekly, aggregate_weekly_candles(prefix)?));
                stacks.push((Granularity::Daily, aggregate_daily_candles(prefix)?));
                stacks.push((Granularity::H4, prefix.to_vec()));
            }
            Granularity::Daily => {
                stacks.push((Granularity::Weekly, aggregate_weekly_candles(prefix)?));
                stacks.push((Granularity::Daily, prefix.to_vec()));
            }
            Granularity::Weekly => {
                stacks.push((Granularity::Weekly, prefix.to_vec()));
            }
        }

        let mut analyses = Vec::with_capacity(stacks.len());
        for (timeframe, candles) in &stacks {
            let indicators = IndicatorSet::compute(candles, &self.indicator);
            if let Some(analysis) =
                analyze_timeframe(candles, *timeframe, &indicators, &self.analyzer)
            {
                analyses.push(analysis);
            }
        }
        Ok(analyses)
    }
}

impl SignalGenerator for ConfluenceSignalGenerator {
    fn generate(
        &self,
        series: &CandleSeries,
        index: usize,
    ) -> Result<Option<TradingSignal>, FxSignalError> {
        let prefix = checked_prefix(series, index)?;
        if prefix.len() < self.min_history {
            return Ok(None);
        }

        let analyses = self.analyses_for(prefix, series.granularity())?;
        let timestamp = prefix[index].timestamp;

        let Some(assessment) = assess(
            series.pair(),
            timestamp,
            analyses,
            &self.weights,
            &self.confluence,
        ) else {
            return Ok(None);
        };

        if assessment.score < self.confluence.min_score
            || assessment.action == TradeAction::Hold
        {
            return Ok(None);
        }

        let finest = assessment.analyses.last();
        Ok(Some(TradingSignal {
            pair: assessment.pair,
            timeframe: series.granularity(),
            action: assessment.action,
            price: assessment.entry,
            ema_fast: finest.and_then(|a| a.ema_fast),
            ema_slow: finest.and_then(|a| a.ema_slow),
            confidence: assessment.confidence,
            timestamp,
        }))
    }

    fn min_history(&self) -> usize {
        self.min_history
    }
}

/// The candles up to and including `index`, or an error when the index is
/// outside the series.
fn checked_prefix<'a>(
    series: &'a CandleSeries,
    index: usize,
) -> Result<&'a [Candle], FxSignalError> {
    if index >= series.len() {
        return Err(FxSignalError::IndexOutOfRange {
            pair: series.pair().to_string(),
            index,
            len: series.len(),
        });
    }
    Ok(&series.candles()[..=index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn h4_series(closes: &[f64]) -> CandleSeries {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::hours(4 * i as i64),
                open: close,
                high: close + 0.001,
                low: close - 0.001,
                close,
                volume: 100.0,
            })
            .collect();
        CandleSeries::new("EUR_USD", Granularity::H4, candles).unwrap()
    }

    fn daily_series(closes: &[f64]) -> CandleSeries {
        // 2024-01-01 is a Monday, so weekly aggregation starts on a boundary.
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::days(i as i64),
                open: close - 0.0008,
                high: close + 0.0002,
                low: close - 0.001,
                close,
                volume: 100.0,
            })
            .collect();
        CandleSeries::new("EUR_USD", Granularity::Daily, candles).unwrap()
    }

    fn short_config() -> IndicatorConfig {
        IndicatorConfig {
            ema_fast: 3,
            ema_slow: 6,
            rsi_period: 3,
            adx_period: 3,
            atr_period: 3,
        }
    }

    fn v_shape(down: usize, up: usize) -> Vec<f64> {
        let mut closes: Vec<f64> = (0..down).map(|i| 1.30 - i as f64 * 0.002).collect();
        let bottom = *closes.last().unwrap();
        closes.extend((1..=up).map(|i| bottom + i as f64 * 0.004));
        closes
    }

    #[test]
    fn crossover_fires_exactly_once() {
        let series = h4_series(&v_shape(12, 12));
        let generator = CrossoverSignalGenerator::new(short_config()).with_min_history(8);

        let mut buys = 0;
        let mut sells = 0;
        for index in 0..series.len() {
            if let Some(signal) = generator.generate(&series, index).unwrap() {
                match signal.action {
                    TradeAction::Buy => buys += 1,
                    TradeAction::Sell => sells += 1,
                    TradeAction::Hold => panic!("crossover never emits HOLD"),
                }
            }
        }
        assert_eq!(buys, 1);
        assert_eq!(sells, 0);
    }

    #[test]
    fn crossover_is_idempotent_per_index() {
        let series = h4_series(&v_shape(12, 12));
        let generator = CrossoverSignalGenerator::new(short_config()).with_min_history(8);

        for index in 0..series.len() {
            let first = generator.generate(&series, index).unwrap();
            let second = generator.generate(&series, index).unwrap();
            assert_eq!(first.map(|s| s.action), second.map(|s| s.action));
        }
    }

    #[test]
    fn crossover_signal_carries_bar_context() {
        let series = h4_series(&v_shape(12, 12));
        let generator = CrossoverSignalGenerator::new(short_config()).with_min_history(8);

        let signal = (0..series.len())
            .find_map(|i| generator.generate(&series, i).unwrap())
            .unwrap();

        assert_eq!(signal.pair, "EUR_USD");
        assert_eq!(signal.timeframe, Granularity::H4);
        assert!((signal.confidence - 0.7).abs() < f64::EPSILON);
        assert!(signal.ema_fast.unwrap() > signal.ema_slow.unwrap());
    }

    #[test]
    fn crossover_respects_min_history() {
        let series = h4_series(&v_shape(12, 12));
        let generator = CrossoverSignalGenerator::new(short_config()).with_min_history(100);
        for index in 0..series.len() {
            assert!(generator.generate(&series, index).unwrap().is_none());
        }
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let series = h4_series(&v_shape(6, 6));
        let generator = CrossoverSignalGenerator::new(short_config()).with_min_history(4);
        let result = generator.generate(&series, series.len());
        assert!(matches!(
            result,
            Err(FxSignalError::IndexOutOfRange { .. })
        ));
    }

    fn confluence_generator() -> ConfluenceSignalGenerator {
        ConfluenceSignalGenerator::new(
            short_config(),
            AnalyzerConfig::default(),
            ConfluenceConfig::default(),
            PairWeights::default(),
        )
        .with_min_history(40)
    }

    #[test]
    fn confluence_buy_on_gentle_daily_uptrend() {
        // Slope small enough that price stays within the daily pullback band
        // of the fast EMA; the weekly stack agrees on direction.
        let closes: Vec<f64> = (0..60).map(|i| 1.10 + i as f64 * 0.001).collect();
        let series = daily_series(&closes);
        let generator = confluence_generator();

        let signal = generator
            .generate(&series, series.len() - 1)
            .unwrap()
            .expect("uptrend should emit a signal");

        assert_eq!(signal.action, TradeAction::Buy);
        assert!((signal.price - closes[59]).abs() < 1e-12);
        assert!(signal.confidence > 0.0 && signal.confidence <= 1.0);
    }

    #[test]
    fn confluence_holds_on_flat_series() {
        let closes = vec![1.10; 60];
        let series = daily_series(&closes);
        let generator = confluence_generator();
        assert!(generator.generate(&series, 59).unwrap().is_none());
    }

    #[test]
    fn confluence_respects_min_history() {
        let closes: Vec<f64> = (0..60).map(|i| 1.10 + i as f64 * 0.001).collect();
        let series = daily_series(&closes);
        let generator = confluence_generator();
        assert!(generator.generate(&series, 20).unwrap().is_none());
    }
}
