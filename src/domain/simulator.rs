//! Candle-by-candle backtest replay.
//!
//! Holds at most one open position per pair. An opposite-direction signal
//! closes the open position before opening the new one on the same bar; a
//! same-direction signal is a no-op. Per-bar generator errors degrade that
//! bar to "no signal" and are counted, never raised.

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use super::candle::{CandleSeries, pip_size};
use super::error::FxSignalError;
use super::signal::{SignalGenerator, TradeAction, TradingSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// The one open position a pair may hold during a replay.
#[derive(Debug, Clone)]
pub struct SimulatedPosition {
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub confidence: f64,
}

/// A closed position. Immutable once appended to the trade list.
#[derive(Debug, Clone)]
pub struct SimulatedTrade {
    pub pair: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub pnl_pips: f64,
    pub pnl_currency: f64,
    pub pnl_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_equity: f64,
    pub usd_per_pip: f64,
    pub min_history: usize,
    pub equity_sample_every: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_equity: 10_000.0,
            usd_per_pip: 10.0,
            min_history: 50,
            equity_sample_every: 7,
        }
    }
}

/// Raw replay output, before performance reduction.
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    pub pair: String,
    pub trades: Vec<SimulatedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_equity: f64,
    pub candles_analyzed: usize,
    pub signals_generated: usize,
    pub suppressed_errors: usize,
}

/// Replay one pair's series through a signal generator.
///
/// Fails up front when the series is shorter than the configured minimum;
/// past that point nothing raises, every per-bar problem is counted in
/// `suppressed_errors` and the replay continues.
pub fn run_backtest(
    series: &CandleSeries,
    generator: &dyn SignalGenerator,
    config: &BacktestConfig,
) -> Result<SimulationOutcome, FxSignalError> {
    if series.len() < config.min_history {
        return Err(FxSignalError::InsufficientData {
            pair: series.pair().to_string(),
            bars: series.len(),
            minimum: config.min_history,
        });
    }

    let pip = pip_size(series.pair());
    let sample_every = config.equity_sample_every.max(1);

    let mut equity = config.initial_equity;
    let mut position: Option<SimulatedPosition> = None;
    let mut trades: Vec<SimulatedTrade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::new();
    let mut signals_generated = 0usize;
    let mut suppressed_errors = 0usize;

    for index in config.min_history..series.len() {
        let candle = &series.candles()[index];

        let signal = match generator.generate(series, index) {
            Ok(signal) => signal,
            Err(_) => {
                suppressed_errors += 1;
                None
            }
        };

        if let Some(signal) = signal {
            signals_generated += 1;
            if let Some(side) = entry_side(&signal) {
                match &position {
                    Some(open) if open.side == side => {
                        // Same direction: keep riding the open position.
                    }
                    Some(open) => {
                        let trade = close_position(
                            series.pair(),
                            open,
                            signal.price,
                            signal.timestamp,
                            pip,
                            config.usd_per_pip,
                            equity,
                        );
                        equity += trade.pnl_currency;
                        equity_curve.push(EquityPoint {
                            timestamp: trade.exit_time,
                            equity,
                        });
                        trades.push(trade);
                        position = Some(open_position(&signal, side));
                    }
                    None => {
                        position = Some(open_position(&signal, side));
                    }
                }
            }
        }

        if index % sample_every == 0 {
            equity_curve.push(EquityPoint {
                timestamp: candle.timestamp,
                equity,
            });
        }
    }

    // Force-close anything still open against the final candle.
    if let (Some(open), Some(last)) = (&position, series.last()) {
        let trade = close_position(
            series.pair(),
            open,
            last.close,
            last.timestamp,
            pip,
            config.usd_per_pip,
            equity,
        );
        equity += trade.pnl_currency;
        equity_curve.push(EquityPoint {
            timestamp: trade.exit_time,
            equity,
        });
        trades.push(trade);
    }

    Ok(SimulationOutcome {
        pair: series.pair().to_string(),
        trades,
        equity_curve,
        final_equity: equity,
        candles_analyzed: series.len(),
        signals_generated,
        suppressed_errors,
    })
}

/// Run independent per-pair backtests on the rayon pool. Each worker owns
/// its own series and outcome; within one pair the replay stays sequential.
pub fn run_backtests(
    series: &[CandleSeries],
    generator: &dyn SignalGenerator,
    config: &BacktestConfig,
) -> Vec<Result<SimulationOutcome, FxSignalError>> {
    series
        .par_iter()
        .map(|s| run_backtest(s, generator, config))
        .collect()
}

fn entry_side(signal: &TradingSignal) -> Option<Side> {
    match signal.action {
        TradeAction::Buy => Some(Side::Long),
        TradeAction::Sell => Some(Side::Short),
        TradeAction::Hold => None,
    }
}

fn open_position(signal: &TradingSignal, side: Side) -> SimulatedPosition {
    SimulatedPosition {
        side,
        entry_price: signal.price,
        entry_time: signal.timestamp,
        confidence: signal.confidence,
    }
}

fn close_position(
    pair: &str,
    position: &SimulatedPosition,
    exit_price: f64,
    exit_time: DateTime<Utc>,
    pip: f64,
    usd_per_pip: f64,
    equity: f64,
) -> SimulatedTrade {
    let pnl_pips = (exit_price - position.entry_price) * position.side.sign() / pip;
    let pnl_currency = pnl_pips * usd_per_pip;
    let pnl_pct = if equity != 0.0 {
        pnl_currency / equity * 100.0
    } else {
        0.0
    };

    SimulatedTrade {
        pair: pair.to_string(),
        side: position.side,
        entry_price: position.entry_price,
        entry_time: position.entry_time,
        exit_price,
        exit_time,
        pnl_pips,
        pnl_currency,
        pnl_pct,
    }
}
