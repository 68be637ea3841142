//! Backtest performance reduction.
//!
//! Reduces a simulation outcome to return, win rate, max drawdown, a
//! Sharpe-like ratio over trade-level returns (deliberately unannualized,
//! it is only used comparatively), and a letter grade.

use super::simulator::{EquityPoint, SimulationOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        };
        write!(f, "{}", label)
    }
}

/// Aggregated result for one pair, one run. Immutable.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub pair: String,
    pub total_return_pct: f64,
    pub total_trades: usize,
    pub win_rate: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_like: f64,
    pub candles_analyzed: usize,
    pub signals_generated: usize,
    pub suppressed_errors: usize,
    pub grade: Grade,
}

pub fn summarize(outcome: &SimulationOutcome, initial_equity: f64) -> BacktestResult {
    let total_return_pct = if initial_equity != 0.0 {
        (outcome.final_equity - initial_equity) / initial_equity * 100.0
    } else {
        0.0
    };

    let total_trades = outcome.trades.len();
    let wins = outcome.trades.iter().filter(|t| t.pnl_currency > 0.0).count();
    let win_rate = if total_trades > 0 {
        wins as f64 / total_trades as f64 * 100.0
    } else {
        0.0
    };

    let max_drawdown_pct = max_drawdown(&outcome.equity_curve);
    let sharpe_like = sharpe_like_ratio(outcome);
    let grade = grade(total_return_pct, win_rate);

    BacktestResult {
        pair: outcome.pair.clone(),
        total_return_pct,
        total_trades,
        win_rate,
        max_drawdown_pct,
        sharpe_like,
        candles_analyzed: outcome.candles_analyzed,
        signals_generated: outcome.signals_generated,
        suppressed_errors: outcome.suppressed_errors,
        grade,
    }
}

/// Largest percentage decline from a running equity peak.
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;
    for point in curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            worst = worst.max((peak - point.equity) / peak * 100.0);
        }
    }
    worst
}

/// mean(trade pnl_pct) / population stdev(trade pnl_pct); 0 when there are
/// no trades or the stdev is 0.
fn sharpe_like_ratio(outcome: &SimulationOutcome) -> f64 {
    let n = outcome.trades.len();
    if n == 0 {
        return 0.0;
    }
    let mean = outcome.trades.iter().map(|t| t.pnl_pct).sum::<f64>() / n as f64;
    let variance = outcome
        .trades
        .iter()
        .map(|t| (t.pnl_pct - mean).powi(2))
        .sum::<f64>()
        / n as f64;
    let stdev = variance.sqrt();
    if stdev == 0.0 { 0.0 } else { mean / stdev }
}

fn grade(total_return_pct: f64, win_rate: f64) -> Grade {
    if total_return_pct >= 20.0 && win_rate >= 60.0 {
        Grade::A
    } else if total_return_pct >= 10.0 && win_rate >= 50.0 {
        Grade::B
    } else if total_return_pct >= 0.0 && win_rate >= 40.0 {
        Grade::C
    } else {
        Grade::D
    }
}
