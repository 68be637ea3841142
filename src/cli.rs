//! CLI definition and dispatch.
//!
//! Progress and summaries go to stderr; machine-readable JSON goes to
//! stdout so runs can be piped into other tools.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_adapter::JsonPriceAdapter;
use crate::domain::analysis::AnalyzerConfig;
use crate::domain::candle::{CandleSeries, Granularity};
use crate::domain::config_validation::{validate_backtest_config, validate_strategy_config};
use crate::domain::confluence::{ConfluenceConfig, PairWeights};
use crate::domain::error::FxSignalError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::performance::{BacktestResult, summarize};
use crate::domain::signal::{
    ConfluenceSignalGenerator, CrossoverSignalGenerator, SignalGenerator, TradingSignal,
};
use crate::domain::simulator::{BacktestConfig, run_backtests};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

#[derive(Parser, Debug)]
#[command(name = "fxsignal", about = "Multi-timeframe FX signal generator and backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run backtests over the configured pairs
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Restrict the run to one pair
        #[arg(long)]
        pair: Option<String>,
        /// Override the data directory from the config
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Evaluate the latest signal for the configured pairs
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        pair: Option<String>,
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// List pairs available in the data directory
    ListPairs {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest { config, pair, data } => {
            run_backtest(&config, pair.as_deref(), data.as_ref())
        }
        Command::Signal { config, pair, data } => {
            run_signal(&config, pair.as_deref(), data.as_ref())
        }
        Command::ListPairs { config, data } => run_list_pairs(&config, data.as_ref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = FxSignalError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(config_path: &PathBuf, pair_override: Option<&str>, data_override: Option<&PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let bt_config = build_backtest_config(&adapter);
    let generator = build_generator(&adapter);
    let granularity = configured_granularity(&adapter);
    let history_count = adapter.get_int("backtest", "history_count", 500).max(0) as usize;

    let price_port = match build_price_port(&adapter, data_override) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let pairs = resolve_pairs(pair_override, &adapter);
    if pairs.is_empty() {
        eprintln!("error: no pairs configured");
        return ExitCode::from(2);
    }

    eprintln!(
        "Backtesting {} pair(s) at {} over up to {} candles...",
        pairs.len(),
        granularity,
        history_count
    );

    let mut all_series = Vec::with_capacity(pairs.len());
    for pair in &pairs {
        let series = match load_series(price_port.as_ref(), pair, granularity, history_count) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        all_series.push(series);
    }

    let outcomes = run_backtests(&all_series, generator.as_ref(), &bt_config);

    let mut results: Vec<BacktestResult> = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(outcome) => results.push(summarize(&outcome, bt_config.initial_equity)),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    for result in &results {
        eprintln!(
            "{}: return {:.2}%, {} trades, win rate {:.1}%, max drawdown {:.2}%, grade {}",
            result.pair,
            result.total_return_pct,
            result.total_trades,
            result.win_rate,
            result.max_drawdown_pct,
            result.grade
        );
        if result.suppressed_errors > 0 {
            eprintln!(
                "{}: {} bar(s) degraded to no-signal due to generator errors",
                result.pair, result.suppressed_errors
            );
        }
    }

    let report: Vec<BacktestReport> = results.iter().map(BacktestReport::from).collect();
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: failed to serialize results: {e}");
            return ExitCode::from(1);
        }
    }

    ExitCode::SUCCESS
}

fn run_signal(config_path: &PathBuf, pair_override: Option<&str>, data_override: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let generator = build_generator(&adapter);
    let granularity = configured_granularity(&adapter);
    let history_count = adapter.get_int("backtest", "history_count", 500).max(0) as usize;

    let price_port = match build_price_port(&adapter, data_override) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let pairs = resolve_pairs(pair_override, &adapter);
    if pairs.is_empty() {
        eprintln!("error: no pairs configured");
        return ExitCode::from(2);
    }

    let mut reports: Vec<SignalReport> = Vec::new();
    for pair in &pairs {
        let series = match load_series(price_port.as_ref(), pair, granularity, history_count) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        match generator.generate(&series, series.len() - 1) {
            Ok(Some(signal)) => {
                eprintln!(
                    "{}: {} at {:.5} (confidence {:.2})",
                    pair, signal.action, signal.price, signal.confidence
                );
                reports.push(SignalReport::from(&signal));
            }
            Ok(None) => eprintln!("{}: no signal", pair),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: failed to serialize signals: {e}");
            return ExitCode::from(1);
        }
    }

    ExitCode::SUCCESS
}

fn run_list_pairs(config_path: &PathBuf, data_override: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let price_port = match build_price_port(&adapter, data_override) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match price_port.list_pairs() {
        Ok(pairs) => {
            for pair in pairs {
                println!("{pair}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("{} is valid", config_path.display());
    ExitCode::SUCCESS
}

fn load_series(
    port: &dyn PricePort,
    pair: &str,
    granularity: Granularity,
    count: usize,
) -> Result<CandleSeries, FxSignalError> {
    let candles = port.get_history(pair, granularity, count)?;
    if candles.is_empty() {
        return Err(FxSignalError::NoData {
            pair: pair.to_string(),
            granularity: granularity.code().to_string(),
        });
    }
    CandleSeries::new(pair, granularity, candles)
}

fn resolve_pairs(pair_override: Option<&str>, adapter: &dyn ConfigPort) -> Vec<String> {
    if let Some(pair) = pair_override {
        return vec![pair.to_string()];
    }
    adapter
        .get_string("backtest", "pairs")
        .map(|s| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn configured_granularity(adapter: &dyn ConfigPort) -> Granularity {
    adapter
        .get_string("backtest", "granularity")
        .and_then(|code| Granularity::from_code(&code))
        .unwrap_or(Granularity::Daily)
}

fn build_price_port(
    adapter: &dyn ConfigPort,
    data_override: Option<&PathBuf>,
) -> Result<Box<dyn PricePort>, FxSignalError> {
    let base_path = match data_override {
        Some(path) => path.clone(),
        None => PathBuf::from(
            adapter
                .get_string("data", "path")
                .unwrap_or_else(|| ".".to_string()),
        ),
    };

    let format = adapter
        .get_string("data", "format")
        .unwrap_or_else(|| "csv".to_string());
    match format.to_lowercase().as_str() {
        "csv" => Ok(Box::new(CsvPriceAdapter::new(base_path))),
        "json" => Ok(Box::new(JsonPriceAdapter::new(base_path))),
        other => Err(FxSignalError::ConfigInvalid {
            section: "data".into(),
            key: "format".into(),
            reason: format!("unknown data format {}, expected csv or json", other),
        }),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    let defaults = BacktestConfig::default();
    BacktestConfig {
        initial_equity: adapter.get_double("backtest", "initial_equity", defaults.initial_equity),
        usd_per_pip: adapter.get_double("backtest", "usd_per_pip", defaults.usd_per_pip),
        min_history: adapter.get_int("backtest", "min_history", defaults.min_history as i64) as usize,
        equity_sample_every: adapter.get_int(
            "backtest",
            "equity_sample_every",
            defaults.equity_sample_every as i64,
        ) as usize,
    }
}

pub fn build_indicator_config(adapter: &dyn ConfigPort) -> IndicatorConfig {
    let defaults = IndicatorConfig::default();
    IndicatorConfig {
        ema_fast: adapter.get_int("indicator", "ema_fast", defaults.ema_fast as i64) as usize,
        ema_slow: adapter.get_int("indicator", "ema_slow", defaults.ema_slow as i64) as usize,
        rsi_period: adapter.get_int("indicator", "rsi_period", defaults.rsi_period as i64) as usize,
        adx_period: adapter.get_int("indicator", "adx_period", defaults.adx_period as i64) as usize,
        atr_period: adapter.get_int("indicator", "atr_period", defaults.atr_period as i64) as usize,
    }
}

pub fn build_analyzer_config(adapter: &dyn ConfigPort) -> AnalyzerConfig {
    let defaults = AnalyzerConfig::default();
    AnalyzerConfig {
        pullback_pct: adapter.get_double("analyzer", "pullback_pct", defaults.pullback_pct),
        breakout_lookback: adapter.get_int(
            "analyzer",
            "breakout_lookback",
            defaults.breakout_lookback as i64,
        ) as usize,
        min_pattern_quality: adapter.get_double(
            "analyzer",
            "min_pattern_quality",
            defaults.min_pattern_quality,
        ),
    }
}

pub fn build_confluence_config(adapter: &dyn ConfigPort) -> ConfluenceConfig {
    let defaults = ConfluenceConfig::default();
    ConfluenceConfig {
        min_score: adapter.get_double("confluence", "min_score", defaults.min_score),
        stop_atr_mult: adapter.get_double("confluence", "stop_atr_mult", defaults.stop_atr_mult),
        target_atr_mult: adapter.get_double(
            "confluence",
            "target_atr_mult",
            defaults.target_atr_mult,
        ),
    }
}

/// INI keys come back lowercased; pair names are stored uppercase.
pub fn build_pair_weights(adapter: &dyn ConfigPort) -> PairWeights {
    let mut weights = PairWeights::default();
    for key in adapter.keys("pair_weights") {
        let value = adapter.get_double("pair_weights", &key, 1.0);
        weights.set(key.to_uppercase(), value);
    }
    weights
}

/// Strategy variant selection: `[strategy] variant = confluence | crossover`.
pub fn build_generator(adapter: &dyn ConfigPort) -> Box<dyn SignalGenerator> {
    let indicator = build_indicator_config(adapter);
    let min_history = adapter.get_int("backtest", "min_history", 50).max(2) as usize;

    let variant = adapter
        .get_string("strategy", "variant")
        .unwrap_or_else(|| "confluence".to_string());

    if variant.to_lowercase() == "crossover" {
        Box::new(CrossoverSignalGenerator::new(indicator).with_min_history(min_history))
    } else {
        Box::new(
            ConfluenceSignalGenerator::new(
                indicator,
                build_analyzer_config(adapter),
                build_confluence_config(adapter),
                build_pair_weights(adapter),
            )
            .with_min_history(min_history),
        )
    }
}

#[derive(Debug, Serialize)]
struct BacktestReport {
    pair: String,
    total_return_pct: f64,
    total_trades: usize,
    win_rate: f64,
    max_drawdown_pct: f64,
    sharpe_like: f64,
    candles_analyzed: usize,
    signals_generated: usize,
    suppressed_errors: usize,
    grade: String,
}

impl From<&BacktestResult> for BacktestReport {
    fn from(result: &BacktestResult) -> Self {
        BacktestReport {
            pair: result.pair.clone(),
            total_return_pct: result.total_return_pct,
            total_trades: result.total_trades,
            win_rate: result.win_rate,
            max_drawdown_pct: result.max_drawdown_pct,
            sharpe_like: result.sharpe_like,
            candles_analyzed: result.candles_analyzed,
            signals_generated: result.signals_generated,
            suppressed_errors: result.suppressed_errors,
            grade: result.grade.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SignalReport {
    pair: String,
    timeframe: String,
    action: String,
    price: f64,
    ema_fast: Option<f64>,
    ema_slow: Option<f64>,
    confidence: f64,
    timestamp: String,
}

impl From<&TradingSignal> for SignalReport {
    fn from(signal: &TradingSignal) -> Self {
        SignalReport {
            pair: signal.pair.clone(),
            timeframe: signal.timeframe.code().to_string(),
            action: signal.action.to_string(),
            price: signal.price,
            ema_fast: signal.ema_fast,
            ema_slow: signal.ema_slow,
            confidence: signal.confidence,
            timestamp: signal.timestamp.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[backtest]
pairs = EUR_USD, USD_JPY
granularity = H4
initial_equity = 25000
usd_per_pip = 8.0
min_history = 60
equity_sample_every = 5
history_count = 400

[indicator]
ema_fast = 10
ema_slow = 30

[strategy]
variant = crossover

[pair_weights]
EUR_USD = 1.2
"#;

    fn adapter() -> FileConfigAdapter {
        FileConfigAdapter::from_string(CONFIG).unwrap()
    }

    #[test]
    fn backtest_config_from_ini() {
        let config = build_backtest_config(&adapter());
        assert!((config.initial_equity - 25_000.0).abs() < 1e-9);
        assert!((config.usd_per_pip - 8.0).abs() < 1e-9);
        assert_eq!(config.min_history, 60);
        assert_eq!(config.equity_sample_every, 5);
    }

    #[test]
    fn indicator_config_merges_defaults() {
        let config = build_indicator_config(&adapter());
        assert_eq!(config.ema_fast, 10);
        assert_eq!(config.ema_slow, 30);
        assert_eq!(config.rsi_period, 14);
    }

    #[test]
    fn pair_list_is_trimmed() {
        let pairs = resolve_pairs(None, &adapter());
        assert_eq!(pairs, vec!["EUR_USD".to_string(), "USD_JPY".to_string()]);
    }

    #[test]
    fn pair_override_wins() {
        let pairs = resolve_pairs(Some("GBP_JPY"), &adapter());
        assert_eq!(pairs, vec!["GBP_JPY".to_string()]);
    }

    #[test]
    fn granularity_defaults_to_daily() {
        let empty = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert_eq!(configured_granularity(&empty), Granularity::Daily);
        assert_eq!(configured_granularity(&adapter()), Granularity::H4);
    }

    #[test]
    fn pair_weights_are_uppercased() {
        let weights = build_pair_weights(&adapter());
        assert!((weights.weight("EUR_USD") - 1.2).abs() < 1e-9);
        assert!((weights.weight("GBP_JPY") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn generator_variant_selection() {
        let generator = build_generator(&adapter());
        assert_eq!(generator.min_history(), 60);
    }
}
