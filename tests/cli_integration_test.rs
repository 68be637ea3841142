//! CLI orchestration tests with real INI and CSV files on disk.

mod common;

use std::io::Write;
use std::path::PathBuf;

use common::*;
use fxsignal::adapters::csv_adapter::CsvPriceAdapter;
use fxsignal::cli;
use fxsignal::domain::candle::{CandleSeries, Granularity};
use fxsignal::domain::config_validation::{validate_backtest_config, validate_strategy_config};
use fxsignal::domain::performance::summarize;
use fxsignal::domain::simulator::run_backtest;
use fxsignal::ports::price_port::PricePort;

const VALID_INI: &str = r#"
[backtest]
pairs = EUR_USD
granularity = H4
initial_equity = 10000
usd_per_pip = 10.0
min_history = 8
equity_sample_every = 7
history_count = 200

[indicator]
ema_fast = 3
ema_slow = 6
rsi_period = 3
adx_period = 3
atr_period = 3

[strategy]
variant = crossover

[data]
format = csv
"#;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_candles_csv(dir: &tempfile::TempDir, pair: &str, closes: &[f64]) {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for candle in h4_candles(closes) {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            candle.timestamp.format("%Y-%m-%d %H:%M:%S"),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        ));
    }
    let mut file =
        std::fs::File::create(dir.path().join(format!("{}_H4.csv", pair))).unwrap();
    write!(file, "{}", out).unwrap();
}

#[test]
fn config_loads_and_validates_from_disk() {
    let file = write_temp_ini(VALID_INI);
    let adapter = cli::load_config(&PathBuf::from(file.path())).unwrap();

    assert!(validate_backtest_config(&adapter).is_ok());
    assert!(validate_strategy_config(&adapter).is_ok());

    let config = cli::build_backtest_config(&adapter);
    assert_eq!(config.min_history, 8);
    let indicator = cli::build_indicator_config(&adapter);
    assert_eq!(indicator.ema_fast, 3);
    assert_eq!(indicator.ema_slow, 6);
}

#[test]
fn invalid_ini_surfaces_a_validation_error() {
    let file = write_temp_ini("[backtest]\npairs = EUR_USD\ninitial_equity = -5\n");
    let adapter = cli::load_config(&PathBuf::from(file.path())).unwrap();
    assert!(validate_backtest_config(&adapter).is_err());
}

#[test]
fn csv_data_dir_feeds_a_complete_backtest() {
    let data_dir = tempfile::TempDir::new().unwrap();
    write_candles_csv(&data_dir, "EUR_USD", &v_shape(20, 40));

    let config_file = write_temp_ini(VALID_INI);
    let adapter = cli::load_config(&PathBuf::from(config_file.path())).unwrap();

    let port = CsvPriceAdapter::new(data_dir.path().to_path_buf());
    let candles = port.get_history("EUR_USD", Granularity::H4, 200).unwrap();
    let series = CandleSeries::new("EUR_USD", Granularity::H4, candles).unwrap();

    let generator = cli::build_generator(&adapter);
    let config = cli::build_backtest_config(&adapter);

    let outcome = run_backtest(&series, generator.as_ref(), &config).unwrap();
    let result = summarize(&outcome, config.initial_equity);

    assert_eq!(result.pair, "EUR_USD");
    assert_eq!(result.total_trades, 1);
    assert!(result.total_return_pct > 0.0);
}

#[test]
fn generator_selection_honors_the_variant_key() {
    let confluence_ini = VALID_INI.replace("variant = crossover", "variant = confluence");
    let file = write_temp_ini(&confluence_ini);
    let adapter = cli::load_config(&PathBuf::from(file.path())).unwrap();
    let generator = cli::build_generator(&adapter);
    assert_eq!(generator.min_history(), 8);
}
