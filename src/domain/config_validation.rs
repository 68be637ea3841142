//! Configuration validation.
//!
//! Validates every config field before a run so a bad value fails fast with
//! a precise section/key message instead of surfacing mid-backtest.

use crate::domain::candle::Granularity;
use crate::domain::error::FxSignalError;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    validate_pairs(config)?;
    validate_granularity(config)?;
    validate_initial_equity(config)?;
    validate_usd_per_pip(config)?;
    validate_min_history(config)?;
    validate_equity_sample_every(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    validate_indicator_periods(config)?;
    validate_analyzer_gates(config)?;
    validate_confluence_thresholds(config)?;
    validate_pair_weights(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> FxSignalError {
    FxSignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_pairs(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    match config.get_string("backtest", "pairs") {
        Some(s) if s.split(',').any(|p| !p.trim().is_empty()) => Ok(()),
        Some(_) => Err(invalid("backtest", "pairs", "pairs must not be empty")),
        None => Err(FxSignalError::ConfigMissing {
            section: "backtest".to_string(),
            key: "pairs".to_string(),
        }),
    }
}

fn validate_granularity(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    match config.get_string("backtest", "granularity") {
        None => Ok(()),
        Some(code) if Granularity::from_code(&code).is_some() => Ok(()),
        Some(code) => Err(invalid(
            "backtest",
            "granularity",
            format!("unknown granularity {}, expected H4, D, or W", code),
        )),
    }
}

fn validate_initial_equity(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    let value = config.get_double("backtest", "initial_equity", 10_000.0);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_equity",
            "initial_equity must be positive",
        ));
    }
    Ok(())
}

fn validate_usd_per_pip(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    let value = config.get_double("backtest", "usd_per_pip", 10.0);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "usd_per_pip",
            "usd_per_pip must be positive",
        ));
    }
    Ok(())
}

fn validate_min_history(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    let value = config.get_int("backtest", "min_history", 50);
    if value < 2 {
        return Err(invalid(
            "backtest",
            "min_history",
            "min_history must be at least 2",
        ));
    }
    Ok(())
}

fn validate_equity_sample_every(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    let value = config.get_int("backtest", "equity_sample_every", 7);
    if value < 1 {
        return Err(invalid(
            "backtest",
            "equity_sample_every",
            "equity_sample_every must be at least 1",
        ));
    }
    Ok(())
}

fn validate_indicator_periods(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    for key in ["ema_fast", "ema_slow", "rsi_period", "adx_period", "atr_period"] {
        let default = match key {
            "ema_fast" => 20,
            "ema_slow" => 50,
            _ => 14,
        };
        let value = config.get_int("indicator", key, default);
        if value < 1 {
            return Err(invalid(
                "indicator",
                key,
                format!("{} must be at least 1", key),
            ));
        }
    }

    let fast = config.get_int("indicator", "ema_fast", 20);
    let slow = config.get_int("indicator", "ema_slow", 50);
    if fast >= slow {
        return Err(invalid(
            "indicator",
            "ema_fast",
            "ema_fast must be shorter than ema_slow",
        ));
    }
    Ok(())
}

fn validate_analyzer_gates(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    let pullback = config.get_double("analyzer", "pullback_pct", 0.002);
    if pullback <= 0.0 || pullback >= 1.0 {
        return Err(invalid(
            "analyzer",
            "pullback_pct",
            "pullback_pct must be between 0 and 1",
        ));
    }

    let lookback = config.get_int("analyzer", "breakout_lookback", 5);
    if lookback < 1 {
        return Err(invalid(
            "analyzer",
            "breakout_lookback",
            "breakout_lookback must be at least 1",
        ));
    }

    let quality = config.get_double("analyzer", "min_pattern_quality", 0.6);
    if !(0.0..=1.0).contains(&quality) {
        return Err(invalid(
            "analyzer",
            "min_pattern_quality",
            "min_pattern_quality must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_confluence_thresholds(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    let min_score = config.get_double("confluence", "min_score", 1.2);
    if min_score <= 0.0 {
        return Err(invalid(
            "confluence",
            "min_score",
            "min_score must be positive",
        ));
    }

    let stop = config.get_double("confluence", "stop_atr_mult", 1.5);
    let target = config.get_double("confluence", "target_atr_mult", 3.0);
    if stop <= 0.0 {
        return Err(invalid(
            "confluence",
            "stop_atr_mult",
            "stop_atr_mult must be positive",
        ));
    }
    if target <= 0.0 {
        return Err(invalid(
            "confluence",
            "target_atr_mult",
            "target_atr_mult must be positive",
        ));
    }
    Ok(())
}

fn validate_pair_weights(config: &dyn ConfigPort) -> Result<(), FxSignalError> {
    for key in config.keys("pair_weights") {
        let value = config.get_double("pair_weights", &key, 1.0);
        if value <= 0.0 {
            return Err(invalid(
                "pair_weights",
                &key,
                "pair weights must be positive",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = r#"
[backtest]
pairs = EUR_USD,USD_JPY
granularity = D
initial_equity = 10000
usd_per_pip = 10.0
min_history = 50
equity_sample_every = 7

[indicator]
ema_fast = 20
ema_slow = 50
rsi_period = 14
adx_period = 14
atr_period = 14

[analyzer]
pullback_pct = 0.002
breakout_lookback = 5
min_pattern_quality = 0.6

[confluence]
min_score = 1.2
stop_atr_mult = 1.5
target_atr_mult = 3.0

[pair_weights]
EUR_USD = 1.2
"#;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let config = adapter(VALID);
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn missing_pairs_is_an_error() {
        let config = adapter("[backtest]\ninitial_equity = 10000\n");
        assert!(matches!(
            validate_backtest_config(&config),
            Err(FxSignalError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn unknown_granularity_is_rejected() {
        let config = adapter("[backtest]\npairs = EUR_USD\ngranularity = M15\n");
        assert!(matches!(
            validate_backtest_config(&config),
            Err(FxSignalError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn non_positive_equity_is_rejected() {
        let config = adapter("[backtest]\npairs = EUR_USD\ninitial_equity = 0\n");
        assert!(validate_backtest_config(&config).is_err());
    }

    #[test]
    fn fast_ema_must_be_shorter_than_slow() {
        let config = adapter("[indicator]\nema_fast = 50\nema_slow = 20\n");
        assert!(matches!(
            validate_strategy_config(&config),
            Err(FxSignalError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn out_of_range_pullback_is_rejected() {
        let config = adapter("[analyzer]\npullback_pct = 1.5\n");
        assert!(validate_strategy_config(&config).is_err());
    }

    #[test]
    fn negative_pair_weight_is_rejected() {
        let config = adapter("[pair_weights]\nEUR_USD = -1.0\n");
        assert!(validate_strategy_config(&config).is_err());
    }

    #[test]
    fn defaults_pass_when_sections_absent() {
        let config = adapter("[backtest]\npairs = EUR_USD\n");
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
    }
}
