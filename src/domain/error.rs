//! Domain error types.

/// Top-level error type for fxsignal.
///
/// `InsufficientData` is always recoverable by the caller as "no signal yet".
/// `EmptyBucket` indicates a caller contract violation in the aggregator and
/// is fatal to that call only.
#[derive(Debug, thiserror::Error)]
pub enum FxSignalError {
    #[error("no data for {pair} at {granularity}")]
    NoData { pair: String, granularity: String },

    #[error("insufficient data for {pair}: have {bars} bars, need {minimum}")]
    InsufficientData {
        pair: String,
        bars: usize,
        minimum: usize,
    },

    #[error("index {index} out of range for {pair} ({len} candles)")]
    IndexOutOfRange {
        pair: String,
        index: usize,
        len: usize,
    },

    #[error("cannot aggregate an empty bucket to {granularity}")]
    EmptyBucket { granularity: String },

    #[error("invalid candle series for {pair}: {reason}")]
    InvalidSeries { pair: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FxSignalError> for std::process::ExitCode {
    fn from(err: &FxSignalError) -> Self {
        let code: u8 = match err {
            FxSignalError::Io(_) => 1,
            FxSignalError::ConfigParse { .. }
            | FxSignalError::ConfigMissing { .. }
            | FxSignalError::ConfigInvalid { .. } => 2,
            FxSignalError::Data { .. } => 3,
            FxSignalError::EmptyBucket { .. }
            | FxSignalError::InvalidSeries { .. }
            | FxSignalError::IndexOutOfRange { .. } => 4,
            FxSignalError::NoData { .. } | FxSignalError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = FxSignalError::InsufficientData {
            pair: "EUR_USD".into(),
            bars: 10,
            minimum: 50,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for EUR_USD: have 10 bars, need 50"
        );
    }

    #[test]
    fn empty_bucket_message() {
        let err = FxSignalError::EmptyBucket {
            granularity: "D".into(),
        };
        assert_eq!(err.to_string(), "cannot aggregate an empty bucket to D");
    }

    #[test]
    fn config_missing_message() {
        let err = FxSignalError::ConfigMissing {
            section: "backtest".into(),
            key: "pairs".into(),
        };
        assert_eq!(err.to_string(), "missing config key [backtest] pairs");
    }

    #[test]
    fn exit_code_mapping() {
        let err = FxSignalError::NoData {
            pair: "EUR_USD".into(),
            granularity: "H4".into(),
        };
        let code = std::process::ExitCode::from(&err);
        assert_eq!(format!("{:?}", code), format!("{:?}", std::process::ExitCode::from(5)));
    }
}
