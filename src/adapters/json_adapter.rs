//! JSON candle file adapter.
//!
//! Reads `{PAIR}_{GRANULARITY}.json` dumps in the broker export shape:
//! an `instrument` field plus a `candles` array of
//! `{time, volume, mid: {o, h, l, c}}` entries with string prices.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::candle::{Candle, Granularity};
use crate::domain::error::FxSignalError;
use crate::ports::price_port::PricePort;

#[derive(Debug, Deserialize)]
struct CandleDump {
    #[allow(dead_code)]
    instrument: Option<String>,
    candles: Vec<RawCandle>,
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    time: String,
    #[serde(default)]
    volume: f64,
    mid: RawMid,
}

#[derive(Debug, Deserialize)]
struct RawMid {
    o: String,
    h: String,
    l: String,
    c: String,
}

pub struct JsonPriceAdapter {
    base_path: PathBuf,
}

impl JsonPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn json_path(&self, pair: &str, granularity: Granularity) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.json", pair, granularity.code()))
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, FxSignalError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| FxSignalError::Data {
            reason: format!("invalid candle time {}: {}", raw, e),
        })
}

fn parse_price(raw: &str, name: &str) -> Result<f64, FxSignalError> {
    raw.parse().map_err(|e| FxSignalError::Data {
        reason: format!("invalid {} price {}: {}", name, raw, e),
    })
}

impl PricePort for JsonPriceAdapter {
    fn get_history(
        &self,
        pair: &str,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Candle>, FxSignalError> {
        let path = self.json_path(pair, granularity);
        if !path.exists() {
            return Err(FxSignalError::NoData {
                pair: pair.to_string(),
                granularity: granularity.code().to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;

        let dump: CandleDump = serde_json::from_str(&content).map_err(|e| FxSignalError::Data {
            reason: format!("JSON parse error in {}: {}", path.display(), e),
        })?;

        let mut candles = Vec::with_capacity(dump.candles.len());
        for raw in &dump.candles {
            candles.push(Candle {
                timestamp: parse_time(&raw.time)?,
                open: parse_price(&raw.mid.o, "open")?,
                high: parse_price(&raw.mid.h, "high")?,
                low: parse_price(&raw.mid.l, "low")?,
                close: parse_price(&raw.mid.c, "close")?,
                volume: raw.volume,
            });
        }

        if candles.len() > count {
            candles.drain(..candles.len() - count);
        }
        Ok(candles)
    }

    fn list_pairs(&self) -> Result<Vec<String>, FxSignalError> {
        let mut pairs = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            if let Some((pair, gran)) = stem.rsplit_once('_') {
                if Granularity::from_code(gran).is_some() && !pairs.contains(&pair.to_string()) {
                    pairs.push(pair.to_string());
                }
            }
        }
        pairs.sort();
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "instrument": "EUR_USD",
        "granularity": "H4",
        "candles": [
            {"time": "2024-01-15T00:00:00.000000000Z", "volume": 1200,
             "mid": {"o": "1.0950", "h": "1.0970", "l": "1.0940", "c": "1.0960"}},
            {"time": "2024-01-15T04:00:00.000000000Z", "volume": 1100,
             "mid": {"o": "1.0960", "h": "1.0980", "l": "1.0950", "c": "1.0975"}}
        ]
    }"#;

    fn write_json(dir: &TempDir, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        write!(file, "{}", content).unwrap();
    }

    #[test]
    fn loads_broker_dump() {
        let dir = TempDir::new().unwrap();
        write_json(&dir, "EUR_USD_H4.json", SAMPLE);
        let adapter = JsonPriceAdapter::new(dir.path().to_path_buf());

        let candles = adapter.get_history("EUR_USD", Granularity::H4, 100).unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert!((candles[0].open - 1.0950).abs() < 1e-12);
        assert!((candles[1].close - 1.0975).abs() < 1e-12);
        assert!((candles[1].volume - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn count_takes_the_tail() {
        let dir = TempDir::new().unwrap();
        write_json(&dir, "EUR_USD_H4.json", SAMPLE);
        let adapter = JsonPriceAdapter::new(dir.path().to_path_buf());

        let candles = adapter.get_history("EUR_USD", Granularity::H4, 1).unwrap();
        assert_eq!(candles.len(), 1);
        assert!((candles[0].close - 1.0975).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_no_data() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonPriceAdapter::new(dir.path().to_path_buf());
        let result = adapter.get_history("GBP_JPY", Granularity::Daily, 10);
        assert!(matches!(result, Err(FxSignalError::NoData { .. })));
    }

    #[test]
    fn malformed_json_is_a_data_error() {
        let dir = TempDir::new().unwrap();
        write_json(&dir, "EUR_USD_H4.json", "{not json");
        let adapter = JsonPriceAdapter::new(dir.path().to_path_buf());
        let result = adapter.get_history("EUR_USD", Granularity::H4, 10);
        assert!(matches!(result, Err(FxSignalError::Data { .. })));
    }

    #[test]
    fn bad_price_string_is_a_data_error() {
        let dir = TempDir::new().unwrap();
        let content = SAMPLE.replace("\"1.0950\"", "\"abc\"");
        write_json(&dir, "EUR_USD_H4.json", &content);
        let adapter = JsonPriceAdapter::new(dir.path().to_path_buf());
        let result = adapter.get_history("EUR_USD", Granularity::H4, 10);
        assert!(matches!(result, Err(FxSignalError::Data { .. })));
    }

    #[test]
    fn lists_pairs_from_file_names() {
        let dir = TempDir::new().unwrap();
        write_json(&dir, "EUR_USD_H4.json", SAMPLE);
        write_json(&dir, "USD_JPY_D.json", SAMPLE);
        let adapter = JsonPriceAdapter::new(dir.path().to_path_buf());

        let pairs = adapter.list_pairs().unwrap();
        assert_eq!(pairs, vec!["EUR_USD".to_string(), "USD_JPY".to_string()]);
    }
}
