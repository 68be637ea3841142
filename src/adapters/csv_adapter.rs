//! CSV candle file adapter.
//!
//! Reads `{PAIR}_{GRANULARITY}.csv` files from a base directory, columns
//! `timestamp,open,high,low,close,volume`. Naive timestamps are treated
//! as UTC; bare dates load at midnight.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::domain::candle::{Candle, Granularity};
use crate::domain::error::FxSignalError;
use crate::ports::price_port::PricePort;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, pair: &str, granularity: Granularity) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", pair, granularity.code()))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FxSignalError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(FxSignalError::Data {
        reason: format!("unparseable timestamp: {}", raw),
    })
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, FxSignalError> {
    record
        .get(index)
        .ok_or_else(|| FxSignalError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| FxSignalError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl PricePort for CsvPriceAdapter {
    fn get_history(
        &self,
        pair: &str,
        granularity: Granularity,
        count: usize,
    ) -> Result<Vec<Candle>, FxSignalError> {
        let path = self.csv_path(pair, granularity);
        if !path.exists() {
            return Err(FxSignalError::NoData {
                pair: pair.to_string(),
                granularity: granularity.code().to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| FxSignalError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let raw_ts = record.get(0).ok_or_else(|| FxSignalError::Data {
                reason: "missing timestamp column".into(),
            })?;

            candles.push(Candle {
                timestamp: parse_timestamp(raw_ts)?,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
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
            let Some(stem) = name.strip_suffix(".csv") else {
                continue;
            };
            // {PAIR}_{GRAN}: granularity is everything after the last '_'.
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
