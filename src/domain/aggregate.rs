//! Candle aggregation into higher timeframes.
//!
//! Daily buckets are UTC-calendar-day aligned; weekly buckets are aligned to
//! Monday 00:00 UTC. Candles are folded in timestamp order: a bucket closes
//! when the bucket key changes, and the final (possibly partial) bucket is
//! always emitted.

use chrono::{DateTime, Datelike, Duration, Utc};

use super::candle::{Candle, CandleSeries, Granularity};
use super::error::FxSignalError;

/// Aggregate a fine-grained series into UTC-calendar-day candles.
pub fn aggregate_daily(series: &CandleSeries) -> Result<CandleSeries, FxSignalError> {
    let candles = aggregate_by_key(series.candles(), Granularity::Daily, day_start)?;
    CandleSeries::new(series.pair(), Granularity::Daily, candles)
}

/// Aggregate a fine-grained series into Monday-aligned weekly candles.
pub fn aggregate_weekly(series: &CandleSeries) -> Result<CandleSeries, FxSignalError> {
    let candles = aggregate_by_key(series.candles(), Granularity::Weekly, week_start)?;
    CandleSeries::new(series.pair(), Granularity::Weekly, candles)
}

/// Aggregate a raw candle slice into daily candles (prefix evaluation path).
pub fn aggregate_daily_candles(candles: &[Candle]) -> Result<Vec<Candle>, FxSignalError> {
    aggregate_by_key(candles, Granularity::Daily, day_start)
}

/// Aggregate a raw candle slice into weekly candles (prefix evaluation path).
pub fn aggregate_weekly_candles(candles: &[Candle]) -> Result<Vec<Candle>, FxSignalError> {
    aggregate_by_key(candles, Granularity::Weekly, week_start)
}

fn day_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

fn week_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    let monday = ts.date_naive() - Duration::days(ts.weekday().num_days_from_monday() as i64);
    monday.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

fn aggregate_by_key(
    candles: &[Candle],
    target: Granularity,
    key: fn(DateTime<Utc>) -> DateTime<Utc>,
) -> Result<Vec<Candle>, FxSignalError> {
    let mut out: Vec<Candle> = Vec::new();
    let mut bucket: Vec<Candle> = Vec::new();
    let mut bucket_key: Option<DateTime<Utc>> = None;

    for candle in candles {
        let candle_key = key(candle.timestamp);
        match bucket_key {
            Some(current) if current == candle_key => bucket.push(candle.clone()),
            Some(current) => {
                out.push(fold_bucket(&bucket, current, target)?);
                bucket.clear();
                bucket.push(candle.clone());
                bucket_key = Some(candle_key);
            }
            None => {
                bucket.push(candle.clone());
                bucket_key = Some(candle_key);
            }
        }
    }

    if let Some(current) = bucket_key {
        out.push(fold_bucket(&bucket, current, target)?);
    }

    Ok(out)
}

/// Fold one bucket into a single candle: open from the first, close from the
/// last, extremes and volume over the whole bucket, timestamp at the bucket
/// start. Empty buckets violate the iteration contract.
fn fold_bucket(
    bucket: &[Candle],
    start: DateTime<Utc>,
    target: Granularity,
) -> Result<Candle, FxSignalError> {
    let (first, last) = match (bucket.first(), bucket.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => {
            return Err(FxSignalError::EmptyBucket {
                granularity: target.code().to_string(),
            });
        }
    };

    let mut high = f64::MIN;
    let mut low = f64::MAX;
    let mut volume = 0.0;
    for candle in bucket {
        high = high.max(candle.high);
        low = low.min(candle.low);
        volume += candle.volume;
    }

    Ok(Candle {
        timestamp: start,
        open: first.open,
        high,
        low,
        close: last.close,
        volume,
    })
}
