use crate::DataError;
use candleview_core::{Candle, CandleSeries};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Load candles from a CSV file.
///
/// Expected columns (case-insensitive, flexible ordering):
/// `timestamp` (or `date`, `datetime`, `time`), `open`, `high`, `low`, `close`.
/// Extra columns such as `volume` are ignored.
///
/// Supports common date formats and unix seconds.
pub fn load_candles_from_csv(path: &Path) -> Result<CandleSeries, DataError> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::Parse(format!("Failed to open CSV {}: {}", path.display(), e)))?;
    let series = read_candles(reader)?;
    debug!(path = %path.display(), candles = series.len(), "Loaded candles");
    Ok(series)
}

/// Same as [`load_candles_from_csv`] for any reader.
pub fn parse_candles(input: impl Read) -> Result<CandleSeries, DataError> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    read_candles(reader)
}

fn read_candles<R: Read>(mut reader: csv::Reader<R>) -> Result<CandleSeries, DataError> {
    let headers = reader
        .headers()
        .map_err(|e| DataError::Parse(format!("Failed to read headers: {}", e)))?
        .clone();

    let col_map = resolve_candle_columns(&headers)?;

    let mut candles = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::Parse(format!("CSV record error: {}", e)))?;
        let field = |idx: usize, name: &str| {
            record.get(idx).ok_or_else(|| {
                DataError::Parse(format!("Row {}: missing {} column", row + 1, name))
            })
        };

        let time = parse_timestamp(field(col_map.time, "time")?)?;
        let open = parse_decimal(field(col_map.open, "open")?, "open")?;
        let high = parse_decimal(field(col_map.high, "high")?, "high")?;
        let low = parse_decimal(field(col_map.low, "low")?, "low")?;
        let close = parse_decimal(field(col_map.close, "close")?, "close")?;

        if high < low {
            return Err(DataError::Parse(format!(
                "Row {}: high {} below low {}",
                row + 1,
                high,
                low
            )));
        }

        candles.push(Candle::new(time, open, high, low, close));
    }

    Ok(CandleSeries::from_candles(candles))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct CandleColumnMap {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
}

fn resolve_candle_columns(headers: &csv::StringRecord) -> Result<CandleColumnMap, DataError> {
    let time = find_column(headers, &["timestamp", "date", "datetime", "time"])
        .ok_or_else(|| DataError::Parse("No timestamp column found".into()))?;
    let open = find_column(headers, &["open", "o"])
        .ok_or_else(|| DataError::Parse("No open column found".into()))?;
    let high = find_column(headers, &["high", "h"])
        .ok_or_else(|| DataError::Parse("No high column found".into()))?;
    let low = find_column(headers, &["low", "l"])
        .ok_or_else(|| DataError::Parse("No low column found".into()))?;
    let close = find_column(headers, &["close", "c"])
        .ok_or_else(|| DataError::Parse("No close column found".into()))?;

    Ok(CandleColumnMap {
        time,
        open,
        high,
        low,
        close,
    })
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let h = header.trim().to_lowercase();
        names.iter().any(|name| h == *name)
    })
}

fn parse_decimal(s: &str, field: &str) -> Result<Decimal, DataError> {
    Decimal::from_str(s.trim())
        .map_err(|e| DataError::Parse(format!("Failed to parse {} '{}': {}", field, s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DataError> {
    let s = s.trim();

    // RFC 3339 / ISO 8601 with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Common formats without timezone, assumed UTC
    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y%m%d %H:%M:%S",
    ];

    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }

    if let Some(naive_dt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc));
    }

    // Unix timestamp (seconds)
    if let Some(dt) = s.parse::<i64>().ok().and_then(|ts| DateTime::from_timestamp(ts, 0)) {
        return Ok(dt);
    }

    Err(DataError::Parse(format!("Unable to parse timestamp: '{}'", s)))
}
