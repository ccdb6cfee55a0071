use chrono::{DateTime, Utc};

/// Errors raised by a [`CandleSeries`](crate::CandleSeries) mutation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("Series is empty")]
    Empty,
    #[error("Candle at {time} is older than the last candle at {last}")]
    OutOfOrder {
        time: DateTime<Utc>,
        last: DateTime<Utc>,
    },
    #[error("Series index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Unsupported mutation: {0}")]
    UnsupportedMutation(String),
}

/// Errors raised by an overlay indicator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("Indicator index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Indicator out of sync: {values} values for {candles} candles")]
    OutOfSync { values: usize, candles: usize },
    #[error("Invalid visible range [{first}, {last}] for {len} values")]
    InvalidRange { first: usize, last: usize, len: usize },
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Inverted extremums: max high {max_high} below min low {min_low}")]
    InvertedExtremums {
        max_high: rust_decimal::Decimal,
        min_low: rust_decimal::Decimal,
    },
    #[error("Unknown property: {0}")]
    UnknownProperty(String),
    #[error("Invalid value for property {name}: {reason}")]
    InvalidProperty { name: String, reason: String },
    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),
}
