pub mod csv_loader;

pub use csv_loader::{load_candles_from_csv, parse_candles};

/// Errors that can occur while loading candle data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Parse error: {0}")]
    Parse(String),
}
