use candleview_core::{IndicatorError, PriceSource};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const PERIOD: &str = "period";
pub const SOURCE: &str = "source";
pub const STD_DEV: &str = "std_dev";

/// Value of a named indicator property.
///
/// Untagged so config files can write `period = 20`, `std_dev = 2.5` or
/// `source = "hl2"` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(u64),
    Decimal(Decimal),
    Source(PriceSource),
}

impl PropertyValue {
    /// A window length: a strictly positive integer.
    pub fn as_period(&self, name: &str) -> Result<usize, IndicatorError> {
        match self {
            PropertyValue::Integer(n) if *n > 0 => {
                usize::try_from(*n).map_err(|_| invalid(name, "period does not fit in usize"))
            }
            PropertyValue::Integer(_) => Err(invalid(name, "period must be > 0")),
            other => Err(invalid(name, &format!("expected an integer, got {other}"))),
        }
    }

    /// A non-negative decimal. Integers are accepted.
    pub fn as_non_negative(&self, name: &str) -> Result<Decimal, IndicatorError> {
        let value = match self {
            PropertyValue::Integer(n) => Decimal::from(*n),
            PropertyValue::Decimal(d) => *d,
            other => return Err(invalid(name, &format!("expected a number, got {other}"))),
        };
        if value.is_sign_negative() && !value.is_zero() {
            return Err(invalid(name, "must be >= 0"));
        }
        Ok(value)
    }

    pub fn as_source(&self, name: &str) -> Result<PriceSource, IndicatorError> {
        match self {
            PropertyValue::Source(source) => Ok(*source),
            other => Err(invalid(name, &format!("expected a price source, got {other}"))),
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Integer(n) => write!(f, "{n}"),
            PropertyValue::Decimal(d) => write!(f, "{d}"),
            PropertyValue::Source(s) => write!(f, "{s}"),
        }
    }
}

impl From<usize> for PropertyValue {
    fn from(value: usize) -> Self {
        PropertyValue::Integer(value as u64)
    }
}

impl From<Decimal> for PropertyValue {
    fn from(value: Decimal) -> Self {
        PropertyValue::Decimal(value)
    }
}

impl From<PriceSource> for PropertyValue {
    fn from(value: PriceSource) -> Self {
        PropertyValue::Source(value)
    }
}

fn invalid(name: &str, reason: &str) -> IndicatorError {
    IndicatorError::InvalidProperty {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
