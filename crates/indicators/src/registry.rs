use crate::bollinger::BollingerBands;
use crate::ema::Ema;
use crate::sma::Sma;
use crate::{OverlayIndicator, PropertyValue};
use candleview_core::IndicatorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Type identifier of every indicator the registry can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Bollinger,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 3] = [
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Bollinger,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Bollinger => "bollinger",
        }
    }

    /// Builds the indicator with its default parameters.
    pub fn create(self) -> Box<dyn OverlayIndicator> {
        match self {
            IndicatorKind::Sma => Box::new(Sma::new(20)),
            IndicatorKind::Ema => Box::new(Ema::new(20)),
            IndicatorKind::Bollinger => Box::new(BollingerBands::default_periods()),
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IndicatorError::UnknownIndicator(s.to_string()))
    }
}

/// Serializable description of an indicator: its kind plus property values.
///
/// In TOML:
///
/// ```toml
/// [[overlay]]
/// kind = "bollinger"
/// period = 20
/// std_dev = 2.5
/// source = "hlc3"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub kind: IndicatorKind,
    #[serde(flatten)]
    pub params: BTreeMap<String, PropertyValue>,
}

impl IndicatorSpec {
    pub fn new(kind: IndicatorKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Snapshot of an existing indicator.
    pub fn of(indicator: &dyn OverlayIndicator) -> Self {
        Self {
            kind: indicator.kind(),
            params: indicator
                .properties()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    /// Builds an empty (not yet computed) indicator.
    pub fn build(&self) -> Result<Box<dyn OverlayIndicator>, IndicatorError> {
        let mut indicator = self.kind.create();
        for (name, value) in &self.params {
            indicator.set_property(name, value.clone())?;
        }
        Ok(indicator)
    }
}
