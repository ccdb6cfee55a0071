use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single OHLC candle.
///
/// Candles are identified by their position in a [`CandleSeries`](crate::CandleSeries),
/// not by `time`; `time` only enforces chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Candle {
    pub fn new(
        time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// A flat candle where every price equals `price`.
    pub fn flat(time: DateTime<Utc>, price: Decimal) -> Self {
        Self::new(time, price, price, price, price)
    }
}

/// Which value of a candle an indicator computes on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    /// `(high + low) / 2`
    Hl2,
    /// `(high + low + close) / 3`
    Hlc3,
    /// `(open + high + low + close) / 4`
    Ohlc4,
}

impl PriceSource {
    pub fn extract(self, candle: &Candle) -> Decimal {
        match self {
            PriceSource::Open => candle.open,
            PriceSource::High => candle.high,
            PriceSource::Low => candle.low,
            PriceSource::Close => candle.close,
            PriceSource::Hl2 => (candle.high + candle.low) / Decimal::TWO,
            PriceSource::Hlc3 => (candle.high + candle.low + candle.close) / Decimal::from(3),
            PriceSource::Ohlc4 => {
                (candle.open + candle.high + candle.low + candle.close) / Decimal::from(4)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriceSource::Open => "open",
            PriceSource::High => "high",
            PriceSource::Low => "low",
            PriceSource::Close => "close",
            PriceSource::Hl2 => "hl2",
            PriceSource::Hlc3 => "hlc3",
            PriceSource::Ohlc4 => "ohlc4",
        }
    }
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Indicator output
// ---------------------------------------------------------------------------

/// Derived value of an indicator at one candle index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorValue {
    /// The formula's warm-up window is not filled yet. Not plottable, and
    /// never to be read as zero.
    InsufficientData,
    Line(Decimal),
    Band {
        upper: Decimal,
        middle: Decimal,
        lower: Decimal,
    },
}

impl IndicatorValue {
    pub fn is_ready(&self) -> bool {
        !matches!(self, IndicatorValue::InsufficientData)
    }

    /// Value of output line `line`, or `None` when not plottable.
    ///
    /// Bands expose upper, middle, lower as lines 0, 1, 2.
    pub fn line(&self, line: usize) -> Option<Decimal> {
        match (self, line) {
            (IndicatorValue::Line(v), 0) => Some(*v),
            (IndicatorValue::Band { upper, .. }, 0) => Some(*upper),
            (IndicatorValue::Band { middle, .. }, 1) => Some(*middle),
            (IndicatorValue::Band { lower, .. }, 2) => Some(*lower),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Closed interval `[first, last]` of series indices scrolled into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisibleRange {
    pub first: usize,
    pub last: usize,
}

impl VisibleRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    /// Number of candles in view. Zero for an inverted range.
    pub fn len(&self) -> usize {
        if self.last < self.first {
            0
        } else {
            self.last - self.first + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.first && index <= self.last
    }
}

/// Vertical scale of the viewport: max high and min low of the visible candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extremums {
    pub max_high: Decimal,
    pub min_low: Decimal,
}

impl Extremums {
    pub fn new(max_high: Decimal, min_low: Decimal) -> Self {
        Self { max_high, min_low }
    }

    /// Scans `candles[range]` for the extremums. Returns `None` when the range
    /// is empty or falls outside `candles`.
    ///
    /// This is a host-side helper; indicators receive extremums and never
    /// compute them.
    pub fn of(candles: &[Candle], range: VisibleRange) -> Option<Self> {
        let visible = candles.get(range.first..=range.last)?;
        let first = visible.first()?;
        let init = Self::new(first.high, first.low);
        Some(visible.iter().fold(init, |acc, c| Self {
            max_high: acc.max_high.max(c.high),
            min_low: acc.min_low.min(c.low),
        }))
    }

    pub fn span(&self) -> Decimal {
        self.max_high - self.min_low
    }
}

/// Candle layout supplied by the host chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleGeometry {
    pub candle_width: f64,
    pub gap: f64,
    pub render_height: f64,
}

impl CandleGeometry {
    pub fn new(candle_width: f64, gap: f64, render_height: f64) -> Self {
        Self {
            candle_width,
            gap,
            render_height,
        }
    }

    /// Horizontal distance between two consecutive candle centers.
    pub fn step(&self) -> f64 {
        self.candle_width + self.gap
    }
}

// ---------------------------------------------------------------------------
// Draw primitives
// ---------------------------------------------------------------------------

/// A point in the device-independent canvas space (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Output of a render pass. `line` tells which indicator line produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawPrimitive {
    Polyline { line: usize, points: Vec<Point> },
    /// A single plottable value with no plottable neighbour.
    Dot { line: usize, center: Point },
}

impl DrawPrimitive {
    pub fn line(&self) -> usize {
        match self {
            DrawPrimitive::Polyline { line, .. } | DrawPrimitive::Dot { line, .. } => *line,
        }
    }
}

/// Handle identifying an indicator attached to a pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayId(pub u64);

impl std::fmt::Display for OverlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}
