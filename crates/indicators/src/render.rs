//! Maps indicator values of the visible range into canvas coordinates.
//!
//! x: candle `i` is centered at `(i - first) * (candle_width + gap) + candle_width / 2`.
//! y: value `v` lands at `render_height * (max_high - v) / (max_high - min_low)`,
//! so `max_high` is the top edge of the canvas.

use candleview_core::{
    CandleGeometry, DrawPrimitive, Extremums, IndicatorError, IndicatorValue, Point, VisibleRange,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::iter::FusedIterator;

/// Smallest price span used for vertical scaling. Equal extremums are
/// clamped to it instead of dividing by zero.
pub const MIN_PRICE_SPAN: f64 = 1e-9;

/// Everything a render pass needs from the host for one paint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub range: VisibleRange,
    pub extremums: Extremums,
    pub geometry: CandleGeometry,
}

impl Viewport {
    pub fn new(range: VisibleRange, extremums: Extremums, geometry: CandleGeometry) -> Self {
        Self {
            range,
            extremums,
            geometry,
        }
    }

    /// Checks the viewport against a value store of length `len`.
    pub fn validate(&self, len: usize) -> Result<(), IndicatorError> {
        let VisibleRange { first, last } = self.range;
        if first > last || last >= len {
            return Err(IndicatorError::InvalidRange { first, last, len });
        }

        let g = &self.geometry;
        if !(g.candle_width.is_finite() && g.candle_width >= 0.0) {
            return Err(IndicatorError::InvalidGeometry(format!(
                "candle width must be finite and >= 0, got {}",
                g.candle_width
            )));
        }
        if !(g.gap.is_finite() && g.gap >= 0.0) {
            return Err(IndicatorError::InvalidGeometry(format!(
                "gap must be finite and >= 0, got {}",
                g.gap
            )));
        }
        if !(g.render_height.is_finite() && g.render_height > 0.0) {
            return Err(IndicatorError::InvalidGeometry(format!(
                "render height must be finite and > 0, got {}",
                g.render_height
            )));
        }

        if self.extremums.max_high < self.extremums.min_low {
            return Err(IndicatorError::InvertedExtremums {
                max_high: self.extremums.max_high,
                min_low: self.extremums.min_low,
            });
        }
        Ok(())
    }

    /// Horizontal center of candle `index`. Indices left of `range.first`
    /// map to negative x.
    pub fn x(&self, index: usize) -> f64 {
        let k = index as f64 - self.range.first as f64;
        k * self.geometry.step() + self.geometry.candle_width / 2.0
    }

    pub fn y(&self, value: Decimal) -> f64 {
        let span = self
            .extremums
            .span()
            .to_f64()
            .unwrap_or(0.0)
            .max(MIN_PRICE_SPAN);
        let offset = (self.extremums.max_high - value).to_f64().unwrap_or(0.0);
        self.geometry.render_height * offset / span
    }
}

/// Lazy draw-primitive sequence of one render pass.
///
/// Walks each indicator line over `[first - 1, last]`, emitting one polyline
/// per run of plottable values. The index before `first` is only used to draw
/// the segment entering the viewport; a run made of that index alone is
/// dropped. A lone visible value becomes a [`DrawPrimitive::Dot`].
#[derive(Debug, Clone)]
pub struct Primitives<'a> {
    values: &'a [IndicatorValue],
    viewport: Viewport,
    line_count: usize,
    line: usize,
    cursor: usize,
}

impl<'a> Primitives<'a> {
    pub fn new(
        values: &'a [IndicatorValue],
        line_count: usize,
        viewport: Viewport,
    ) -> Result<Self, IndicatorError> {
        viewport.validate(values.len())?;
        Ok(Self {
            values,
            viewport,
            line_count,
            line: 0,
            cursor: viewport.range.first.saturating_sub(1),
        })
    }
}

impl Iterator for Primitives<'_> {
    type Item = DrawPrimitive;

    fn next(&mut self) -> Option<DrawPrimitive> {
        let VisibleRange { first, last } = self.viewport.range;

        while self.line < self.line_count {
            if self.cursor > last {
                self.line += 1;
                self.cursor = first.saturating_sub(1);
                continue;
            }

            let mut points = Vec::new();
            let mut visible = false;
            while self.cursor <= last {
                let Some(v) = self.values[self.cursor].line(self.line) else {
                    break;
                };
                points.push(Point::new(self.viewport.x(self.cursor), self.viewport.y(v)));
                visible |= self.cursor >= first;
                self.cursor += 1;
            }

            if points.is_empty() {
                // gap
                self.cursor += 1;
                continue;
            }
            if !visible {
                continue;
            }

            let line = self.line;
            return Some(if points.len() == 1 {
                DrawPrimitive::Dot {
                    line,
                    center: points[0],
                }
            } else {
                DrawPrimitive::Polyline { line, points }
            });
        }
        None
    }
}

impl FusedIterator for Primitives<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn viewport(first: usize, last: usize) -> Viewport {
        Viewport::new(
            VisibleRange::new(first, last),
            Extremums::new(dec!(10), dec!(0)),
            CandleGeometry::new(8.0, 2.0, 100.0),
        )
    }

    fn line(v: Decimal) -> IndicatorValue {
        IndicatorValue::Line(v)
    }

    #[test]
    fn test_coordinate_mapping() {
        let vp = viewport(3, 5);
        assert_eq!(vp.x(3), 4.0);
        assert_eq!(vp.x(5), 24.0);
        assert_eq!(vp.x(2), -6.0);
        assert_eq!(vp.y(dec!(10)), 0.0);
        assert_eq!(vp.y(dec!(0)), 100.0);
        assert_eq!(vp.y(dec!(2.5)), 75.0);
    }

    #[test]
    fn test_degenerate_extremums_are_clamped() {
        let vp = Viewport::new(
            VisibleRange::new(0, 0),
            Extremums::new(dec!(5), dec!(5)),
            CandleGeometry::new(8.0, 2.0, 100.0),
        );
        assert!(vp.validate(1).is_ok());
        assert_eq!(vp.y(dec!(5)), 0.0);
        assert!(vp.y(dec!(4)).is_finite());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            viewport(0, 3).validate(3),
            Err(IndicatorError::InvalidRange { .. })
        ));
        assert!(matches!(
            viewport(2, 1).validate(3),
            Err(IndicatorError::InvalidRange { .. })
        ));

        let mut vp = viewport(0, 1);
        vp.geometry.render_height = 0.0;
        assert!(matches!(vp.validate(3), Err(IndicatorError::InvalidGeometry(_))));

        let mut vp = viewport(0, 1);
        vp.geometry.gap = f64::NAN;
        assert!(matches!(vp.validate(3), Err(IndicatorError::InvalidGeometry(_))));

        let mut vp = viewport(0, 1);
        vp.extremums = Extremums::new(dec!(1), dec!(2));
        assert!(matches!(
            vp.validate(3),
            Err(IndicatorError::InvertedExtremums { .. })
        ));
    }

    #[test]
    fn test_polyline_breaks_at_gaps() {
        let values = vec![
            IndicatorValue::InsufficientData,
            line(dec!(1)),
            line(dec!(2)),
            IndicatorValue::InsufficientData,
            line(dec!(3)),
            line(dec!(4)),
        ];
        let out: Vec<_> = Primitives::new(&values, 1, viewport(0, 5)).unwrap().collect();
        assert_eq!(out.len(), 2);
        match &out[0] {
            DrawPrimitive::Polyline { points, .. } => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[0].x, 14.0);
            }
            other => panic!("unexpected primitive {other:?}"),
        }
        match &out[1] {
            DrawPrimitive::Polyline { points, .. } => assert_eq!(points[0].x, 44.0),
            other => panic!("unexpected primitive {other:?}"),
        }
    }

    #[test]
    fn test_preceding_index_connects_into_view() {
        let values = vec![line(dec!(1)), line(dec!(2)), line(dec!(3))];
        let out: Vec<_> = Primitives::new(&values, 1, viewport(1, 2)).unwrap().collect();
        assert_eq!(out.len(), 1);
        match &out[0] {
            DrawPrimitive::Polyline { points, .. } => {
                assert_eq!(points.len(), 3);
                assert_eq!(points[0].x, -6.0);
            }
            other => panic!("unexpected primitive {other:?}"),
        }
    }

    #[test]
    fn test_run_of_only_preceding_index_is_dropped() {
        let values = vec![line(dec!(1)), IndicatorValue::InsufficientData, line(dec!(3))];
        let out: Vec<_> = Primitives::new(&values, 1, viewport(1, 2)).unwrap().collect();
        assert_eq!(
            out,
            vec![DrawPrimitive::Dot {
                line: 0,
                center: Point::new(14.0, 70.0)
            }]
        );
    }

    #[test]
    fn test_band_renders_each_line() {
        let band = IndicatorValue::Band {
            upper: dec!(6),
            middle: dec!(5),
            lower: dec!(4),
        };
        let values = vec![band, band];
        let out: Vec<_> = Primitives::new(&values, 3, viewport(0, 1)).unwrap().collect();
        let lines: Vec<_> = out.iter().map(DrawPrimitive::line).collect();
        assert_eq!(lines, vec![0, 1, 2]);
    }

    #[test]
    fn test_all_sentinels_emit_nothing() {
        let values = vec![IndicatorValue::InsufficientData; 4];
        let mut out = Primitives::new(&values, 1, viewport(0, 3)).unwrap();
        assert!(out.next().is_none());
        assert!(out.next().is_none());
    }
}
