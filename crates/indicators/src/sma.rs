use crate::property::{PERIOD, SOURCE};
use crate::{IndicatorKind, IndicatorValues, OverlayIndicator, PropertyValue};
use candleview_core::{Candle, IndicatorError, IndicatorValue, PriceSource};
use rust_decimal::Decimal;

/// Simple Moving Average (SMA).
///
/// Keeps a running sum of the last `period` prices, so appends and
/// last-candle repaints are O(1).
#[derive(Debug, Clone)]
pub struct Sma {
    len: usize,
    source: PriceSource,
    values: IndicatorValues,
    sum: Decimal,
    /// Price of the last candle as included in `sum`.
    last_price: Option<Decimal>,
}

impl Sma {
    /// # Panics
    ///
    /// Panics if `period` is zero. Use [`IndicatorSpec`](crate::IndicatorSpec)
    /// to build from unchecked input.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be > 0");
        Self {
            len: period,
            source: PriceSource::Close,
            values: IndicatorValues::new(),
            sum: Decimal::ZERO,
            last_price: None,
        }
    }

    pub fn with_source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }

    pub fn period(&self) -> usize {
        self.len
    }

    pub fn source(&self) -> PriceSource {
        self.source
    }

    fn current(&self, count: usize) -> IndicatorValue {
        if count >= self.len {
            IndicatorValue::Line(self.sum / Decimal::from(self.len))
        } else {
            IndicatorValue::InsufficientData
        }
    }

    /// Slides the window to include `candles[index]`.
    fn advance(&mut self, candles: &[Candle], index: usize) {
        let price = self.source.extract(&candles[index]);
        self.sum += price;
        if index >= self.len {
            self.sum -= self.source.extract(&candles[index - self.len]);
        }
        self.last_price = Some(price);
    }
}

impl OverlayIndicator for Sma {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Sma
    }

    fn short_name(&self) -> String {
        format!("SMA({})", self.len)
    }

    fn full_name(&self) -> &'static str {
        "Simple Moving Average"
    }

    fn warm_up(&self) -> usize {
        self.len
    }

    fn properties(&self) -> Vec<(&'static str, PropertyValue)> {
        vec![
            (PERIOD, PropertyValue::from(self.len)),
            (SOURCE, PropertyValue::from(self.source)),
        ]
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<bool, IndicatorError> {
        match name {
            PERIOD => {
                let period = value.as_period(name)?;
                let changed = period != self.len;
                self.len = period;
                Ok(changed)
            }
            SOURCE => {
                let source = value.as_source(name)?;
                let changed = source != self.source;
                self.source = source;
                Ok(changed)
            }
            _ => Err(IndicatorError::UnknownProperty(name.to_string())),
        }
    }

    fn recalc_all(&mut self, candles: &[Candle]) {
        self.values.reset(candles.len());
        self.sum = Decimal::ZERO;
        self.last_price = None;
        for i in 0..candles.len() {
            self.advance(candles, i);
            let value = self.current(i + 1);
            self.values.push(value);
        }
    }

    fn on_new_candle_added(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
        self.values.expect_append(candles.len())?;
        let index = candles.len() - 1;
        self.advance(candles, index);
        let value = self.current(candles.len());
        self.values.push(value);
        Ok(())
    }

    fn on_last_candle_changed(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
        self.values.expect_replace(candles.len())?;
        let Some(old) = self.last_price else {
            return Err(IndicatorError::OutOfSync {
                values: self.values.len(),
                candles: candles.len(),
            });
        };
        let price = self.source.extract(&candles[candles.len() - 1]);
        self.sum = self.sum - old + price;
        self.last_price = Some(price);
        let value = self.current(candles.len());
        self.values.set_last(value);
        Ok(())
    }

    fn values(&self) -> &IndicatorValues {
        &self.values
    }

    fn clear(&mut self) {
        self.values.clear();
        self.sum = Decimal::ZERO;
        self.last_price = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{candle, candles};
    use rust_decimal_macros::dec;

    const S: IndicatorValue = IndicatorValue::InsufficientData;

    fn line(v: Decimal) -> IndicatorValue {
        IndicatorValue::Line(v)
    }

    #[test]
    fn test_sma_basic() {
        let mut sma = Sma::new(3);
        sma.recalc_all(&candles(&[dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]));
        assert_eq!(
            sma.values().as_slice(),
            &[S, S, line(dec!(2)), line(dec!(3)), line(dec!(4))]
        );
    }

    #[test]
    fn test_sma_append_then_replace_last() {
        let mut series = candles(&[dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);
        let mut sma = Sma::new(3);
        sma.recalc_all(&series);
        let before: Vec<_> = sma.values().as_slice().to_vec();

        series.push(candle(5, dec!(6)));
        sma.on_new_candle_added(&series).unwrap();
        assert_eq!(sma.value(5), Ok(line(dec!(5))));
        assert_eq!(&sma.values().as_slice()[..5], before.as_slice());

        series[5] = candle(5, dec!(9));
        sma.on_last_candle_changed(&series).unwrap();
        assert_eq!(sma.value(5), Ok(line(dec!(6))));
        assert_eq!(&sma.values().as_slice()[..5], before.as_slice());
        assert_eq!(sma.len(), series.len());
    }

    #[test]
    fn test_sma_incremental_matches_recalc() {
        let closes = [
            dec!(10.5),
            dec!(11),
            dec!(9.75),
            dec!(12),
            dec!(13.25),
            dec!(12.5),
            dec!(14),
        ];
        let mut series = Vec::new();
        let mut sma = Sma::new(4).with_source(PriceSource::Hl2);
        sma.recalc_all(&series);
        for (i, close) in closes.iter().enumerate() {
            series.push(candle(i, *close - dec!(1)));
            sma.on_new_candle_added(&series).unwrap();
            series[i] = candle(i, *close);
            sma.on_last_candle_changed(&series).unwrap();
        }

        let mut fresh = Sma::new(4).with_source(PriceSource::Hl2);
        fresh.recalc_all(&series);
        assert_eq!(sma.values(), fresh.values());
    }

    #[test]
    fn test_sma_rejects_out_of_sync_update() {
        let series = candles(&[dec!(1), dec!(2), dec!(3)]);
        let mut sma = Sma::new(2);
        assert_eq!(
            sma.on_new_candle_added(&series),
            Err(IndicatorError::OutOfSync {
                values: 0,
                candles: 3
            })
        );
        assert!(sma.on_last_candle_changed(&series).is_err());
    }

    #[test]
    fn test_sma_set_property_short_circuits() {
        let mut sma = Sma::new(3);
        assert_eq!(sma.set_property(PERIOD, PropertyValue::Integer(3)), Ok(false));
        assert_eq!(sma.set_property(PERIOD, PropertyValue::Integer(5)), Ok(true));
        assert_eq!(sma.short_name(), "SMA(5)");
        assert!(sma.set_property("length", PropertyValue::Integer(5)).is_err());
        assert!(sma.set_property(PERIOD, PropertyValue::Integer(0)).is_err());
        assert_eq!(sma.period(), 5);
    }

    #[test]
    fn test_sma_bounds() {
        let mut sma = Sma::new(2);
        assert!(sma.value(0).is_err());
        sma.recalc_all(&candles(&[dec!(1), dec!(2)]));
        assert_eq!(
            sma.value(2),
            Err(IndicatorError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert!(sma.value(usize::MAX).is_err());
        assert_eq!(sma.value(0), Ok(S));
    }
}
