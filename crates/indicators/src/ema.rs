use crate::property::{PERIOD, SOURCE};
use crate::{IndicatorKind, IndicatorValues, OverlayIndicator, PropertyValue};
use candleview_core::{Candle, IndicatorError, IndicatorValue, PriceSource};
use rust_decimal::Decimal;

/// Exponential Moving Average (EMA), seeded with the SMA of the first
/// `period` prices.
#[derive(Debug, Clone)]
pub struct Ema {
    len: usize,
    multiplier: Decimal,
    source: PriceSource,
    values: IndicatorValues,
}

impl Ema {
    /// # Panics
    ///
    /// Panics if `period` is zero. Use [`IndicatorSpec`](crate::IndicatorSpec)
    /// to build from unchecked input.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be > 0");
        Self {
            len: period,
            multiplier: Self::multiplier(period),
            source: PriceSource::Close,
            values: IndicatorValues::new(),
        }
    }

    pub fn with_source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }

    pub fn period(&self) -> usize {
        self.len
    }

    fn multiplier(period: usize) -> Decimal {
        Decimal::TWO / (Decimal::from(period) + Decimal::ONE)
    }

    /// Value at `index` given the value at `index - 1`.
    fn compute_at(&self, candles: &[Candle], index: usize, prev: Option<Decimal>) -> IndicatorValue {
        let count = index + 1;
        if count < self.len {
            return IndicatorValue::InsufficientData;
        }
        match prev {
            Some(prev) if count > self.len => {
                let price = self.source.extract(&candles[index]);
                IndicatorValue::Line((price - prev) * self.multiplier + prev)
            }
            _ => {
                let seed: Decimal = candles[count - self.len..count]
                    .iter()
                    .map(|c| self.source.extract(c))
                    .sum();
                IndicatorValue::Line(seed / Decimal::from(self.len))
            }
        }
    }

    fn prev_line(&self, index: usize) -> Option<Decimal> {
        index
            .checked_sub(1)
            .and_then(|i| self.values.get(i).ok())
            .and_then(|v| v.line(0))
    }
}

impl OverlayIndicator for Ema {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Ema
    }

    fn short_name(&self) -> String {
        format!("EMA({})", self.len)
    }

    fn full_name(&self) -> &'static str {
        "Exponential Moving Average"
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
                self.multiplier = Self::multiplier(period);
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
        let mut prev = None;
        for i in 0..candles.len() {
            let value = self.compute_at(candles, i, prev);
            prev = value.line(0);
            self.values.push(value);
        }
    }

    fn on_new_candle_added(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
        self.values.expect_append(candles.len())?;
        let index = candles.len() - 1;
        let value = self.compute_at(candles, index, self.prev_line(index));
        self.values.push(value);
        Ok(())
    }

    fn on_last_candle_changed(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
        self.values.expect_replace(candles.len())?;
        let index = candles.len() - 1;
        let value = self.compute_at(candles, index, self.prev_line(index));
        self.values.set_last(value);
        Ok(())
    }

    fn values(&self) -> &IndicatorValues {
        &self.values
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{candle, candles};
    use rust_decimal_macros::dec;

    #[test]
    fn test_ema_seed() {
        let mut ema = Ema::new(3);
        ema.recalc_all(&candles(&[dec!(2), dec!(4), dec!(6)]));
        assert_eq!(ema.value(1), Ok(IndicatorValue::InsufficientData));
        // Third value -> SMA seed = (2+4+6)/3 = 4
        assert_eq!(ema.value(2), Ok(IndicatorValue::Line(dec!(4))));
    }

    #[test]
    fn test_ema_after_seed() {
        let mut series = candles(&[dec!(2), dec!(4), dec!(6)]);
        let mut ema = Ema::new(3);
        ema.recalc_all(&series);
        // EMA = (8 - 4) * 0.5 + 4 = 6
        series.push(candle(3, dec!(8)));
        ema.on_new_candle_added(&series).unwrap();
        assert_eq!(ema.value(3), Ok(IndicatorValue::Line(dec!(6))));

        // EMA = (12 - 4) * 0.5 + 4 = 8
        series[3] = candle(3, dec!(12));
        ema.on_last_candle_changed(&series).unwrap();
        assert_eq!(ema.value(3), Ok(IndicatorValue::Line(dec!(8))));
        assert_eq!(ema.value(2), Ok(IndicatorValue::Line(dec!(4))));
    }

    #[test]
    fn test_ema_repaint_of_seed_candle() {
        let mut series = candles(&[dec!(2), dec!(4), dec!(6)]);
        let mut ema = Ema::new(3);
        ema.recalc_all(&series);
        series[2] = candle(2, dec!(9));
        ema.on_last_candle_changed(&series).unwrap();
        assert_eq!(ema.value(2), Ok(IndicatorValue::Line(dec!(5))));
    }

    #[test]
    fn test_ema_incremental_matches_recalc() {
        let mut series = Vec::new();
        let mut ema = Ema::new(5);
        ema.recalc_all(&series);
        for i in 0..12 {
            series.push(candle(i, Decimal::from(i * 3 % 7)));
            ema.on_new_candle_added(&series).unwrap();
            series[i] = candle(i, Decimal::from(i * 5 % 11));
            ema.on_last_candle_changed(&series).unwrap();
        }

        let mut fresh = Ema::new(5);
        fresh.recalc_all(&series);
        assert_eq!(ema.values(), fresh.values());
    }
}
