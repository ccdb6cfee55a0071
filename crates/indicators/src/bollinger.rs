use crate::property::{PERIOD, SOURCE, STD_DEV};
use crate::{IndicatorKind, IndicatorValues, OverlayIndicator, PropertyValue};
use candleview_core::{Candle, IndicatorError, IndicatorValue, PriceSource};
use rust_decimal::Decimal;

/// Bollinger Bands.
///
/// Produces [`IndicatorValue::Band`] values: SMA middle band, upper and lower
/// bands `num_std` population standard deviations away. Each update
/// recomputes one window, O(period).
#[derive(Debug, Clone)]
pub struct BollingerBands {
    len: usize,
    num_std: Decimal,
    source: PriceSource,
    values: IndicatorValues,
}

impl BollingerBands {
    /// # Panics
    ///
    /// Panics if `period` is zero. Use [`IndicatorSpec`](crate::IndicatorSpec)
    /// to build from unchecked input.
    pub fn new(period: usize, num_std_dev: Decimal) -> Self {
        assert!(period > 0, "Bollinger period must be > 0");
        Self {
            len: period,
            num_std: num_std_dev,
            source: PriceSource::Close,
            values: IndicatorValues::new(),
        }
    }

    /// Standard Bollinger Bands (20, 2).
    pub fn default_periods() -> Self {
        Self::new(20, Decimal::TWO)
    }

    pub fn with_source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }

    fn compute_at(&self, candles: &[Candle], index: usize) -> IndicatorValue {
        let count = index + 1;
        if count < self.len {
            return IndicatorValue::InsufficientData;
        }
        let window = &candles[count - self.len..count];
        let n = Decimal::from(self.len);
        let mean = window.iter().map(|c| self.source.extract(c)).sum::<Decimal>() / n;
        let variance = window
            .iter()
            .map(|c| {
                let diff = self.source.extract(c) - mean;
                diff * diff
            })
            .sum::<Decimal>()
            / n;
        let sd = decimal_sqrt(variance);
        IndicatorValue::Band {
            upper: mean + self.num_std * sd,
            middle: mean,
            lower: mean - self.num_std * sd,
        }
    }
}

impl OverlayIndicator for BollingerBands {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Bollinger
    }

    fn short_name(&self) -> String {
        format!("BB({}, {})", self.len, self.num_std.normalize())
    }

    fn full_name(&self) -> &'static str {
        "Bollinger Bands"
    }

    fn warm_up(&self) -> usize {
        self.len
    }

    fn line_count(&self) -> usize {
        3
    }

    fn properties(&self) -> Vec<(&'static str, PropertyValue)> {
        vec![
            (PERIOD, PropertyValue::from(self.len)),
            (STD_DEV, PropertyValue::from(self.num_std)),
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
            STD_DEV => {
                let num_std = value.as_non_negative(name)?;
                let changed = num_std != self.num_std;
                self.num_std = num_std;
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
        for i in 0..candles.len() {
            let value = self.compute_at(candles, i);
            self.values.push(value);
        }
    }

    fn on_new_candle_added(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
        self.values.expect_append(candles.len())?;
        let value = self.compute_at(candles, candles.len() - 1);
        self.values.push(value);
        Ok(())
    }

    fn on_last_candle_changed(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
        self.values.expect_replace(candles.len())?;
        let value = self.compute_at(candles, candles.len() - 1);
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

/// Newton's method square root for Decimal.
pub fn decimal_sqrt(value: Decimal) -> Decimal {
    if value.is_zero() || value < Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut guess = if value > Decimal::ONE {
        value / Decimal::TWO
    } else {
        Decimal::ONE
    };
    let epsilon = Decimal::new(1, 10); // 0.0000000001
    for _ in 0..100 {
        let next_guess = (guess + value / guess) / Decimal::TWO;
        let diff = (next_guess - guess).abs();
        guess = next_guess;
        if diff < epsilon {
            break;
        }
    }
    guess
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{candle, candles};
    use rust_decimal_macros::dec;

    #[test]
    fn test_bollinger_basic() {
        let mut bb = BollingerBands::new(3, Decimal::TWO);
        bb.recalc_all(&candles(&[dec!(10), dec!(11), dec!(12)]));
        assert_eq!(bb.value(1), Ok(IndicatorValue::InsufficientData));
        let IndicatorValue::Band {
            upper,
            middle,
            lower,
        } = bb.value(2).unwrap()
        else {
            panic!("expected a band");
        };
        assert_eq!(middle, dec!(11));
        assert!(upper > middle);
        assert!(lower < middle);
    }

    #[test]
    fn test_bollinger_flat_prices_collapse() {
        let mut bb = BollingerBands::new(2, Decimal::TWO);
        bb.recalc_all(&candles(&[dec!(5), dec!(5)]));
        assert_eq!(
            bb.value(1),
            Ok(IndicatorValue::Band {
                upper: dec!(5),
                middle: dec!(5),
                lower: dec!(5)
            })
        );
    }

    #[test]
    fn test_bollinger_incremental_matches_recalc() {
        let mut series = Vec::new();
        let mut bb = BollingerBands::new(4, dec!(1.5));
        bb.recalc_all(&series);
        for i in 0..10 {
            series.push(candle(i, Decimal::from(100 + i * 7 % 5)));
            bb.on_new_candle_added(&series).unwrap();
            series[i] = candle(i, Decimal::from(100 + i * 3 % 4));
            bb.on_last_candle_changed(&series).unwrap();
        }

        let mut fresh = BollingerBands::new(4, dec!(1.5));
        fresh.recalc_all(&series);
        assert_eq!(bb.values(), fresh.values());
        assert_eq!(bb.len(), 10);
    }

    #[test]
    fn test_decimal_sqrt() {
        let result = decimal_sqrt(dec!(4));
        assert!((result - dec!(2)).abs() < dec!(0.0001));

        let result = decimal_sqrt(dec!(9));
        assert!((result - dec!(3)).abs() < dec!(0.0001));

        let result = decimal_sqrt(dec!(0.25));
        assert!((result - dec!(0.5)).abs() < dec!(0.0001));
    }
}
