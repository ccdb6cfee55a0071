use candleview_core::{IndicatorError, IndicatorValue};

/// Dense, index-aligned store of an indicator's derived values.
///
/// After every completed update its length equals the candle series length.
/// The `expect_*` guards check that precondition before an incremental step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorValues {
    values: Vec<IndicatorValue>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[IndicatorValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Result<IndicatorValue, IndicatorError> {
        self.values
            .get(index)
            .copied()
            .ok_or(IndicatorError::IndexOutOfRange {
                index,
                len: self.values.len(),
            })
    }

    pub fn last(&self) -> Option<&IndicatorValue> {
        self.values.last()
    }

    pub fn push(&mut self, value: IndicatorValue) {
        self.values.push(value);
    }

    /// Overwrites the last value. Does nothing on an empty store; callers
    /// check with [`expect_replace`](Self::expect_replace) first.
    pub fn set_last(&mut self, value: IndicatorValue) {
        if let Some(last) = self.values.last_mut() {
            *last = value;
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Clears the store and reserves room for `capacity` values.
    pub fn reset(&mut self, capacity: usize) {
        self.values.clear();
        self.values.reserve(capacity);
    }

    /// The series gained exactly one candle since the last update.
    pub fn expect_append(&self, candles: usize) -> Result<(), IndicatorError> {
        if self.values.len() + 1 == candles {
            Ok(())
        } else {
            Err(self.out_of_sync(candles))
        }
    }

    /// The series has the same, non-zero, length as the store.
    pub fn expect_replace(&self, candles: usize) -> Result<(), IndicatorError> {
        if candles > 0 && self.values.len() == candles {
            Ok(())
        } else {
            Err(self.out_of_sync(candles))
        }
    }

    fn out_of_sync(&self, candles: usize) -> IndicatorError {
        IndicatorError::OutOfSync {
            values: self.values.len(),
            candles,
        }
    }
}
