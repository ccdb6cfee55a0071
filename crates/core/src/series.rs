use crate::errors::SeriesError;
use crate::events::{MutationKind, SeriesMutation};
use crate::models::Candle;
use tracing::trace;

/// Ordered, chronological sequence of candles.
///
/// The series only grows or shrinks at its end during normal operation:
/// appending a candle, replacing the forming last candle, or removing the
/// last candle. Arbitrary inserts and removals are accepted through
/// [`apply`](CandleSeries::apply) and reported as [`MutationKind::Unsupported`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series from candles, sorting them by time.
    pub fn from_candles(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.time);
        Self { candles }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn append(&mut self, candle: Candle) -> Result<(), SeriesError> {
        if let Some(last) = self.candles.last() {
            if candle.time < last.time {
                return Err(SeriesError::OutOfOrder {
                    time: candle.time,
                    last: last.time,
                });
            }
        }
        self.candles.push(candle);
        Ok(())
    }

    /// Replaces the last candle in place. The replacement may not be older
    /// than the candle before it.
    pub fn replace_last(&mut self, candle: Candle) -> Result<Candle, SeriesError> {
        let len = self.candles.len();
        if len == 0 {
            return Err(SeriesError::Empty);
        }
        if len >= 2 && candle.time < self.candles[len - 2].time {
            return Err(SeriesError::OutOfOrder {
                time: candle.time,
                last: self.candles[len - 2].time,
            });
        }
        Ok(std::mem::replace(&mut self.candles[len - 1], candle))
    }

    pub fn remove_last(&mut self) -> Result<Candle, SeriesError> {
        self.candles.pop().ok_or(SeriesError::Empty)
    }

    /// Live-feed entry point: a candle with the same time as the last one
    /// replaces it, a later one is appended.
    pub fn upsert(&mut self, candle: Candle) -> Result<MutationKind, SeriesError> {
        match self.candles.last() {
            Some(last) if candle.time == last.time => {
                self.replace_last(candle)?;
                Ok(MutationKind::ReplaceLast)
            }
            _ => {
                self.append(candle)?;
                Ok(MutationKind::Append)
            }
        }
    }

    /// Applies a mutation and returns the kind that indicators must follow.
    ///
    /// The series is left untouched when an error is returned.
    pub fn apply(&mut self, mutation: SeriesMutation) -> Result<MutationKind, SeriesError> {
        let kind = mutation.kind();
        trace!(op = mutation.name(), len = self.candles.len(), "Applying series mutation");
        match mutation {
            SeriesMutation::Append(candle) => self.append(candle)?,
            SeriesMutation::ReplaceLast(candle) => {
                self.replace_last(candle)?;
            }
            SeriesMutation::RemoveLast => {
                self.remove_last()?;
            }
            SeriesMutation::Insert { index, candle } => {
                let len = self.candles.len();
                if index > len {
                    return Err(SeriesError::IndexOutOfRange { index, len });
                }
                let after_prev = index == 0 || self.candles[index - 1].time <= candle.time;
                let before_next = index == len || candle.time <= self.candles[index].time;
                if !(after_prev && before_next) {
                    let neighbour = if after_prev { index } else { index - 1 };
                    return Err(SeriesError::OutOfOrder {
                        time: candle.time,
                        last: self.candles[neighbour].time,
                    });
                }
                self.candles.insert(index, candle);
            }
            SeriesMutation::Remove { index } => {
                let len = self.candles.len();
                if index >= len {
                    return Err(SeriesError::IndexOutOfRange { index, len });
                }
                self.candles.remove(index);
            }
        }
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn candle(minute: i64, close: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        Candle::flat(t, close)
    }

    #[test]
    fn test_append_and_replace_last() {
        let mut series = CandleSeries::new();
        series.append(candle(0, dec!(1))).unwrap();
        series.append(candle(1, dec!(2))).unwrap();
        let old = series.replace_last(candle(1, dec!(3))).unwrap();
        assert_eq!(old.close, dec!(2));
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().close, dec!(3));
    }

    #[test]
    fn test_append_rejects_older_candle() {
        let mut series = CandleSeries::from_candles(vec![candle(5, dec!(1))]);
        let err = series.append(candle(4, dec!(1))).unwrap_err();
        assert!(matches!(err, SeriesError::OutOfOrder { .. }));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_empty_series_mutations() {
        let mut series = CandleSeries::new();
        assert_eq!(series.remove_last(), Err(SeriesError::Empty));
        assert_eq!(series.replace_last(candle(0, dec!(1))), Err(SeriesError::Empty));
    }

    #[test]
    fn test_upsert() {
        let mut series = CandleSeries::new();
        assert_eq!(series.upsert(candle(0, dec!(1))), Ok(MutationKind::Append));
        assert_eq!(series.upsert(candle(0, dec!(2))), Ok(MutationKind::ReplaceLast));
        assert_eq!(series.upsert(candle(1, dec!(3))), Ok(MutationKind::Append));
        assert!(series.upsert(candle(0, dec!(4))).is_err());
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(0).unwrap().close, dec!(2));
    }

    #[test]
    fn test_apply_reports_kind() {
        let mut series = CandleSeries::from_candles(vec![candle(0, dec!(1)), candle(2, dec!(3))]);
        let kind = series
            .apply(SeriesMutation::Insert {
                index: 1,
                candle: candle(1, dec!(2)),
            })
            .unwrap();
        assert_eq!(kind, MutationKind::Unsupported);
        assert_eq!(series.get(1).unwrap().close, dec!(2));

        assert_eq!(series.apply(SeriesMutation::RemoveLast), Ok(MutationKind::RemoveLast));
        assert_eq!(
            series.apply(SeriesMutation::Remove { index: 7 }),
            Err(SeriesError::IndexOutOfRange { index: 7, len: 2 })
        );
    }

    #[test]
    fn test_insert_keeps_chronology() {
        let mut series = CandleSeries::from_candles(vec![candle(0, dec!(1)), candle(2, dec!(3))]);
        let err = series
            .apply(SeriesMutation::Insert {
                index: 0,
                candle: candle(1, dec!(2)),
            })
            .unwrap_err();
        assert!(matches!(err, SeriesError::OutOfOrder { .. }));
        assert_eq!(series.len(), 2);
    }
}
