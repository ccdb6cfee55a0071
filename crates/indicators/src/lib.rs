pub mod bollinger;
pub mod ema;
pub mod pane;
pub mod property;
pub mod registry;
pub mod render;
pub mod sma;
pub mod state;

pub use pane::{MutationPolicy, OverlayPane, PaneConfig, PaneError};
pub use property::PropertyValue;
pub use registry::{IndicatorKind, IndicatorSpec};
pub use render::{Primitives, Viewport};
pub use state::IndicatorValues;

use candleview_core::{Candle, IndicatorError, IndicatorValue, MutationKind};
use tracing::{debug, warn};

/// Which path an indicator took to follow a series mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePath {
    Incremental,
    Full,
}

/// An overlay indicator attached to a live candle series.
///
/// Implementors keep an [`IndicatorValues`] store parallel to the series and
/// update it incrementally: `on_new_candle_added` after an append,
/// `on_last_candle_changed` after the forming candle was replaced. Both must
/// cost O(1)..O(window), never O(series length). `recalc_all` rebuilds from
/// scratch and is the fallback for everything else.
///
/// `set_property` only stores the value; [`OverlayPane`] recomputes and
/// notifies observers afterwards.
pub trait OverlayIndicator: Send + Sync {
    fn kind(&self) -> IndicatorKind;

    /// Short label such as `SMA(20)`.
    fn short_name(&self) -> String;

    fn full_name(&self) -> &'static str;

    /// Number of candles needed before the first real value.
    fn warm_up(&self) -> usize;

    /// Number of output lines drawn per candle.
    fn line_count(&self) -> usize {
        1
    }

    fn properties(&self) -> Vec<(&'static str, PropertyValue)>;

    /// Stores a property value without recomputing. Returns `Ok(false)` when
    /// `value` equals the current value.
    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<bool, IndicatorError>;

    /// Rebuilds every value from `candles`, leaving one value per candle.
    fn recalc_all(&mut self, candles: &[Candle]);

    /// Computes the value of the candle just appended to `candles`. Fails with
    /// `OutOfSync` unless the store holds exactly `candles.len() - 1` values.
    fn on_new_candle_added(&mut self, candles: &[Candle]) -> Result<(), IndicatorError>;

    /// Recomputes the value of the repainted last candle. Fails with
    /// `OutOfSync` unless the store holds exactly `candles.len()` values.
    fn on_last_candle_changed(&mut self, candles: &[Candle]) -> Result<(), IndicatorError>;

    /// Derived values, one per candle.
    fn values(&self) -> &IndicatorValues;

    /// Drops all derived values without recomputing.
    fn clear(&mut self);

    fn len(&self) -> usize {
        self.values().len()
    }

    fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    fn value(&self, index: usize) -> Result<IndicatorValue, IndicatorError> {
        self.values().get(index)
    }

    /// Follows a mutation that was already applied to `candles`.
    ///
    /// Remove-last and out-of-contract mutations recompute everything. A
    /// failed incremental step is repaired the same way so the store never
    /// stays out of sync with the series.
    fn apply_mutation(&mut self, kind: MutationKind, candles: &[Candle]) -> UpdatePath {
        let result = match kind {
            MutationKind::Append => self.on_new_candle_added(candles),
            MutationKind::ReplaceLast => self.on_last_candle_changed(candles),
            MutationKind::RemoveLast | MutationKind::Unsupported => {
                debug!(indicator = %self.short_name(), ?kind, len = candles.len(), "Recomputing indicator");
                self.recalc_all(candles);
                return UpdatePath::Full;
            }
        };

        match result {
            Ok(()) => UpdatePath::Incremental,
            Err(e) => {
                warn!(indicator = %self.short_name(), ?kind, error = %e, "Incremental update failed, recomputing");
                self.recalc_all(candles);
                UpdatePath::Full
            }
        }
    }

    /// Draw primitives for the visible range. Reads cached values only.
    fn render(&self, viewport: &Viewport) -> Result<Primitives<'_>, IndicatorError> {
        Primitives::new(self.values().as_slice(), self.line_count(), *viewport)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::sma::Sma;
    use crate::{IndicatorKind, IndicatorValues, OverlayIndicator, PropertyValue};
    use candleview_core::{Candle, IndicatorError};
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    pub fn candles(closes: &[Decimal]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| candle(i, *close))
            .collect()
    }

    pub fn candle(minute: usize, close: Decimal) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute as i64);
        Candle::flat(t, close)
    }

    /// Call counters shared between a test and a [`Tracked`] indicator.
    #[derive(Debug, Default)]
    pub struct Calls {
        pub recalc: AtomicUsize,
        pub incremental: AtomicUsize,
        /// Drops the stored values before the next append.
        pub desync_next: AtomicBool,
    }

    impl Calls {
        pub fn recalc(&self) -> usize {
            self.recalc.load(Ordering::SeqCst)
        }

        pub fn incremental(&self) -> usize {
            self.incremental.load(Ordering::SeqCst)
        }
    }

    /// SMA that records which update path the host drove it through.
    pub struct Tracked {
        inner: Sma,
        calls: Arc<Calls>,
    }

    impl Tracked {
        pub fn new(period: usize) -> (Self, Arc<Calls>) {
            let calls = Arc::new(Calls::default());
            let tracked = Self {
                inner: Sma::new(period),
                calls: Arc::clone(&calls),
            };
            (tracked, calls)
        }
    }

    impl OverlayIndicator for Tracked {
        fn kind(&self) -> IndicatorKind {
            self.inner.kind()
        }

        fn short_name(&self) -> String {
            self.inner.short_name()
        }

        fn full_name(&self) -> &'static str {
            self.inner.full_name()
        }

        fn warm_up(&self) -> usize {
            self.inner.warm_up()
        }

        fn properties(&self) -> Vec<(&'static str, PropertyValue)> {
            self.inner.properties()
        }

        fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<bool, IndicatorError> {
            self.inner.set_property(name, value)
        }

        fn recalc_all(&mut self, candles: &[Candle]) {
            self.calls.recalc.fetch_add(1, Ordering::SeqCst);
            self.inner.recalc_all(candles);
        }

        fn on_new_candle_added(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
            if self.calls.desync_next.swap(false, Ordering::SeqCst) {
                self.inner.clear();
            }
            self.inner.on_new_candle_added(candles)?;
            self.calls.incremental.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_last_candle_changed(&mut self, candles: &[Candle]) -> Result<(), IndicatorError> {
            self.inner.on_last_candle_changed(candles)?;
            self.calls.incremental.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn values(&self) -> &IndicatorValues {
            self.inner.values()
        }

        fn clear(&mut self) {
            self.inner.clear();
        }
    }
}
