use crate::render::{Primitives, Viewport};
use crate::{OverlayIndicator, PropertyValue, UpdatePath};
use candleview_core::{
    Candle, CandleSeries, ChangeNotifier, IndicatorError, IndicatorValue, MutationKind,
    ObserverId, OverlayId, PropertyChanged, SeriesError, SeriesMutation,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Name of the pane-level property emitted when the candle source changes.
pub const CANDLES_SOURCE: &str = "candles_source";

/// What the pane does with a mutation outside append / replace-last /
/// remove-last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationPolicy {
    /// Apply it and recompute every overlay.
    #[default]
    Fallback,
    /// Refuse it with [`SeriesError::UnsupportedMutation`].
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneConfig {
    #[serde(default)]
    pub mutation_policy: MutationPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum PaneError {
    #[error("Overlay not found: {0}")]
    OverlayNotFound(OverlayId),
    #[error("No candle source attached")]
    NoSource,
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
}

struct Attached {
    id: OverlayId,
    indicator: Box<dyn OverlayIndicator>,
}

/// Host for one candle series and the overlays drawn on top of it.
///
/// The pane is the only writer of both the series and the indicator stores:
/// every mutation goes through [`apply`](OverlayPane::apply) or
/// [`push`](OverlayPane::push) and has been followed by every overlay before
/// the call returns, so a render never sees stale or misaligned values.
pub struct OverlayPane {
    config: PaneConfig,
    source: Option<CandleSeries>,
    overlays: Vec<Attached>,
    next_id: u64,
    notifier: ChangeNotifier,
}

impl OverlayPane {
    pub fn new(config: PaneConfig) -> Self {
        Self {
            config,
            source: None,
            overlays: Vec::new(),
            next_id: 0,
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn config(&self) -> &PaneConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&CandleSeries> {
        self.source.as_ref()
    }

    pub fn candles(&self) -> &[Candle] {
        self.source.as_ref().map(CandleSeries::candles).unwrap_or(&[])
    }

    /// Attaches, swaps or clears the candle source.
    ///
    /// A new source recomputes every overlay from scratch. Clearing drops all
    /// derived values without recomputing. Clearing an already empty pane is
    /// a no-op.
    pub fn set_source(&mut self, source: Option<CandleSeries>) {
        if source.is_none() && self.source.is_none() {
            return;
        }

        self.source = source;
        match &self.source {
            Some(series) => {
                info!(candles = series.len(), overlays = self.overlays.len(), "Candle source attached");
                for attached in &mut self.overlays {
                    attached.indicator.recalc_all(series.candles());
                }
            }
            None => {
                info!("Candle source cleared");
                for attached in &mut self.overlays {
                    attached.indicator.clear();
                }
            }
        }
        self.notifier.notify(PropertyChanged::new(None, CANDLES_SOURCE));
    }

    /// Subscribes an indicator to the series. It is computed immediately when
    /// a source is attached.
    pub fn attach(&mut self, mut indicator: Box<dyn OverlayIndicator>) -> OverlayId {
        let id = OverlayId(self.next_id);
        self.next_id += 1;

        match &self.source {
            Some(series) => indicator.recalc_all(series.candles()),
            None => indicator.clear(),
        }
        debug!(%id, indicator = %indicator.short_name(), "Overlay attached");
        self.overlays.push(Attached { id, indicator });
        id
    }

    /// Unsubscribes an overlay and hands it back with its values cleared.
    pub fn detach(&mut self, id: OverlayId) -> Option<Box<dyn OverlayIndicator>> {
        let pos = self.overlays.iter().position(|a| a.id == id)?;
        let mut attached = self.overlays.remove(pos);
        attached.indicator.clear();
        debug!(%id, indicator = %attached.indicator.short_name(), "Overlay detached");
        Some(attached.indicator)
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&dyn OverlayIndicator> {
        self.overlays
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.indicator.as_ref())
    }

    pub fn overlays(&self) -> impl Iterator<Item = (OverlayId, &dyn OverlayIndicator)> {
        self.overlays.iter().map(|a| (a.id, a.indicator.as_ref()))
    }

    /// Applies a mutation to the series and brings every overlay up to date.
    ///
    /// Nothing changes when an error is returned.
    pub fn apply(&mut self, mutation: SeriesMutation) -> Result<MutationKind, PaneError> {
        if mutation.kind() == MutationKind::Unsupported
            && self.config.mutation_policy == MutationPolicy::Reject
        {
            warn!(op = mutation.name(), "Rejecting out-of-contract series mutation");
            return Err(SeriesError::UnsupportedMutation(mutation.name().to_string()).into());
        }

        let series = self.source.as_mut().ok_or(PaneError::NoSource)?;
        let kind = series.apply(mutation)?;
        self.dispatch(kind);
        Ok(kind)
    }

    /// Feeds a live candle: same time as the last candle repaints it, a later
    /// time appends.
    pub fn push(&mut self, candle: Candle) -> Result<MutationKind, PaneError> {
        let series = self.source.as_mut().ok_or(PaneError::NoSource)?;
        let kind = series.upsert(candle)?;
        self.dispatch(kind);
        Ok(kind)
    }

    fn dispatch(&mut self, kind: MutationKind) {
        let Some(series) = &self.source else {
            return;
        };
        for attached in &mut self.overlays {
            let path = attached.indicator.apply_mutation(kind, series.candles());
            if path == UpdatePath::Full && kind != MutationKind::RemoveLast {
                debug!(id = %attached.id, ?kind, "Overlay recomputed from scratch");
            }
        }
    }

    /// Sets an overlay property. A changed value recomputes the overlay and
    /// notifies observers; an unchanged one does neither.
    pub fn set_property(
        &mut self,
        id: OverlayId,
        name: &str,
        value: PropertyValue,
    ) -> Result<bool, PaneError> {
        let attached = self
            .overlays
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(PaneError::OverlayNotFound(id))?;

        if !attached.indicator.set_property(name, value)? {
            return Ok(false);
        }
        if let Some(series) = &self.source {
            attached.indicator.recalc_all(series.candles());
        }
        debug!(%id, property = name, indicator = %attached.indicator.short_name(), "Overlay property changed");
        self.notifier.notify(PropertyChanged::new(Some(id), name));
        Ok(true)
    }

    pub fn value(&self, id: OverlayId, index: usize) -> Result<IndicatorValue, PaneError> {
        let indicator = self.overlay(id).ok_or(PaneError::OverlayNotFound(id))?;
        Ok(indicator.value(index)?)
    }

    pub fn render(&self, id: OverlayId, viewport: &Viewport) -> Result<Primitives<'_>, PaneError> {
        let indicator = self.overlay(id).ok_or(PaneError::OverlayNotFound(id))?;
        Ok(indicator.render(viewport)?)
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&PropertyChanged) + 'static) -> ObserverId {
        self.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.notifier.unsubscribe(id)
    }
}

impl Default for OverlayPane {
    fn default() -> Self {
        Self::new(PaneConfig::default())
    }
}

impl std::fmt::Debug for OverlayPane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let overlays: Vec<String> = self
            .overlays
            .iter()
            .map(|a| format!("{}={}", a.id, a.indicator.short_name()))
            .collect();
        f.debug_struct("OverlayPane")
            .field("config", &self.config)
            .field("candles", &self.source.as_ref().map(CandleSeries::len))
            .field("overlays", &overlays)
            .field("notifier", &self.notifier)
            .finish()
    }
}
