use crate::models::*;
use serde::{Deserialize, Serialize};

/// A mutation of a candle series.
///
/// Only `Append`, `ReplaceLast` and `RemoveLast` are part of the incremental
/// contract. `Insert` and `Remove` at arbitrary positions are representable so
/// hosts can report them, but indicators can only follow them with a full
/// recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SeriesMutation {
    Append(Candle),
    ReplaceLast(Candle),
    RemoveLast,
    Insert { index: usize, candle: Candle },
    Remove { index: usize },
}

impl SeriesMutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            SeriesMutation::Append(_) => MutationKind::Append,
            SeriesMutation::ReplaceLast(_) => MutationKind::ReplaceLast,
            SeriesMutation::RemoveLast => MutationKind::RemoveLast,
            SeriesMutation::Insert { .. } | SeriesMutation::Remove { .. } => {
                MutationKind::Unsupported
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeriesMutation::Append(_) => "append",
            SeriesMutation::ReplaceLast(_) => "replace_last",
            SeriesMutation::RemoveLast => "remove_last",
            SeriesMutation::Insert { .. } => "insert",
            SeriesMutation::Remove { .. } => "remove",
        }
    }
}

/// Payload-free shape of an applied mutation, as dispatched to indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Append,
    ReplaceLast,
    RemoveLast,
    /// Anything outside the incremental contract.
    Unsupported,
}

/// Emitted after an observable property changed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyChanged {
    /// The overlay whose property changed; `None` for pane-level properties
    /// such as the candle source.
    pub overlay: Option<OverlayId>,
    pub property: String,
}

impl PropertyChanged {
    pub fn new(overlay: Option<OverlayId>, property: impl Into<String>) -> Self {
        Self {
            overlay,
            property: property.into(),
        }
    }
}
