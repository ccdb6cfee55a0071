use anyhow::{Context, Result};
use candleview_indicators::property::PERIOD;
use candleview_indicators::{IndicatorKind, IndicatorSpec, OverlayPane, PaneConfig};
use serde::Deserialize;
use std::path::Path;

/// Contents of the overlay configuration file.
///
/// ```toml
/// [pane]
/// mutation_policy = "fallback"
///
/// [[overlay]]
/// kind = "sma"
/// period = 20
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pane: PaneConfig,
    #[serde(default, rename = "overlay")]
    pub overlays: Vec<IndicatorSpec>,
}

impl AppConfig {
    /// Reads the config file, or falls back to a single SMA(20) overlay.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::default(),
        };

        if config.overlays.is_empty() {
            tracing::info!("No overlays configured, using SMA(20)");
            config
                .overlays
                .push(IndicatorSpec::new(IndicatorKind::Sma).with(PERIOD, 20usize));
        }
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Builds a pane with every configured overlay attached, no source yet.
    pub fn build_pane(&self) -> Result<OverlayPane> {
        let mut pane = OverlayPane::new(self.pane.clone());
        for spec in &self.overlays {
            let indicator = spec
                .build()
                .with_context(|| format!("Invalid {} overlay", spec.kind))?;
            pane.attach(indicator);
        }
        Ok(pane)
    }
}
