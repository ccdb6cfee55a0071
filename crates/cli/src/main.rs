mod config;

use anyhow::{Context, Result};
use candleview_core::{
    Candle, CandleGeometry, CandleSeries, DrawPrimitive, Extremums, IndicatorValue, VisibleRange,
};
use candleview_indicators::{IndicatorKind, OverlayIndicator, Viewport};
use clap::{Parser, Subcommand};
use config::AppConfig;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "candleview")]
#[command(about = "Overlay indicators on candle series: render viewports and replay live feeds")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Overlay configuration file (TOML)
    #[arg(short, long, env = "CANDLEVIEW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the overlays of a viewport as JSON draw primitives
    Render {
        /// Path to CSV candle file
        #[arg(short, long)]
        data: PathBuf,

        /// First visible candle index (default: 100 candles before the last)
        #[arg(long)]
        first: Option<usize>,

        /// Last visible candle index (default: the last candle)
        #[arg(long)]
        last: Option<usize>,

        /// Candle body width
        #[arg(long, default_value = "8")]
        candle_width: f64,

        /// Gap between two candles
        #[arg(long, default_value = "2")]
        gap: f64,

        /// Canvas height
        #[arg(long, default_value = "400")]
        height: f64,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Replay a CSV as a live feed and check the result against a full recompute
    Replay {
        /// Path to CSV candle file
        #[arg(short, long)]
        data: PathBuf,

        /// Number of repaints of each forming candle
        #[arg(long, default_value = "4")]
        ticks: u32,
    },

    /// List available indicators
    Indicators,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            data,
            first,
            last,
            candle_width,
            gap,
            height,
            pretty,
        } => {
            let geometry = CandleGeometry::new(candle_width, gap, height);
            run_render(cli.config.as_deref(), &data, first, last, geometry, pretty)?;
        }
        Commands::Replay { data, ticks } => {
            run_replay(cli.config.as_deref(), &data, ticks)?;
        }
        Commands::Indicators => {
            println!("Available indicators:");
            for kind in IndicatorKind::ALL {
                let indicator = kind.create();
                let params: Vec<String> = indicator
                    .properties()
                    .into_iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                println!(
                    "  {:<10} - {} ({})",
                    kind.as_str(),
                    indicator.full_name(),
                    params.join(", ")
                );
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct RenderedOverlay {
    overlay: String,
    primitives: Vec<DrawPrimitive>,
}

fn run_render(
    config_path: Option<&Path>,
    data: &Path,
    first: Option<usize>,
    last: Option<usize>,
    geometry: CandleGeometry,
    pretty: bool,
) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let series = candleview_data::load_candles_from_csv(data)?;
    if series.is_empty() {
        anyhow::bail!("No candles loaded from {}", data.display());
    }

    let last = last.unwrap_or(series.len() - 1);
    let first = first.unwrap_or(last.saturating_sub(99));
    let range = VisibleRange::new(first, last);
    let extremums = Extremums::of(series.candles(), range).with_context(|| {
        format!(
            "Visible range [{first}, {last}] outside {} candles",
            series.len()
        )
    })?;

    let mut pane = config.build_pane()?;
    pane.set_source(Some(series));

    let viewport = Viewport::new(range, extremums, geometry);
    let mut rendered = Vec::new();
    for (id, overlay) in pane.overlays() {
        let primitives: Vec<DrawPrimitive> = pane.render(id, &viewport)?.collect();
        tracing::debug!(%id, primitives = primitives.len(), "Rendered overlay");
        rendered.push(RenderedOverlay {
            overlay: overlay.short_name(),
            primitives,
        });
    }

    let json = if pretty {
        serde_json::to_string_pretty(&rendered)?
    } else {
        serde_json::to_string(&rendered)?
    };
    println!("{json}");
    Ok(())
}

fn run_replay(config_path: Option<&Path>, data: &Path, ticks: u32) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let history = candleview_data::load_candles_from_csv(data)?;
    tracing::info!(candles = history.len(), ticks, "Replaying candles");

    let mut pane = config.build_pane()?;
    pane.set_source(Some(CandleSeries::new()));

    let ticks = ticks.max(1);
    for candle in history.candles() {
        for step in 1..=ticks {
            pane.push(forming_candle(candle, step, ticks))?;
        }
    }

    // Rebuild every overlay from scratch over the same candles.
    let mut fresh = config.build_pane()?;
    fresh.set_source(pane.source().cloned());

    let mut mismatches = 0;
    for ((id, live), (_, full)) in pane.overlays().zip(fresh.overlays()) {
        let diverged = live
            .values()
            .as_slice()
            .iter()
            .zip(full.values().as_slice())
            .filter(|(a, b)| a != b)
            .count();
        if diverged > 0 || live.len() != full.len() {
            tracing::warn!(%id, overlay = %live.short_name(), diverged, "Incremental values differ from recompute");
            mismatches += 1;
        }

        let last = live.len().checked_sub(1).map(|i| live.value(i)).transpose()?;
        println!(
            "{:<14} last = {}",
            live.short_name(),
            last.map(format_value).unwrap_or_else(|| "-".to_string())
        );
    }

    if mismatches > 0 {
        anyhow::bail!("{mismatches} overlay(s) diverged from a full recompute");
    }
    println!("{} candles replayed, incremental values match a full recompute", pane.candles().len());
    Ok(())
}

/// The state of `candle` after `step` of `ticks` price updates: close walks
/// linearly from open to the final close, the final step is the full candle.
fn forming_candle(candle: &Candle, step: u32, ticks: u32) -> Candle {
    if step >= ticks {
        return candle.clone();
    }
    let progress = Decimal::from(step) / Decimal::from(ticks);
    let close = candle.open + (candle.close - candle.open) * progress;
    Candle::new(
        candle.time,
        candle.open,
        candle.open.max(close),
        candle.open.min(close),
        close,
    )
}

fn format_value(value: IndicatorValue) -> String {
    match value {
        IndicatorValue::InsufficientData => "insufficient data".to_string(),
        IndicatorValue::Line(v) => v.round_dp(4).to_string(),
        IndicatorValue::Band {
            upper,
            middle,
            lower,
        } => format!(
            "{} / {} / {}",
            upper.round_dp(4),
            middle.round_dp(4),
            lower.round_dp(4)
        ),
    }
}
