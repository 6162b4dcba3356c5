// Engine main entry point
//
// Replays a CSV candle file through the chart service: the older part is
// served as history, the newest `--replay N` candles are turned back into
// ticks and pushed through the live path.
use anyhow::{Context, Result};
use clap::Parser;
use shared::models::{Candle, Interval, PriceTick};
use signal_engine::config::EngineSettings;
use signal_engine::data::candle_buffer::normalize;
use signal_engine::data::{BroadcastTickSource, CandleCsvParser, CsvCandleSource, StaticCandleSource};
use signal_engine::services::{ChannelSink, ChartService, LogSink, RenderSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::info;

const FRAME_WAIT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "signal-engine", about = "Replay a candle CSV through the crossover signal engine")]
struct Args {
    /// Settings file (JSON). Defaults to the embedded configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of newest candles to replay as live ticks.
    #[arg(long, default_value_t = 50)]
    replay: usize,
}

/// Open, high, low, close as four ticks inside the candle's bucket.
fn candle_ticks(candle: &Candle, interval: Interval) -> [PriceTick; 4] {
    let last = candle.time + interval.seconds() - 1;
    [
        PriceTick { time: candle.time, value: candle.open },
        PriceTick { time: candle.time + 1, value: candle.high },
        PriceTick { time: candle.time + 2, value: candle.low },
        PriceTick { time: last, value: candle.close },
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => EngineSettings::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineSettings::load_default()?,
    };
    let key = settings.session_key();
    info!(key = %key, replay = args.replay, "Starting signal engine replay");

    let path = CsvCandleSource::new(&settings.data_dir).path_for(&key);
    let mut history = normalize(
        CandleCsvParser::load_candles_from_csv(&path).with_context(|| format!("reading {}", path.display()))?,
    );
    let live = history.split_off(history.len().saturating_sub(args.replay));
    info!(history = history.len(), live = live.len(), "Loaded candle file");

    let candles = StaticCandleSource::new().with_candles(&key.pair, &key.base, key.interval, history);
    let ticks = Arc::new(BroadcastTickSource::new(1024));
    let (sink, mut frames) = ChannelSink::new();
    let handle = ChartService::spawn(
        key.clone(),
        Arc::new(settings.catalog()?),
        settings.coordinator_config(),
        Arc::new(candles),
        ticks.clone(),
        Arc::new(sink),
    )?;

    let mut last = tokio::time::timeout(FRAME_WAIT, frames.next())
        .await
        .context("timed out waiting for history")?
        .context("chart service stopped before history was applied")?;
    LogSink.render(&last);

    for candle in &live {
        for tick in candle_ticks(candle, key.interval) {
            ticks.publish(&key.pair, &key.base, tick);
            if let Ok(Some(frame)) = tokio::time::timeout(FRAME_WAIT, frames.next()).await {
                LogSink.render(&frame);
                last = frame;
            }
        }
    }

    handle.shutdown().await?;
    info!(signals = last.signals.len(), "Replay finished");
    println!("{}", serde_json::to_string_pretty(&last.signals)?);
    Ok(())
}
