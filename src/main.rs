mod app;
mod audio;
mod config;
mod cut;
mod error;
mod looping;
mod markers;
mod notify;
mod playback;
mod ui;
mod waveform_cache;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = config::Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(cutter = %config.cutter.ffmpeg_path.display(), "Starting loopcut");
    app::run(config)?;
    Ok(())
}
