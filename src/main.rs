//! # Moon Dial Application Entry Point
//!
//! Loads the configuration and base map, draws the first frame and then
//! redraws on a fixed interval until interrupted. Frames go to a PNG
//! snapshot, or to the terminal as ASCII with `--stdout` (development mode).

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use clap::Parser;
use moondial_lib::config::{Config, DEFAULT_CONFIG_PATH};
use moondial_lib::renderer::MoonDial;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "moondial")]
#[command(about = "World map with the sub-solar, sub-lunar and planetary points")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print an ASCII preview instead of writing PNG snapshots
    #[arg(long)]
    stdout: bool,

    /// Render one frame and exit
    #[arg(long)]
    once: bool,
}

/// Send the current frame to its sink.
fn publish(dial: &MoonDial, config: &Config, to_stdout: bool) -> anyhow::Result<()> {
    if to_stdout {
        if let Some(text) = dial.render_ascii(config.display.ascii_columns) {
            print!("{text}");
        }
        return Ok(());
    }

    if let Some(surface) = dial.surface() {
        surface
            .save_png(&config.output.path)
            .with_context(|| format!("writing {}", config.output.path.display()))?;
        log::debug!("frame written to {}", config.output.path.display());
    }
    Ok(())
}

async fn run(mut dial: MoonDial, config: Config, to_stdout: bool) -> anyhow::Result<()> {
    let period = Duration::from_secs(config.display.refresh_seconds.max(1));
    let mut ticks = tokio::time::interval(period);
    // The first tick fires immediately; the initial frame is already out.
    ticks.tick().await;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticks.tick() => match dial.tick_update() {
                Ok(dirty) => {
                    log::debug!("{} regions redrawn", dirty.len());
                    if let Err(e) = publish(&dial, &config, to_stdout) {
                        log::warn!("could not publish frame: {e:#}");
                    }
                }
                Err(e) => log::warn!("tick skipped, keeping previous frame: {e}"),
            },
            result = &mut shutdown => {
                result.context("waiting for Ctrl-C")?;
                log::info!("interrupted, exiting");
                return Ok(());
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load_from_path(&cli.config);
    let size = config.display.window_size()?;

    let mut dial = MoonDial::from_config(&config)?;
    dial.initial_draw(size)?;
    publish(&dial, &config, cli.stdout)?;

    if cli.once {
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(dial, config, cli.stdout))
}
