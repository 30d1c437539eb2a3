//! # Tide Meter Application Entry Point
//!
//! This binary wires the tide state to its consumers: the background renewal
//! scheduler, the tide logger, the voice announcer and the LED indicator.
//! It supports a long-running daemon mode and two one-shot development modes.
//!
//! ```text
//! tide-meter [config.toml] [--stdout | --json]
//! ```
//!
//! - `--stdout`: print the 24-hour chart and the current LED frames, then exit
//! - `--json`: print the current tide snapshot as JSON, then exit
//!
//! In daemon mode `SIGUSR1` steps to the next display mode and `SIGUSR2`
//! toggles the announcer's sound, standing in for the meter's two buttons.

use anyhow::Context;
use chrono::Utc;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tide_meter_lib::{
    announcer::Announcer,
    config::Config,
    leds::{LedLayout, ModeSelector},
    noaa::{NoaaSource, PredictionSource},
    renderer::{draw_ascii, render_frame},
    task::TideTask,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Longest a one-shot mode waits for predictions before giving up.
const ONE_SHOT_WAIT: Duration = Duration::from_secs(90);

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().skip(1).collect();
    let development_mode = args.iter().any(|arg| arg == "--stdout");
    let json_mode = args.iter().any(|arg| arg == "--json");
    let config = match args.iter().find(|arg| !arg.starts_with("--")) {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let source = NoaaSource::new(Duration::from_secs(config.station.request_timeout_seconds))
        .context("building NOAA client")?;
    let task = Arc::new(
        TideTask::new(
            config.station.id.clone(),
            config.tide_offset(),
            config.renewal.clone(),
            source,
        )
        .context("invalid renewal or calibration configuration")?,
    );

    // Create Tokio runtime for the scheduler and consumers
    let rt = tokio::runtime::Runtime::new()?;

    if json_mode || development_mode {
        return rt.block_on(one_shot(task, &config, json_mode));
    }
    rt.block_on(daemon(task, config))
}

/// Wait for the current tide, print it, and stop.
async fn one_shot<S: PredictionSource>(
    task: Arc<TideTask<S>>,
    config: &Config,
    json: bool,
) -> anyhow::Result<()> {
    let renewal = task.start();
    let tide = task.await_tide_now_timeout(ONE_SHOT_WAIT).await;
    renewal.shutdown().await;

    let tide = tide.context("no tide predictions available (is the network up?)")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tide)?);
        return Ok(());
    }

    draw_ascii(&task.window(), Utc::now());
    println!();
    println!("{}: {tide}", config.station.name);

    let layout = config.led_layout();
    let mode = ModeSelector::new(config.display.mode).current();
    println!("\nLED frames ({mode:?}):");
    // Off never ends; one frame says everything
    for frame in mode
        .frames(&layout, tide.level, tide.is_rising())
        .take(40)
    {
        println!("{}", render_frame(&frame));
    }
    Ok(())
}

/// Run every consumer until Ctrl-C.
async fn daemon<S: PredictionSource>(task: Arc<TideTask<S>>, config: Config) -> anyhow::Result<()> {
    info!(
        station = %config.station.id,
        name = %config.station.name,
        cached = task.window().len(),
        "tide meter starting"
    );

    let renewal = task.start();

    let (mode_tx, mode_rx) = mpsc::unbounded_channel();
    let (sound_tx, sound_rx) = mpsc::unbounded_channel();
    #[cfg(unix)]
    let input = spawn_input_listener(mode_tx.clone(), sound_tx.clone())?;

    let mut consumers = vec![
        tokio::spawn(log_tides(
            Arc::clone(&task),
            Duration::from_secs(config.logging.tide_log_interval_seconds.max(1)),
        )),
        tokio::spawn(run_display(
            Arc::clone(&task),
            config.led_layout(),
            ModeSelector::new(config.display.mode),
            mode_rx,
        )),
    ];
    if config.announcer.enabled {
        let announcer = Announcer::new(true).run(
            Arc::clone(&task),
            Duration::from_secs(config.announcer.interval_seconds.max(1)),
            sound_rx,
        );
        consumers.push(tokio::spawn(async move {
            let announcer = announcer.await;
            warn!(sound_on = announcer.sound_on(), "announcer input closed");
        }));
    }

    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;
    info!("shutting down");

    for consumer in consumers {
        consumer.abort();
    }
    #[cfg(unix)]
    input.abort();
    drop((mode_tx, sound_tx));
    renewal.shutdown().await;
    Ok(())
}

/// Forward the two user signals as button presses.
#[cfg(unix)]
fn spawn_input_listener(
    mode_tx: mpsc::UnboundedSender<()>,
    sound_tx: mpsc::UnboundedSender<()>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut next_mode = signal(SignalKind::user_defined1()).context("installing SIGUSR1")?;
    let mut toggle_sound = signal(SignalKind::user_defined2()).context("installing SIGUSR2")?;
    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = next_mode.recv() => {
                    let _ = mode_tx.send(());
                }
                Some(()) = toggle_sound.recv() => {
                    let _ = sound_tx.send(());
                }
                else => break,
            }
        }
    }))
}

/// Log the current tide once per interval.
async fn log_tides<S: PredictionSource>(task: Arc<TideTask<S>>, every: Duration) {
    loop {
        let tide = task.await_tide_now().await;
        info!(target: "tide_meter::tides", level = tide.level, rising = tide.is_rising(), "{tide}");
        tokio::time::sleep(every).await;
    }
}

/// Step through the current mode's frames, restarting on every mode change.
async fn run_display<S: PredictionSource>(
    task: Arc<TideTask<S>>,
    layout: LedLayout,
    mut selector: ModeSelector,
    mut presses: mpsc::UnboundedReceiver<()>,
) {
    loop {
        let tide = task.await_tide_now().await;
        let mode = selector.current();
        for frame in mode.frames(&layout, tide.level, tide.is_rising()) {
            debug!(target: "tide_meter::display", "{}", render_frame(&frame));
            tokio::select! {
                _ = tokio::time::sleep(frame.display_time) => {}
                press = presses.recv() => {
                    if press.is_none() {
                        return;
                    }
                    let mode = selector.advance();
                    info!(index = selector.index(), ?mode, "display mode changed");
                    break;
                }
            }
        }
    }
}
