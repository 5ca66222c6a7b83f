//! Headlight aiming station.
//!
//! Reads frames from the grabber's output file, measures the beam and
//! exchanges measurements and commands with the test-bench controller.
//! Operator clicks for the calibration workflow are read from stdin as
//! `x y` lines.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use aim_station::device::open_device;
use aim_station::frame_loop::Click;
use aim_station::{FrameLoop, SessionDriver, SessionSettings};
use anyhow::{Context, Result};
use beamcheck::store::ConfigFiles;
use beamcheck::{BeamStation, LiveConfig};
use clap::Parser;
use shared::camera_interface::apply_device_settings;
use shared::camera_interface::file_source::{FileFrameSource, DEFAULT_FRAME_PATH};
use shared::config_storage::ConfigStorage;
use shared::latest::LatestSlot;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headlight beam aiming station")]
struct Args {
    #[arg(
        short = 'c',
        long,
        default_value = "config",
        help = "Directory holding config.json and default.json"
    )]
    config_dir: PathBuf,

    #[arg(short = 'f', long, default_value = DEFAULT_FRAME_PATH, help = "Frame file written by the grabber")]
    frame_path: PathBuf,

    #[arg(long, help = "Controller address as host:port, overrides the configuration")]
    controller: Option<String>,

    #[arg(long, help = "Run without the controller link")]
    no_comm: bool,

    #[arg(short = 'd', long, help = "Verbose logging")]
    debug: bool,

    #[arg(
        short = 't',
        long,
        help = "Maximum runtime in seconds (runs until interrupted if not specified)"
    )]
    max_runtime_secs: Option<u64>,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Parse an `x y` click line
fn parse_click(line: &str) -> Option<Click> {
    let mut parts = line.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((x, y))
}

fn spawn_click_reader(clicks: Sender<Click>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_click(&line) {
                Some(click) => {
                    if clicks.send(click).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => warn!("Ignoring input '{}', expected 'x y'", line.trim()),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let files = ConfigFiles::new(ConfigStorage::with_path(&args.config_dir));
    let config = files
        .load_or_default()
        .with_context(|| format!("Failed to load configuration from {}", args.config_dir.display()))?;

    init_tracing(args.debug || config.debug);
    info!("Configuration loaded from {}", args.config_dir.display());

    let mut device = open_device(&config.device);
    let failures = apply_device_settings(device.as_mut(), &config.device_settings());
    if !failures.is_empty() {
        warn!("{} camera controls could not be applied", failures.len());
    }

    let mut settings = SessionSettings::from_config(&config.comms);
    if let Some(address) = &args.controller {
        settings.address = address.clone();
    }
    let comms_enabled = config.comms.enabled && !args.no_comm;

    let live = LiveConfig::new(config);
    let outbox = Arc::new(LatestSlot::new());
    let station = BeamStation::new(
        live.clone(),
        Box::new(files),
        device,
        outbox.clone(),
        Instant::now(),
    );

    let (click_tx, click_rx) = mpsc::channel();
    spawn_click_reader(click_tx);

    let running = Arc::new(AtomicBool::new(true));
    let mut frame_loop = FrameLoop::new(FileFrameSource::new(&args.frame_path), station, click_rx);
    let frame_task = tokio::task::spawn_blocking({
        let running = running.clone();
        move || frame_loop.run(&running)
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let session_task = comms_enabled.then(|| {
        let mut driver = SessionDriver::new(settings, live.clone(), outbox.clone());
        tokio::spawn(async move { driver.run(shutdown_rx).await })
    });
    if session_task.is_none() {
        info!("Controller link disabled");
    }

    match args.max_runtime_secs {
        Some(secs) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => result.context("Failed to listen for ctrl-c")?,
                _ = tokio::time::sleep(Duration::from_secs(secs)) => info!("Maximum runtime reached"),
            }
        }
        None => tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for ctrl-c")?,
    }

    info!("Shutting down");
    running.store(false, Ordering::Relaxed);
    let _ = shutdown_tx.send(true);

    frame_task.await.context("Frame loop panicked")?;
    if let Some(task) = session_task {
        task.await.context("Controller link panicked")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_click() {
        assert_eq!(parse_click("320 240"), Some((320.0, 240.0)));
        assert_eq!(parse_click("  12.5\t7 "), Some((12.5, 7.0)));
        assert_eq!(parse_click("320"), None);
        assert_eq!(parse_click("a b"), None);
        assert_eq!(parse_click("1 2 3"), None);
    }
}
