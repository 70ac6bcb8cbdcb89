mod capture;
mod control;
mod source;

use frame_motion_common::config::{Config, ConfigError};
use frame_motion_detector::{MotionSnapshot, SharedEngine};
use source::SyntheticSource;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid command: {0}")]
    Command(String),
    #[error("failed to encode status: {0}")]
    Status(#[from] serde_json::Error),
    #[error("stdin error: {0}")]
    Stdin(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let (config_path, config) = match load_config(std::env::args().nth(1).map(PathBuf::from)) {
        Ok(loaded) => loaded,
        Err((path, e)) => {
            eprintln!("Failed to load config from {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        config = %config_path.display(),
        threshold = config.engine.threshold,
        baseline = config.engine.baseline,
        width = config.source.width,
        height = config.source.height,
        fps = config.source.fps,
        "starting frame-motion monitor"
    );

    let engine = SharedEngine::new(&config.engine);
    let shutdown = Arc::new(AtomicBool::new(false));

    // Capture worker: a dedicated blocking thread, strictly serial ingest.
    let source = Box::new(SyntheticSource::new(config.source.clone()));
    let capture = {
        let engine = engine.clone();
        let shutdown = Arc::clone(&shutdown);
        let fps = config.source.fps;
        tokio::task::spawn_blocking(move || capture::run_capture_loop(source, engine, fps, shutdown))
    };

    tokio::spawn(watch_scores(
        engine.subscribe(),
        config.engine.scene_change_threshold,
    ));

    tokio::select! {
        result = run_control_loop(&engine) => {
            if let Err(e) = result {
                error!(error = %e, "control loop failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    match capture.await {
        Ok(frames) => info!(frames, "capture worker joined"),
        Err(e) => error!(error = %e, "capture worker panicked"),
    }

    // The stdin reader can still be parked in a blocking read.
    std::process::exit(0);
}

/// Load the config named on the command line.
///
/// An explicit path must exist. Without one, `config.toml` in the working
/// directory is used when present, built-in defaults otherwise.
fn load_config(explicit: Option<PathBuf>) -> Result<(PathBuf, Config), (PathBuf, ConfigError)> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !path.exists() {
                return Ok((path, Config::default()));
            }
            path
        }
    };
    match Config::load(&path) {
        Ok(config) => Ok((path, config)),
        Err(e) => Err((path, e)),
    }
}

/// Read operator commands from stdin until `quit` or EOF.
async fn run_control_loop(engine: &SharedEngine) -> Result<(), MonitorError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("ready: start | stop | pin | unpin | scene | unscene | tare | clear-tare | threshold <f> | baseline <f> | status | quit");

    while let Some(line) = lines.next_line().await? {
        let command = match control::Command::parse(&line) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "ignoring command");
                continue;
            }
        };
        if !control::apply(engine, command)? {
            break;
        }
    }
    Ok(())
}

/// Log published snapshots. Only the newest snapshot is ever observed.
async fn watch_scores(mut rx: watch::Receiver<MotionSnapshot>, scene_change_threshold: f64) {
    let mut was_moving = false;
    let mut scene_changed = false;

    while rx.changed().await.is_ok() {
        let snapshot = *rx.borrow_and_update();

        if snapshot.motion_detected && !was_moving {
            warn!(score = format!("{:.4}", snapshot.last_score), "motion detected");
        } else if !snapshot.motion_detected && was_moving {
            info!(score = format!("{:.4}", snapshot.last_score), "motion ended");
        }
        was_moving = snapshot.motion_detected;

        let over_scene = snapshot.scene_score > scene_change_threshold;
        if over_scene && !scene_changed {
            warn!(
                scene_score = format!("{:.4}", snapshot.scene_score),
                scene_change_threshold,
                "scene differs from reference"
            );
        }
        scene_changed = over_scene;
    }
}
