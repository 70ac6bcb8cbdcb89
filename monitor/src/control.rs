use frame_motion_detector::SharedEngine;
use tracing::{info, warn};

use crate::MonitorError;

/// Operator commands read from stdin, standing in for the buttons and
/// sliders of a camera UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    /// Pin the latest frame as the original reference.
    Pin,
    Unpin,
    /// Capture the latest frame as the scene reference.
    Scene,
    Unscene,
    ClearTare,
    Tare,
    Threshold(f64),
    Baseline(f64),
    Status,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, MonitorError> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let arg = parts.next();

        let value = |name: &str| -> Result<f64, MonitorError> {
            let raw = arg.ok_or_else(|| MonitorError::Command(format!("{name} needs a value")))?;
            let value: f64 = raw
                .parse()
                .map_err(|_| MonitorError::Command(format!("{name}: not a number: {raw}")))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(MonitorError::Command(format!("{name} must be finite")))
            }
        };

        let command = match verb {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "pin" => Command::Pin,
            "unpin" => Command::Unpin,
            "scene" => Command::Scene,
            "unscene" => Command::Unscene,
            "clear-tare" => Command::ClearTare,
            "tare" => Command::Tare,
            "threshold" => {
                let t = value("threshold")?;
                if t < 0.0 {
                    return Err(MonitorError::Command("threshold must be >= 0".into()));
                }
                Command::Threshold(t)
            }
            "baseline" => Command::Baseline(value("baseline")?),
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            "" => return Err(MonitorError::Command("empty command".into())),
            other => return Err(MonitorError::Command(format!("unknown command: {other}"))),
        };
        Ok(command)
    }
}

/// Apply one command. Returns `false` when the monitor should exit.
pub fn apply(engine: &SharedEngine, command: Command) -> Result<bool, MonitorError> {
    match command {
        Command::Start => engine.start_recording(),
        Command::Stop => engine.stop_recording(),
        Command::Pin => {
            if !engine.capture_original_reference() {
                warn!("no frame captured yet, nothing to pin");
            }
        }
        Command::Unpin => engine.clear_original_reference(),
        Command::Scene => {
            if !engine.capture_scene_reference() {
                warn!("no frame captured yet, scene reference not set");
            }
        }
        Command::Unscene => engine.clear_scene_reference(),
        Command::ClearTare => engine.clear_tare_capture(),
        Command::Tare => match engine.tare() {
            Some(baseline) => info!(baseline, "baseline calibrated"),
            None => warn!("no comparison yet, baseline unchanged"),
        },
        Command::Threshold(t) => {
            engine.set_threshold(t);
            info!(threshold = t, "threshold updated");
        }
        Command::Baseline(b) => {
            engine.set_baseline(b);
            info!(baseline = b, "baseline updated");
        }
        Command::Status => {
            let status = engine.with_engine(|e| {
                serde_json::json!({
                    "recording": e.is_recording(),
                    "threshold": e.threshold(),
                    "baseline": e.baseline(),
                    "has_original": e.has_original(),
                    "has_scene": e.has_scene(),
                    "tare_capture": e.tare_image().map(|img| img.dimensions()),
                    "snapshot": e.snapshot(),
                })
            });
            println!("{}", serde_json::to_string(&status)?);
        }
        Command::Quit => return Ok(false),
    }
    Ok(true)
}
