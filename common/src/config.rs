use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Motion fires when the score is strictly greater than this.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Subtracted from the raw mean delta before taking the absolute value.
    #[serde(default)]
    pub baseline: f64,
    #[serde(default)]
    pub start_recording: bool,
    /// Advisory level for the scene score. Only the monitor reads it.
    #[serde(default = "default_scene_change_threshold")]
    pub scene_change_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourcePattern {
    Static,
    MovingSquare,
    Flicker,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    /// Extra bytes appended to every row, emulating aligned camera buffers.
    #[serde(default)]
    pub row_padding: usize,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_pattern")]
    pub pattern: SourcePattern,
    #[serde(default = "default_noise")]
    pub noise: u8,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            baseline: 0.0,
            start_recording: false,
            scene_change_threshold: default_scene_change_threshold(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            row_padding: 0,
            fps: default_fps(),
            pattern: default_pattern(),
            noise: default_noise(),
            seed: default_seed(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SourceConfig {
    pub fn bytes_per_row(&self) -> usize {
        self.width * crate::frame::BYTES_PER_PIXEL + self.row_padding
    }

    /// Time between frames, or `None` if `fps` gives no usable interval.
    pub fn frame_interval(&self) -> Option<Duration> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.fps).ok()
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if !engine.threshold.is_finite() || engine.threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.threshold must be a finite value >= 0, got {}",
                engine.threshold
            )));
        }
        if !engine.baseline.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "engine.baseline must be finite, got {}",
                engine.baseline
            )));
        }
        if !engine.scene_change_threshold.is_finite() || engine.scene_change_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.scene_change_threshold must be a finite value >= 0, got {}",
                engine.scene_change_threshold
            )));
        }
        let source = &self.source;
        if source.width == 0 || source.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "source geometry must be non-empty, got {}x{}",
                source.width, source.height
            )));
        }
        let buffer_len = source
            .width
            .checked_mul(crate::frame::BYTES_PER_PIXEL)
            .and_then(|w| w.checked_add(source.row_padding))
            .and_then(|stride| stride.checked_mul(source.height));
        if buffer_len.is_none() {
            return Err(ConfigError::Invalid(format!(
                "source geometry overflows: {}x{} with {} bytes of row padding",
                source.width, source.height, source.row_padding
            )));
        }
        if source.frame_interval().is_none() {
            return Err(ConfigError::Invalid(format!(
                "source.fps must be positive with a representable frame interval, got {}",
                source.fps
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_threshold() -> f64 {
    0.5
}
fn default_scene_change_threshold() -> f64 {
    10.0
}
fn default_width() -> usize {
    320
}
fn default_height() -> usize {
    240
}
fn default_fps() -> f64 {
    15.0
}
fn default_pattern() -> SourcePattern {
    SourcePattern::MovingSquare
}
fn default_noise() -> u8 {
    2
}
fn default_seed() -> u64 {
    7
}
fn default_log_level() -> String {
    "info".into()
}
