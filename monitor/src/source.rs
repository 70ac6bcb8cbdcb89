use frame_motion_common::config::{SourceConfig, SourcePattern};
use frame_motion_common::frame::{Frame, BYTES_PER_PIXEL};
use frame_motion_detector::FrameSource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

const BACKGROUND: u8 = 40;
const SQUARE: u8 = 200;
const STATIC_GRAY: u8 = 96;
/// Written into row padding so any read of it would skew the score.
const PADDING_FILL: u8 = 0xAA;

/// Stand-in for a camera session: renders BGRA frames from a pattern.
///
/// - `static`: uniform gray, only noise changes between frames.
/// - `moving-square`: a bright square bouncing across a dark field.
/// - `flicker`: the whole frame brightens and darkens sinusoidally.
pub struct SyntheticSource {
    config: SourceConfig,
    rng: StdRng,
    tick: u64,
    square_x: isize,
    velocity: isize,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            tick: 0,
            square_x: 0,
            velocity: 4,
        }
    }

    fn square_side(&self) -> usize {
        (self.config.width.min(self.config.height) / 4).max(1)
    }

    fn advance_square(&mut self) {
        let max_x = self.config.width.saturating_sub(self.square_side()) as isize;
        let next = self.square_x + self.velocity;
        if next < 0 || next > max_x {
            self.velocity = -self.velocity;
        }
        self.square_x = (self.square_x + self.velocity).clamp(0, max_x);
    }

    fn base_value(&self, x: usize, y: usize) -> u8 {
        match self.config.pattern {
            SourcePattern::Static => STATIC_GRAY,
            SourcePattern::Flicker => {
                let phase = self.tick as f64 * 0.3;
                (100.0 + 30.0 * phase.sin()).round() as u8
            }
            SourcePattern::MovingSquare => {
                let side = self.square_side();
                let top = (self.config.height - side.min(self.config.height)) / 2;
                let left = self.square_x as usize;
                if (left..left + side).contains(&x) && (top..top + side).contains(&y) {
                    SQUARE
                } else {
                    BACKGROUND
                }
            }
        }
    }

    fn render(&mut self) -> Option<Frame> {
        let width = self.config.width;
        let height = self.config.height;
        let stride = self.config.bytes_per_row();
        let noise = i16::from(self.config.noise);

        let mut data = vec![PADDING_FILL; height * stride];
        for y in 0..height {
            for x in 0..width {
                let base = i16::from(self.base_value(x, y));
                let idx = y * stride + x * BYTES_PER_PIXEL;
                for channel in &mut data[idx..idx + 3] {
                    let jitter = if noise > 0 {
                        self.rng.gen_range(-noise..=noise)
                    } else {
                        0
                    };
                    *channel = (base + jitter).clamp(0, 255) as u8;
                }
                data[idx + 3] = 255;
            }
        }

        match Frame::from_bytes(width, height, stride, data) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, "synthetic frame rejected, ending source");
                None
            }
        }
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if self.config.pattern == SourcePattern::MovingSquare && self.tick > 0 {
            self.advance_square();
        }
        let frame = self.render()?;
        self.tick += 1;
        Some(frame)
    }

    fn name(&self) -> &str {
        match self.config.pattern {
            SourcePattern::Static => "synthetic-static",
            SourcePattern::MovingSquare => "synthetic-moving-square",
            SourcePattern::Flicker => "synthetic-flicker",
        }
    }
}
