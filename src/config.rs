use std::path::PathBuf;
use std::str::FromStr;

use crate::game::constants::{board, frame, session};
use crate::game::performance::PacingStrategy;
use crate::game::state::{Board, BoardError};
use crate::game::systems::interaction::LossPolicy;
use crate::game::systems::movement::MovementMode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("desired_fps must be {min}-{max}, got {0}", min = frame::MIN_FPS, max = frame::MAX_FPS)]
    InvalidFps(u32),
    #[error("max_ticks must be at least 1")]
    ZeroMaxTicks,
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Board width in pixels
    pub board_width: i32,
    /// Board height in pixels
    pub board_height: i32,
    /// Sprite footprint in pixels
    pub object_size: i32,
    /// Entities placed per kind at start
    pub objects_per_kind: usize,
    /// Target tick rate
    pub desired_fps: u32,
    pub movement_mode: MovementMode,
    /// Eaten entities change kind instead of leaving the board
    pub transform_on_loss: bool,
    /// Fixed seed for placement and movement; drawn at startup when unset
    pub seed: Option<u64>,
    /// Headless runs stop after this many ticks
    pub max_ticks: u64,
    pub pacing: PacingStrategy,
    /// JSON-lines frame dump path, frames are discarded when unset
    pub frame_output: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            board_width: board::WIDTH,
            board_height: board::HEIGHT,
            object_size: board::OBJECT_SIZE,
            objects_per_kind: board::OBJECTS_PER_KIND,
            desired_fps: frame::DEFAULT_FPS,
            movement_mode: MovementMode::AdvancedHunter,
            transform_on_loss: true,
            seed: None,
            max_ticks: session::MAX_TICKS,
            pacing: PacingStrategy::Sleep,
            frame_output: None,
        }
    }
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary key lookup; invalid values fall back to defaults
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(width) = parse_var(&lookup, "BOARD_WIDTH") {
            config.board_width = width;
        }

        if let Some(height) = parse_var(&lookup, "BOARD_HEIGHT") {
            config.board_height = height;
        }

        if let Some(size) = parse_var(&lookup, "OBJECT_SIZE") {
            config.object_size = size;
        }

        if let Some(count) = parse_var::<usize>(&lookup, "OBJECTS_PER_KIND") {
            if count <= 10_000 {
                config.objects_per_kind = count;
            } else {
                tracing::warn!("OBJECTS_PER_KIND must be 0-10000, using default");
            }
        }

        if let Some(fps) = parse_var::<u32>(&lookup, "DESIRED_FPS") {
            if (frame::MIN_FPS..=frame::MAX_FPS).contains(&fps) {
                config.desired_fps = fps;
            } else {
                tracing::warn!(
                    "DESIRED_FPS must be {}-{}, using default",
                    frame::MIN_FPS,
                    frame::MAX_FPS
                );
            }
        }

        if let Some(mode) = lookup("MOVEMENT_MODE") {
            match mode.parse() {
                Ok(parsed) => config.movement_mode = parsed,
                Err(e) => tracing::warn!("{}, using default", e),
            }
        }

        if let Some(flag) = lookup("TRANSFORM_ON_LOSS") {
            match parse_flag(&flag) {
                Some(parsed) => config.transform_on_loss = parsed,
                None => tracing::warn!("Invalid TRANSFORM_ON_LOSS '{}', using default", flag),
            }
        }

        if let Some(seed) = parse_var(&lookup, "SEED") {
            config.seed = Some(seed);
        }

        if let Some(max_ticks) = parse_var::<u64>(&lookup, "MAX_TICKS") {
            if max_ticks > 0 {
                config.max_ticks = max_ticks;
            } else {
                tracing::warn!("MAX_TICKS must be > 0, using default");
            }
        }

        if let Some(pacing) = lookup("PACING") {
            match pacing.parse() {
                Ok(parsed) => config.pacing = parsed,
                Err(e) => tracing::warn!("{}, using default", e),
            }
        }

        if let Some(path) = lookup("FRAME_OUTPUT") {
            let path = path.trim();
            if !path.is_empty() && !path.eq_ignore_ascii_case("none") {
                config.frame_output = Some(PathBuf::from(path));
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(frame::MIN_FPS..=frame::MAX_FPS).contains(&self.desired_fps) {
            return Err(ConfigError::InvalidFps(self.desired_fps));
        }
        if self.max_ticks == 0 {
            return Err(ConfigError::ZeroMaxTicks);
        }
        self.board()?;
        Ok(())
    }

    pub fn board(&self) -> Result<Board, ConfigError> {
        Ok(Board::new(self.board_width, self.board_height, self.object_size)?)
    }

    pub fn loss_policy(&self) -> LossPolicy {
        LossPolicy::from_transform_flag(self.transform_on_loss)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
