//! Session configuration
//!
//! Everything that used to be module-level state (timing, tolerances,
//! screen geometry, the RNG seed) travels in one struct handed to the
//! session at construction.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::Playfield;

/// How challenges are presented on the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Show the challenge label as written ("3/4")
    #[default]
    Fractions,
    /// Show the rounded percentage ("75%") on a 10-segment bar
    Percents,
    /// Draw the ball as a pie with the fraction filled in
    Sectors,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Fractions => "fractions",
            Mode::Percents => "percents",
            Mode::Sectors => "sectors",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fractions" | "fraction" => Some(Mode::Fractions),
            "percents" | "percent" | "percentages" => Some(Mode::Percents),
            "sectors" | "sector" => Some(Mode::Sectors),
            _ => None,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    // === Geometry ===
    /// Play area width in pixels
    pub width: f32,
    /// Play area height in pixels (toolbar excluded)
    pub height: f32,
    /// Ball sprite size (square)
    pub ball_size: f32,
    /// Unscaled bar height
    pub bar_height: f32,

    // === Motion ===
    /// Time steps per rise and fall
    pub steps: f32,
    /// Gravity factor
    pub gravity_k: f32,
    /// Initial horizontal step on key press (before scaling)
    pub dx_step: f32,
    /// Horizontal growth per tick while a key is held
    pub dx_growth: f32,

    // === Timing ===
    pub step_pause_ms: u64,
    pub bounce_pause_ms: u64,

    // === Scoring ===
    pub hit_divisor: f32,
    pub expert_hit_divisor: f32,
    pub easter_egg_divisor: f32,
    /// Random attempts before the no-repeat rule gives up
    pub max_rerolls: u32,

    // === Sharing ===
    pub max_participants: usize,

    // === Presentation ===
    pub mode: Mode,
    pub narrow_screen_width: f32,

    /// RNG seed for challenge selection and the easter egg
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 845.0,
            ball_size: BALL_SIZE,
            bar_height: BAR_HEIGHT,

            steps: STEPS,
            gravity_k: GRAVITY_K,
            dx_step: DX,
            dx_growth: DDX,

            step_pause_ms: STEP_PAUSE_MS,
            bounce_pause_ms: BOUNCE_PAUSE_MS,

            hit_divisor: HIT_DIVISOR,
            expert_hit_divisor: EXPERT_HIT_DIVISOR,
            easter_egg_divisor: EASTER_EGG_DIVISOR,
            max_rerolls: MAX_REROLLS,

            max_participants: MAX_PARTICIPANTS,

            mode: Mode::Fractions,
            narrow_screen_width: NARROW_SCREEN_WIDTH,

            seed: 0,
        }
    }
}

impl SessionConfig {
    /// Default configuration with the given seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        log::info!("Loaded session config (seed {})", config.seed);
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("ball_size", self.ball_size),
            ("bar_height", self.bar_height),
            ("gravity_k", self.gravity_k),
            ("dx_growth", self.dx_growth),
            ("hit_divisor", self.hit_divisor),
            ("expert_hit_divisor", self.expert_hit_divisor),
            ("easter_egg_divisor", self.easter_egg_divisor),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive {
                    field,
                    value: value as f64,
                });
            }
        }
        if self.step_pause_ms == 0 {
            return Err(ConfigError::NotPositive {
                field: "step_pause_ms",
                value: 0.0,
            });
        }
        if self.max_participants == 0 {
            return Err(ConfigError::NotPositive {
                field: "max_participants",
                value: 0.0,
            });
        }
        if self.steps < 2.0 {
            return Err(ConfigError::TooFewSteps(self.steps));
        }
        Ok(())
    }

    /// Screen scale factor relative to a 900px tall screen
    pub fn scale(&self) -> f32 {
        self.height / REFERENCE_HEIGHT
    }

    /// Per-tick vertical acceleration
    pub fn ddy(&self) -> f32 {
        self.gravity_k * self.height / (self.steps * self.steps)
    }

    /// Whether the short challenge text should be used
    pub fn is_narrow(&self) -> bool {
        self.width < self.narrow_screen_width
    }

    /// Derived screen geometry
    pub fn playfield(&self) -> Playfield {
        Playfield::new(self.width, self.height, self.ball_size, self.bar_height * self.scale())
    }
}
