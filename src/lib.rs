//! Fraction Bounce - a bouncing-ball fraction estimation game
//!
//! Core modules:
//! - `sim`: Deterministic gameplay (trajectory, challenges, scoring)
//! - `net`: Turn/roster protocol for shared sessions
//! - `session`: Glue between input events, the tick loop and the host UI
//! - `settings`: Session configuration

pub mod error;
pub mod net;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, InputError, ParseError, ProtocolError};
pub use session::{ActivityHost, Key, SessionController, SessionPhase};
pub use settings::SessionConfig;

/// Game configuration constants
pub mod consts {
    /// Number of time steps per bounce rise and fall
    pub const STEPS: f32 = 100.0;
    /// Gravity factor: `ddy = GRAVITY_K * height / STEPS^2`
    pub const GRAVITY_K: f32 = 6.67;

    /// Milliseconds between simulation steps while the ball is moving
    pub const STEP_PAUSE_MS: u64 = 50;
    /// Milliseconds between bounces (shrinks as more bounces are played)
    pub const BOUNCE_PAUSE_MS: u64 = 3000;

    /// Starting horizontal step size on key press (scaled by screen)
    pub const DX: f32 = 10.0;
    /// Horizontal acceleration per tick while a key is held
    pub const DDX: f32 = 1.25;
    /// Tilt readings are divided by this to get a horizontal step
    pub const TILT_DIVISOR: f32 = 18.0;

    /// Hit tolerance is `ball_width / divisor`
    pub const HIT_DIVISOR: f32 = 3.0;
    pub const EXPERT_HIT_DIVISOR: f32 = 6.0;
    /// Easter egg band is `ball_width / divisor` either side of the threshold
    pub const EASTER_EGG_DIVISOR: f32 = 8.0;

    /// Screen reference height used to derive the scale factor
    pub const REFERENCE_HEIGHT: f32 = 900.0;
    /// Ball sprite size in pixels
    pub const BALL_SIZE: f32 = 85.0;
    /// Unscaled bar height (one toolbar grid cell)
    pub const BAR_HEIGHT: f32 = 55.0;

    /// Bar segments shown in expert mode
    pub const EXPERT_SEGMENTS: u32 = 2;
    /// Bar segments shown in percent mode
    pub const PERCENT_SEGMENTS: u32 = 10;

    /// Random re-roll attempts before the no-repeat fallback kicks in
    pub const MAX_REROLLS: u32 = 32;
    /// Shared session participant cap
    pub const MAX_PARTICIPANTS: usize = 4;
    /// Screens narrower than this get the short challenge text
    pub const NARROW_SCREEN_WIDTH: f32 = 1024.0;
}

/// Pause before the next bounce: shrinks with every bounce played but
/// never drops below a single step pause.
#[inline]
pub fn bounce_pause_ms(step_pause: u64, bounce_pause: u64, played: u32) -> u64 {
    let shrink = step_pause.saturating_mul(played as u64);
    bounce_pause.saturating_sub(shrink).max(step_pause)
}
