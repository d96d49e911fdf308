//! Ball and playfield state
//!
//! Positions are screen pixels with y growing downward; the ball position is
//! the top-left corner of its sprite.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// The segmented bar the ball lands on
///
/// The bar is a wedge: its top surface sits `height` below `top` at the
/// left edge and rises to `top` at the right edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Bar {
    /// Wedge surface offset below `top` at screen x
    #[inline]
    pub fn wedge_offset(&self, x: f32) -> f32 {
        let rel = ((x - self.left) / self.width).clamp(0.0, 1.0);
        self.height * (1.0 - rel)
    }

    /// Screen x of a position along the bar (0 = left end, 1 = right end)
    #[inline]
    pub fn x_at(&self, fraction: f32) -> f32 {
        self.left + fraction * self.width
    }

    /// Position along the bar of a screen x (unclamped)
    #[inline]
    pub fn fraction_at(&self, x: f32) -> f32 {
        (x - self.left) / self.width
    }
}

/// Screen geometry shared by the simulator and the scoring engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
    pub ball_size: f32,
    pub bar: Bar,
}

impl Playfield {
    pub fn new(width: f32, height: f32, ball_size: f32, bar_height: f32) -> Self {
        Self {
            width,
            height,
            ball_size,
            bar: Bar {
                left: 0.0,
                top: height - bar_height,
                width,
                height: bar_height,
            },
        }
    }

    /// Rightmost legal ball x
    #[inline]
    pub fn max_x(&self) -> f32 {
        self.width - self.ball_size
    }

    /// Landing line for a ball whose left edge is at `ball_x`
    #[inline]
    pub fn floor_y(&self, ball_x: f32) -> f32 {
        self.bar.top - self.ball_size + self.bar.wedge_offset(ball_x)
    }

    /// Ball resting on the bar in the middle of the screen
    pub fn start_position(&self) -> Vec2 {
        let x = (self.max_x() / 2.0).max(0.0);
        Vec2::new(x, self.floor_y(x))
    }
}

/// The ball
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    /// Top-left of the sprite
    pub pos: Vec2,
    /// Per-tick displacement (`x` is player driven, `y` is gravity driven)
    pub vel: Vec2,
    /// Ticks since the episode started
    pub step_count: u32,
}

impl BallState {
    pub fn at(pos: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            step_count: 0,
        }
    }

    /// Horizontal centre, the point that is scored
    #[inline]
    pub fn center_x(&self, ball_size: f32) -> f32 {
        self.pos.x + ball_size / 2.0
    }
}

/// Celebration (easter egg) animation progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Celebration {
    /// Animation frame currently shown (0..CELEBRATION_FRAMES)
    pub frame: usize,
    /// Ticks since the celebration started
    pub counter: u32,
}

/// Number of celebration animation frames
pub const CELEBRATION_FRAMES: usize = 8;

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    /// Independent stream for a different consumer of the same seed
    pub fn with_stream(seed: u64, stream: u64) -> Self {
        Self { seed, stream }
    }

    pub fn to_rng(&self) -> Pcg32 {
        if self.stream == 0 {
            Pcg32::seed_from_u64(self.seed)
        } else {
            Pcg32::new(self.seed, self.stream)
        }
    }
}
