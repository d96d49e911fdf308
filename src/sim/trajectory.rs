//! Fixed-step ball trajectory
//!
//! Each episode launches the ball upward from the bar with
//! `dy = ddy * (1 - STEPS) / 2` and adds `ddy` every tick, so after
//! STEPS ticks the ball is back where it started. Horizontal motion is
//! player driven and grows geometrically while a key is held.

use rand::Rng;

use super::state::{BallState, CELEBRATION_FRAMES, Celebration, Playfield};
use crate::consts::TILT_DIVISOR;
use crate::settings::SessionConfig;

/// Input for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Accelerometer-style tilt reading; overrides key steering when present
    pub tilt: Option<f32>,
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Ball reached the landing line this tick
    pub landed: bool,
}

/// Celebration frame switches: (tick counter, from frame, to frame)
const ANIMATION: [(u32, usize, usize); 17] = [
    (10, 0, 1),
    (15, 1, 2),
    (20, 2, 1),
    (25, 1, 2),
    (30, 2, 1),
    (35, 1, 2),
    (40, 2, 3),
    (45, 3, 4),
    (50, 4, 3),
    (55, 3, 4),
    (60, 4, 3),
    (65, 3, 4),
    (70, 4, 5),
    (75, 5, 6),
    (80, 6, 5),
    (85, 5, 6),
    (90, 6, 7),
];

/// Frame to show after `counter` celebration ticks
pub fn celebration_frame(counter: u32, current: usize) -> usize {
    ANIMATION
        .iter()
        .find(|(at, _, _)| *at == counter)
        .map(|&(_, _, to)| to.min(CELEBRATION_FRAMES - 1))
        .unwrap_or(current)
}

/// Ball trajectory simulator
#[derive(Debug, Clone)]
pub struct Trajectory {
    field: Playfield,
    steps: f32,
    ddy: f32,
    dx_growth: f32,
    /// Max horizontal wobble per celebration tick
    jitter: f32,
}

impl Trajectory {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            field: config.playfield(),
            steps: config.steps,
            ddy: config.ddy(),
            dx_growth: config.dx_growth,
            jitter: (config.dx_step * config.scale()).trunc(),
        }
    }

    pub fn field(&self) -> &Playfield {
        &self.field
    }

    pub fn ddy(&self) -> f32 {
        self.ddy
    }

    /// Vertical step at the top of an episode (negative: the ball rises first)
    #[inline]
    pub fn initial_dy(&self) -> f32 {
        self.ddy * (1.0 - self.steps) / 2.0
    }

    /// Reset per-episode motion, keeping the ball where it is
    pub fn start_episode(&self, ball: &mut BallState) {
        ball.vel.y = self.initial_dy();
        ball.step_count = 0;
    }

    /// Advance the ball by one step
    pub fn tick(&self, ball: &mut BallState, input: &TickInput) -> TickOutcome {
        if let Some(tilt) = input.tilt {
            ball.vel.x = tilt / TILT_DIVISOR;
        }

        self.move_horizontal(ball, ball.vel.x);
        ball.pos.y += ball.vel.y;

        // Speed up while a key is held, fall faster every step
        ball.vel.x *= self.dx_growth;
        ball.vel.y += self.ddy;
        ball.step_count += 1;

        self.check_landing(ball)
    }

    /// Start the easter egg animation from the current landing spot
    pub fn start_celebration(&self, ball: &mut BallState) -> Celebration {
        self.start_episode(ball);
        ball.vel.x = 0.0;
        Celebration::default()
    }

    /// Advance the easter egg animation by one step
    ///
    /// The ball wobbles randomly instead of following player input.
    pub fn tick_celebration<R: Rng>(
        &self,
        ball: &mut BallState,
        celebration: &mut Celebration,
        rng: &mut R,
    ) -> TickOutcome {
        let dx = if self.jitter > 0.0 {
            rng.random_range(-self.jitter..=self.jitter)
        } else {
            0.0
        };
        self.move_horizontal(ball, dx);
        ball.pos.y += ball.vel.y;
        ball.vel.y += self.ddy;
        ball.step_count += 1;

        celebration.counter += 1;
        celebration.frame = celebration_frame(celebration.counter, celebration.frame);

        self.check_landing(ball)
    }

    fn move_horizontal(&self, ball: &mut BallState, dx: f32) {
        let next_x = ball.pos.x + dx;
        let max_x = self.field.max_x();
        if next_x > 0.0 && next_x < max_x {
            ball.pos.x = next_x;
        } else {
            // Hit a wall
            ball.pos.x = next_x.clamp(0.0, max_x.max(0.0));
            ball.vel.x = 0.0;
        }
    }

    fn check_landing(&self, ball: &mut BallState) -> TickOutcome {
        let floor = self.field.floor_y(ball.pos.x);
        if ball.pos.y >= floor {
            ball.pos.y = floor;
            ball.vel.x = 0.0;
            ball.vel.y = 0.0;
            TickOutcome { landed: true }
        } else {
            TickOutcome { landed: false }
        }
    }
}
