//! Deterministic gameplay module
//!
//! All scoring and motion logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - No rendering, audio or transport dependencies

pub mod challenge;
pub mod engine;
pub mod state;
pub mod trajectory;

pub use challenge::{Challenge, ChallengeSet, Fraction, default_tiers};
pub use engine::{BallGraphic, ChallengeEngine, HitResult, Target};
pub use state::{BallState, Bar, CELEBRATION_FRAMES, Celebration, Playfield, RngState};
pub use trajectory::{TickInput, TickOutcome, Trajectory, celebration_frame};
