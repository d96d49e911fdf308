//! Challenge selection, scoring and difficulty progression

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::challenge::{Challenge, ChallengeSet, Fraction};
use super::state::{Playfield, RngState};
use crate::consts::{EXPERT_SEGMENTS, PERCENT_SEGMENTS};
use crate::error::{InputError, ParseError};
use crate::settings::{Mode, SessionConfig};

/// Ball graphic the renderer should show for a target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallGraphic {
    /// The player's chosen ball
    Standard,
    /// A pie with this fraction filled in
    Sector(f32),
}

/// The challenge currently being played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub challenge_index: usize,
    /// Exact value, used for the no-repeat rule
    pub rational: Fraction,
    /// Position along the bar in [0, 1]
    pub fraction: f32,
    /// Text for the ball and the challenge prompt
    pub display_label: String,
    pub ball: BallGraphic,
}

impl Target {
    fn default_half() -> Self {
        Self {
            challenge_index: 0,
            rational: Fraction::HALF,
            fraction: Fraction::HALF.value(),
            display_label: Fraction::HALF.to_string(),
            ball: BallGraphic::Standard,
        }
    }
}

/// Outcome of scoring a landing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    pub correct: bool,
    pub challenge_index: usize,
    /// Where the target mark goes
    pub target_x: f32,
    /// Scored position (ball centre)
    pub ball_x: f32,
    /// Tolerance either side of `target_x`
    pub delta: f32,
    /// First landing against this challenge (its column gets a label)
    pub first_play: bool,
    pub tier_unlocked: bool,
    pub became_expert: bool,
}

/// Relative slack on the hit boundary so `target_x + delta` computed in f32
/// still counts as a hit
const HIT_EPSILON: f64 = 1e-5;

/// Inclusive hit check, done in f64
#[inline]
fn within_tolerance(ball_x: f32, target_x: f32, delta: f32) -> bool {
    let distance = (ball_x as f64 - target_x as f64).abs();
    distance <= delta as f64 * (1.0 + HIT_EPSILON)
}

/// Challenge engine
#[derive(Debug, Clone)]
pub struct ChallengeEngine {
    set: ChallengeSet,
    mode: Mode,
    target: Target,
    expert: bool,
    correct_count: u32,
    played: u32,
    custom: Vec<String>,
    field: Playfield,
    hit_divisor: f32,
    expert_hit_divisor: f32,
    max_rerolls: u32,
    rng: Pcg32,
}

impl ChallengeEngine {
    /// Engine with the stock tiers
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_set(config, ChallengeSet::default())
    }

    pub fn with_set(config: &SessionConfig, set: ChallengeSet) -> Self {
        Self {
            set,
            mode: config.mode,
            target: Target::default_half(),
            expert: false,
            correct_count: 0,
            played: 0,
            custom: Vec::new(),
            field: config.playfield(),
            hit_divisor: config.hit_divisor,
            expert_hit_divisor: config.expert_hit_divisor,
            max_rerolls: config.max_rerolls,
            rng: RngState::new(config.seed).to_rng(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_expert(&self) -> bool {
        self.expert
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    /// Landings scored so far
    pub fn played(&self) -> u32 {
        self.played
    }

    /// Current difficulty tier (0-based)
    pub fn tier(&self) -> usize {
        self.set.unlocked().saturating_sub(1)
    }

    pub fn challenges(&self) -> &[Challenge] {
        self.set.active()
    }

    pub fn set(&self) -> &ChallengeSet {
        &self.set
    }

    pub fn field(&self) -> &Playfield {
        &self.field
    }

    /// Labels added by the player, for the persistence layer
    pub fn custom_labels(&self) -> &[String] {
        &self.custom
    }

    /// Switch presentation mode; the current target is relabelled
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            log::debug!("Mode {} -> {}", self.mode.as_str(), mode.as_str());
        }
        self.mode = mode;
        let rational = self.target.rational;
        let label = match self.resolve(self.target.challenge_index) {
            (f, label) if f == rational => label,
            // Nothing chosen yet: the default 1/2 target
            _ => rational.to_string(),
        };
        self.target.display_label = self.display_label(rational, &label);
        self.target.ball = self.ball_graphic(self.target.fraction);
    }

    /// Pick a random challenge that differs in value from the previous one
    pub fn choose_next(&mut self) -> &Target {
        self.ensure_not_empty();
        let previous = self.target.rational;
        let len = self.set.len();

        let mut index = self.rng.random_range(0..len);
        let mut attempts = 1;
        while self.value_at(index) == previous && attempts < self.max_rerolls {
            index = self.rng.random_range(0..len);
            attempts += 1;
        }
        if self.value_at(index) == previous {
            // Out of re-rolls: first challenge with a different value, if any
            if let Some(other) = (0..len).find(|&i| self.value_at(i) != previous) {
                index = other;
            } else {
                log::debug!("Every challenge equals {previous}; repeating it");
            }
        }

        self.target = self.target_for(index);
        &self.target
    }

    /// Play a specific challenge (shared sessions: the turn holder chose it)
    pub fn choose_index(&mut self, index: usize) -> &Target {
        self.ensure_not_empty();
        let index = if index < self.set.len() {
            index
        } else {
            log::warn!("Challenge index {index} out of range; using 0");
            0
        };
        self.target = self.target_for(index);
        &self.target
    }

    /// Index of a challenge label, adding it as a custom challenge when new
    pub fn index_for_label(&mut self, label: &str) -> Result<usize, InputError> {
        match self.set.position(label) {
            Some(index) => Ok(index),
            None => self.add_fraction(label),
        }
    }

    /// Score a landing at ball centre `ball_x`
    pub fn hit_test(&mut self, ball_x: f32) -> HitResult {
        self.ensure_not_empty();
        let index = self.target.challenge_index.min(self.set.len() - 1);
        let target_x = self.field.bar.x_at(self.target.fraction);
        let delta = self.tolerance();
        let correct = within_tolerance(ball_x, target_x, delta);

        let mut first_play = false;
        if let Some(challenge) = self.set.get_mut(index) {
            first_play = challenge.times_played == 0;
            challenge.times_played += 1;
        }
        self.played += 1;

        let mut tier_unlocked = false;
        let mut became_expert = false;
        if correct {
            self.correct_count += 1;
            if !self.expert && self.correct_count as usize >= self.set.len() * 2 {
                if self.set.unlock_next() {
                    tier_unlocked = true;
                    log::info!(
                        "Tier {} unlocked ({} challenges)",
                        self.tier(),
                        self.set.len()
                    );
                } else {
                    self.expert = true;
                    became_expert = true;
                    log::info!("All tiers cleared: expert mode");
                }
            }
        }

        log::debug!(
            "Landing at {ball_x:.1}, target {target_x:.1} +/- {delta:.1}: {}",
            if correct { "hit" } else { "miss" }
        );

        HitResult {
            correct,
            challenge_index: index,
            target_x,
            ball_x,
            delta,
            first_play,
            tier_unlocked,
            became_expert,
        }
    }

    /// Allowed distance between the ball centre and the target
    pub fn tolerance(&self) -> f32 {
        let divisor = if self.expert {
            self.expert_hit_divisor
        } else {
            self.hit_divisor
        };
        self.field.ball_size / divisor
    }

    /// Segments the bar should be drawn with for the current target
    pub fn segment_count(&self) -> u32 {
        if self.expert {
            EXPERT_SEGMENTS
        } else if self.mode == Mode::Percents {
            PERCENT_SEGMENTS
        } else {
            self.set
                .get(self.target.challenge_index)
                .map(|c| c.segment_count)
                .unwrap_or(EXPERT_SEGMENTS)
        }
    }

    /// Add a custom `"n/d"` challenge
    pub fn add_fraction(&mut self, label: &str) -> Result<usize, InputError> {
        let label = label.trim();
        let fraction = match label.split_once('/') {
            Some((num, den)) => Fraction::from_entry(num, den)?,
            None => return Err(ParseError::InvalidFormat(label.to_string()).into()),
        };
        self.add_custom(fraction)
    }

    /// Add a custom challenge from separate numerator/denominator entries
    pub fn add_fraction_entry(
        &mut self,
        numerator: &str,
        denominator: &str,
    ) -> Result<usize, InputError> {
        let fraction = Fraction::from_entry(numerator, denominator)?;
        self.add_custom(fraction)
    }

    /// Re-add custom fractions saved as a comma-joined list
    pub fn restore_custom(&mut self, csv: &str) -> usize {
        let mut restored = 0;
        for label in csv.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            match self.add_fraction(label) {
                Ok(_) => restored += 1,
                Err(e) => log::warn!("Skipping saved fraction {label:?}: {e}"),
            }
        }
        restored
    }

    fn add_custom(&mut self, fraction: Fraction) -> Result<usize, InputError> {
        let challenge = Challenge::custom(fraction);
        if self.set.position(&challenge.label).is_some() {
            return Err(InputError::Duplicate(challenge.label));
        }
        log::info!("Added custom fraction {}", challenge.label);
        self.custom.push(challenge.label.clone());
        Ok(self.set.push(challenge))
    }

    fn ensure_not_empty(&mut self) {
        if self.set.is_empty() {
            log::warn!("Empty challenge list; adding 1/2");
            self.set.push(Challenge::new(Fraction::HALF.to_string(), 2));
        }
    }

    /// Value of a challenge, unparseable labels count as 1/2
    fn value_at(&self, index: usize) -> Fraction {
        self.set
            .get(index)
            .and_then(|c| c.fraction().ok())
            .unwrap_or(Fraction::HALF)
    }

    fn target_for(&self, index: usize) -> Target {
        if self.set.get(index).is_none() {
            return Target::default_half();
        }
        let (rational, label) = self.resolve(index);
        let fraction = rational.value();
        Target {
            challenge_index: index,
            rational,
            fraction,
            display_label: self.display_label(rational, &label),
            ball: self.ball_graphic(fraction),
        }
    }

    /// Fraction and label of a challenge, 1/2 when the label is unusable
    fn resolve(&self, index: usize) -> (Fraction, String) {
        let Some(challenge) = self.set.get(index) else {
            return (Fraction::HALF, Fraction::HALF.to_string());
        };
        match challenge.fraction() {
            Ok(f) => (f, challenge.label.clone()),
            Err(e) => {
                log::warn!("Could not parse challenge {:?}: {e}", challenge.label);
                (Fraction::HALF, Fraction::HALF.to_string())
            }
        }
    }

    fn display_label(&self, rational: Fraction, label: &str) -> String {
        match self.mode {
            Mode::Percents => format!("{}%", rational.percent()),
            Mode::Fractions | Mode::Sectors => label.to_string(),
        }
    }

    fn ball_graphic(&self, fraction: f32) -> BallGraphic {
        match self.mode {
            Mode::Sectors => BallGraphic::Sector(fraction),
            Mode::Fractions | Mode::Percents => BallGraphic::Standard,
        }
    }
}
