//! Challenges and difficulty tiers
//!
//! A challenge is a label ("3/4" or "75%") plus the number of segments the
//! bar is drawn with while it is played. Challenges are unlocked a tier at a
//! time and never removed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InputError, ParseError};

/// Longest decimal tail accepted in a percentage label
const MAX_PERCENT_DECIMALS: usize = 6;

/// An exact fraction in (0, 1]
///
/// Equality is rational: `2/4 == 1/2`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        self.numerator as u64 * other.denominator as u64
            == other.numerator as u64 * self.denominator as u64
    }
}

impl Eq for Fraction {}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl Fraction {
    pub const HALF: Fraction = Fraction {
        numerator: 1,
        denominator: 2,
    };

    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ParseError> {
        if denominator == 0 {
            return Err(ParseError::ZeroDenominator);
        }
        if numerator == 0 || numerator > denominator {
            return Err(ParseError::OutOfRange {
                numerator,
                denominator,
            });
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Parse a challenge label: `"n/d"` or `"p%"` (decimals allowed in `p`)
    pub fn parse(label: &str) -> Result<Self, ParseError> {
        let label = label.trim();
        if let Some((num, den)) = label.split_once('/') {
            let numerator = parse_u32(num)?;
            let denominator = parse_u32(den)?;
            Self::new(numerator, denominator)
        } else if let Some(percent) = label.strip_suffix('%') {
            parse_percent(percent.trim())
        } else {
            Err(ParseError::InvalidFormat(label.to_string()))
        }
    }

    /// Validate a custom fraction typed into separate numerator and
    /// denominator fields
    pub fn from_entry(numerator: &str, denominator: &str) -> Result<Self, InputError> {
        let num = numerator
            .trim()
            .parse::<i64>()
            .map_err(|_| InputError::NotANumber(numerator.trim().to_string()))?;
        let den = denominator
            .trim()
            .parse::<i64>()
            .map_err(|_| InputError::NotANumber(denominator.trim().to_string()))?;

        if den == 0 {
            return Err(InputError::ZeroDenominator);
        }
        if num > den {
            return Err(InputError::Improper {
                numerator: num,
                denominator: den,
            });
        }
        if num <= 0 {
            return Err(InputError::NumeratorNotPositive);
        }
        if den <= 1 {
            return Err(InputError::DenominatorTooSmall);
        }
        let den = u32::try_from(den).map_err(|_| InputError::NotANumber(den.to_string()))?;
        // num <= den, so it fits too
        Ok(Self::new(num as u32, den)?)
    }

    /// Value as a float in (0, 1]
    #[inline]
    pub fn value(&self) -> f32 {
        (self.numerator as f64 / self.denominator as f64) as f32
    }

    /// Nearest whole percentage, halves rounded up
    pub fn percent(&self) -> u32 {
        let n = self.numerator as u64;
        let d = self.denominator as u64;
        ((200 * n + d) / (2 * d)) as u32
    }
}

fn parse_u32(text: &str) -> Result<u32, ParseError> {
    let text = text.trim();
    text.parse::<u32>()
        .map_err(|_| ParseError::BadNumber(text.to_string()))
}

fn parse_percent(text: &str) -> Result<Fraction, ParseError> {
    let (whole, decimals) = text.split_once('.').unwrap_or((text, ""));
    if decimals.len() > MAX_PERCENT_DECIMALS || !decimals.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::BadNumber(text.to_string()));
    }
    let whole = if whole.is_empty() { 0 } else { parse_u32(whole)? };
    let tail = if decimals.is_empty() { 0 } else { parse_u32(decimals)? };

    let shift = 10u64.pow(decimals.len() as u32);
    let numerator = whole as u64 * shift + tail as u64;
    let denominator = 100 * shift;
    if numerator > denominator {
        return Err(ParseError::OutOfRange {
            numerator: u32::try_from(numerator).unwrap_or(u32::MAX),
            denominator: denominator as u32,
        });
    }
    Fraction::new(numerator as u32, denominator as u32)
}

/// A single fraction target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Text shown on the ball in fractions mode
    pub label: String,
    /// Bar segments drawn while this challenge is played
    pub segment_count: u32,
    /// Landings scored against this challenge
    pub times_played: u32,
}

impl Challenge {
    pub fn new(label: impl Into<String>, segment_count: u32) -> Self {
        Self {
            label: label.into(),
            segment_count: segment_count.max(1),
            times_played: 0,
        }
    }

    /// Player-supplied fraction: the bar is split by the denominator
    pub fn custom(fraction: Fraction) -> Self {
        Self::new(fraction.to_string(), fraction.denominator)
    }

    pub fn fraction(&self) -> Result<Fraction, ParseError> {
        Fraction::parse(&self.label)
    }
}

fn tier(entries: &[(&str, u32)]) -> Vec<Challenge> {
    entries
        .iter()
        .map(|&(label, segments)| Challenge::new(label, segments))
        .collect()
}

/// The stock challenge table, easiest tier first
pub fn default_tiers() -> Vec<Vec<Challenge>> {
    vec![
        tier(&[("1/2", 2), ("1/3", 3), ("1/4", 4), ("2/4", 4), ("2/3", 3), ("3/4", 4)]),
        tier(&[("1/8", 8), ("2/8", 8), ("3/8", 8), ("4/8", 8), ("5/8", 8), ("6/8", 8), ("7/8", 8)]),
        tier(&[("1/6", 6), ("2/6", 6), ("3/6", 6), ("4/6", 6), ("5/6", 6)]),
        tier(&[("1/5", 10), ("2/5", 10), ("3/5", 10), ("4/5", 10)]),
        tier(&[
            ("1/10", 10),
            ("2/10", 10),
            ("3/10", 10),
            ("4/10", 10),
            ("5/10", 10),
            ("6/10", 10),
            ("7/10", 10),
            ("8/10", 10),
            ("9/10", 10),
        ]),
        tier(&[
            ("1/12", 12),
            ("2/12", 12),
            ("3/12", 12),
            ("4/12", 12),
            ("3/12", 12),
            ("6/12", 12),
            ("7/12", 12),
            ("8/12", 12),
            ("9/12", 12),
            ("10/12", 12),
            ("11/12", 12),
        ]),
        tier(&[
            ("1/16", 4),
            ("2/16", 4),
            ("3/16", 4),
            ("4/16", 4),
            ("5/16", 4),
            ("6/16", 4),
            ("7/16", 4),
            ("8/16", 4),
            ("9/16", 4),
            ("10/16", 4),
            ("11/16", 4),
            ("12/16", 4),
            ("13/16", 4),
            ("14/16", 4),
            ("15/16", 4),
        ]),
    ]
}

/// Tiered challenge list
///
/// `active` holds every challenge unlocked so far (plus custom additions),
/// in unlock order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeSet {
    tiers: Vec<Vec<Challenge>>,
    unlocked: usize,
    active: Vec<Challenge>,
}

impl Default for ChallengeSet {
    fn default() -> Self {
        Self::new(default_tiers())
    }
}

impl ChallengeSet {
    /// Build a set with the first tier already unlocked
    pub fn new(tiers: Vec<Vec<Challenge>>) -> Self {
        let mut set = Self {
            tiers,
            unlocked: 0,
            active: Vec::new(),
        };
        set.unlock_next();
        set
    }

    /// Append the next tier to the active list; false once all are unlocked
    pub fn unlock_next(&mut self) -> bool {
        match self.tiers.get(self.unlocked) {
            Some(tier) => {
                self.active.extend(tier.iter().cloned());
                self.unlocked += 1;
                true
            }
            None => false,
        }
    }

    /// Tiers unlocked so far
    pub fn unlocked(&self) -> usize {
        self.unlocked
    }

    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.unlocked >= self.tiers.len()
    }

    pub fn active(&self) -> &[Challenge] {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Challenge> {
        self.active.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Challenge> {
        self.active.get_mut(index)
    }

    /// Index of the first challenge with exactly this label
    pub fn position(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.active.iter().position(|c| c.label == label)
    }

    pub fn push(&mut self, challenge: Challenge) -> usize {
        self.active.push(challenge);
        self.active.len() - 1
    }

    /// Challenge whose value is closest to `f` (first one wins ties)
    pub fn nearest(&self, f: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, challenge) in self.active.iter().enumerate() {
            let Ok(fraction) = challenge.fraction() else {
                continue;
            };
            let delta = (fraction.value() - f).abs();
            if best.is_none_or(|(_, d)| delta < d) {
                best = Some((i, delta));
            }
        }
        best.map(|(i, _)| i)
    }
}
