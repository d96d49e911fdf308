//! Error taxonomy
//!
//! None of these are fatal: parse failures fall back to a default target,
//! protocol failures drop the message, input failures leave the engine alone.

use thiserror::Error;

/// A challenge label could not be turned into a fraction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognised challenge label: {0:?}")]
    InvalidFormat(String),

    #[error("bad number in challenge label: {0:?}")]
    BadNumber(String),

    #[error("zero denominator in challenge label")]
    ZeroDenominator,

    #[error("fraction {numerator}/{denominator} is outside (0, 1]")]
    OutOfRange { numerator: u32, denominator: u32 },
}

/// An inbound protocol message could not be handled
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("bad payload for {command}: {source}")]
    BadPayload {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Unknown commands are expected from newer peers and only worth a debug line
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, ProtocolError::UnknownCommand(_))
    }
}

/// A custom fraction entered by the player was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("denominator must not be zero")]
    ZeroDenominator,

    #[error("numerator must be greater than zero")]
    NumeratorNotPositive,

    #[error("denominator must be greater than one")]
    DenominatorTooSmall,

    #[error("numerator {numerator} is larger than denominator {denominator}")]
    Improper { numerator: i64, denominator: i64 },

    #[error("{0} is already in the challenge list")]
    Duplicate(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Session configuration could not be loaded
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    #[error("steps must be at least 2 (got {0})")]
    TooFewSteps(f32),
}
