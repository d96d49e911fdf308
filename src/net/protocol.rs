//! Turn/roster wire protocol
//!
//! Every message travels as a JSON envelope `{"command": ..., "data": ...}`
//! where `data` is itself a JSON document holding the payload:
//!
//! | command    | data                                   |
//! |------------|----------------------------------------|
//! | `join`     | `["nick", ["stroke", "fill"]]`         |
//! | `roster`   | `[["a", "b"], [["s", "f"], ["s", "f"]]]` |
//! | `fraction` | `"3/4"`                                |
//! | `turn`     | `"nick"`                               |
//! | `leave`    | `["nick"]`                             |
//!
//! The one-letter codes `j`, `b`, `f`, `t`, `l` are accepted on input.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// A participant's stroke and fill colours
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair(pub String, pub String);

impl ColorPair {
    pub fn new(stroke: impl Into<String>, fill: impl Into<String>) -> Self {
        Self(stroke.into(), fill.into())
    }
}

impl Default for ColorPair {
    fn default() -> Self {
        Self::new("#A0FFA0", "#FF8080")
    }
}

/// Message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Join,
    Roster,
    Fraction,
    Turn,
    Leave,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Join => "join",
            Command::Roster => "roster",
            Command::Fraction => "fraction",
            Command::Turn => "turn",
            Command::Leave => "leave",
        }
    }

    /// Accepts both the names and the legacy one-letter codes
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "join" | "j" => Some(Command::Join),
            "roster" | "b" => Some(Command::Roster),
            "fraction" | "f" => Some(Command::Fraction),
            "turn" | "t" => Some(Command::Turn),
            "leave" | "l" => Some(Command::Leave),
            _ => None,
        }
    }
}

/// A protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Joiner → sharer
    Join { nick: String, colors: ColorPair },
    /// Sharer → all: the canonical roster, in turn order
    Roster {
        nicks: Vec<String>,
        colors: Vec<ColorPair>,
    },
    /// Turn holder → all: the fraction to play
    Fraction { label: String },
    /// Turn holder → all: who acts next
    Turn { nick: String },
    /// Departing participant → sharer
    Leave { nick: String },
}

/// Wire envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub command: String,
    pub data: String,
}

impl Message {
    pub fn command(&self) -> Command {
        match self {
            Message::Join { .. } => Command::Join,
            Message::Roster { .. } => Command::Roster,
            Message::Fraction { .. } => Command::Fraction,
            Message::Turn { .. } => Command::Turn,
            Message::Leave { .. } => Command::Leave,
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope, ProtocolError> {
        let data = match self {
            Message::Join { nick, colors } => serde_json::to_string(&(nick, colors)),
            Message::Roster { nicks, colors } => serde_json::to_string(&(nicks, colors)),
            Message::Fraction { label } => serde_json::to_string(label),
            Message::Turn { nick } => serde_json::to_string(nick),
            Message::Leave { nick } => serde_json::to_string(&(nick,)),
        }?;
        Ok(Envelope {
            command: self.command().as_str().to_string(),
            data,
        })
    }

    pub fn from_envelope(envelope: &Envelope) -> Result<Self, ProtocolError> {
        let command = Command::from_code(&envelope.command)
            .ok_or_else(|| ProtocolError::UnknownCommand(envelope.command.clone()))?;
        let data = envelope.data.as_str();

        let message = match command {
            Command::Join => {
                let (nick, colors): (String, ColorPair) = payload(command, data)?;
                Message::Join { nick, colors }
            }
            Command::Roster => {
                let (nicks, colors): (Vec<String>, Vec<ColorPair>) = payload(command, data)?;
                if nicks.len() != colors.len() {
                    return Err(ProtocolError::BadPayload {
                        command: command.as_str(),
                        source: serde_json::Error::custom(format!(
                            "{} nicknames but {} colour pairs",
                            nicks.len(),
                            colors.len()
                        )),
                    });
                }
                Message::Roster { nicks, colors }
            }
            Command::Fraction => Message::Fraction {
                label: payload(command, data)?,
            },
            Command::Turn => Message::Turn {
                nick: payload(command, data)?,
            },
            Command::Leave => {
                let (nick,): (String,) = payload(command, data)?;
                Message::Leave { nick }
            }
        };
        Ok(message)
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(&self.to_envelope()?)?)
    }

    /// Parse wire bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        Self::from_envelope(&envelope)
    }
}

fn payload<T: DeserializeOwned>(command: Command, data: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(data).map_err(|source| ProtocolError::BadPayload {
        command: command.as_str(),
        source,
    })
}
