//! Shared-session networking
//!
//! The transport itself belongs to the host; this module only knows how to
//! encode the turn/roster messages and how each participant reacts to them.

pub mod protocol;
pub mod turn;

pub use protocol::{ColorPair, Command, Envelope, Message};
pub use turn::{Player, Role, TurnCoordinator, TurnEvent, TurnPhase, TurnState};
