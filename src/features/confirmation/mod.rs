//! # Feature: Confirmation
//!
//! Holds extracted candidates per user until they answer yes, no, or no with a
//! new time, then commits confirmed entries to the schedule store.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod machine;
pub mod prompt;
pub mod reply;

pub use machine::{ConfirmationMachine, MachineReply, SessionPhase, TurnOutcome};
pub use reply::ConfirmationReply;
