//! # Core Module
//!
//! Configuration, clock time and outbound text helpers shared by every feature.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod clock;
pub mod config;
pub mod response;

pub use clock::ClockTime;
pub use config::Config;
pub use response::{preview, split_message, MESSAGE_LIMIT};
