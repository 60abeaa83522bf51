//! # Feature: Companion Voice
//!
//! Loving nicknames and the static texts the bot answers with (welcome, help,
//! apologies, re-prompts), plus the generated `/love` note.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod voice;

pub use voice::Voice;
