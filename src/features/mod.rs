//! # Features
//!
//! Each feature owns one concern of the reminder bot:
//!
//! - [`extraction`]: free text to medication and task candidates
//! - [`confirmation`]: per-user yes/no flow that commits candidates
//! - [`schedule`]: stored users, entries and conversation history
//! - [`reminders`]: minute ticker, reminder text and delivery
//! - [`companion`]: nicknames and the bot's affectionate phrasing
//! - [`ai`]: the language model seam

pub mod ai;
pub mod companion;
pub mod confirmation;
pub mod extraction;
pub mod reminders;
pub mod schedule;

pub fn get_bot_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
