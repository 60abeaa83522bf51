//! # Feature: Reminders
//!
//! Minute-aligned dispatch of committed entries, message composition with
//! care notes, and delivery with bounded retry.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod care;
pub mod composer;
pub mod notifier;
pub mod scheduler;

pub use care::care_notes;
pub use composer::ReminderComposer;
pub use notifier::{deliver_with_retry, DeliveryOutcome, DiscordNotifier, Notifier};
pub use scheduler::{DispatchOutcome, DispatchSettings, ReminderScheduler, TickReport};
