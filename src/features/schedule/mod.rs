//! # Feature: Schedule Model
//!
//! Candidate and committed schedule entries plus the store contracts the rest of
//! the bot is written against.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod model;
pub mod store;

pub use model::{
    turns_as_history, Candidate, CommittedEntry, ConversationTurn, EntryKind, EntryPayload,
    EntryRef, Frequency, MealRelation, Medication, MedicationCandidate, NewEntry, TaskCandidate,
    User,
};
pub use store::{ConversationLog, ScheduleStore};
