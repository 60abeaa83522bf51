// Core layer - shared types and configuration
pub mod core;

// Features layer - extraction, confirmation, schedule and reminders
pub mod features;

// Infrastructure
pub mod database;

// Application layer
pub mod command_handler;
pub mod commands;

#[cfg(test)]
mod testing;

pub use core::Config;

pub use features::{
    confirmation::ConfirmationMachine, extraction::EntityExtractor,
    reminders::ReminderScheduler,
};
