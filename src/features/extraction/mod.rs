//! # Feature: Entity Extraction
//!
//! Turns free text ("Fexet night 1", "drink water at 4:45 PM") into medication
//! and task candidates using the language model. Time phrase normalisation
//! lives here so the confirmation flow only ever sees `HH:MM` values.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod extractor;
pub mod time_phrases;

pub use extractor::{parse_extraction, strip_markers, EntityExtractor, Extraction, ExtractionResult};
pub use time_phrases::{find_times, medication_times};
