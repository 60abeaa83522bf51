//! Schedule data model: users, candidates, committed entries, conversation turns

use crate::core::ClockTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A person the bot cares for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Opaque id in the messaging platform
    pub owner_id: String,
    pub name: String,
    /// Channel the dispatch engine delivers reminders to
    pub channel_address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealRelation {
    #[default]
    Before,
    After,
}

impl MealRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealRelation::Before => "before",
            MealRelation::After => "after",
        }
    }

    /// Lenient parse; anything unrecognised falls back to `Before`
    pub fn parse_lenient(raw: &str) -> Self {
        let raw = raw.trim().to_lowercase();
        if raw.contains("after") || raw.contains("with") {
            MealRelation::After
        } else {
            MealRelation::Before
        }
    }
}

impl fmt::Display for MealRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Frequency {
    #[default]
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "every6hours")]
    EverySixHours,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::EverySixHours => "every6hours",
        }
    }

    pub fn parse_lenient(raw: &str) -> Self {
        let compact: String = raw
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if compact.contains("6hour") || compact.contains("sixhour") {
            Frequency::EverySixHours
        } else {
            Frequency::Daily
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Medication details shared by candidates and committed entries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Medication {
    pub name: String,
    /// Always at least 1
    pub quantity: u32,
    pub meal: MealRelation,
    pub frequency: Frequency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationCandidate {
    pub medication: Medication,
    /// One committed entry is created per time
    pub times: Vec<ClockTime>,
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCandidate {
    pub task: String,
    pub time: ClockTime,
    pub question: String,
}

/// Unconfirmed extraction result held while a confirmation is outstanding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Medication(MedicationCandidate),
    Task(TaskCandidate),
}

impl Candidate {
    pub fn label(&self) -> &str {
        match self {
            Candidate::Medication(m) => &m.medication.name,
            Candidate::Task(t) => &t.task,
        }
    }

    pub fn times(&self) -> Vec<ClockTime> {
        match self {
            Candidate::Medication(m) => m.times.clone(),
            Candidate::Task(t) => vec![t.time],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Medication,
    Task,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Medication => "medication",
            EntryKind::Task => "task",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryPayload {
    Medication(Medication),
    Task(String),
}

impl EntryPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryPayload::Medication(_) => EntryKind::Medication,
            EntryPayload::Task(_) => EntryKind::Task,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EntryPayload::Medication(m) => &m.name,
            EntryPayload::Task(t) => t,
        }
    }
}

/// Entry about to be committed (always unsent)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub owner_id: String,
    pub payload: EntryPayload,
    pub time: ClockTime,
}

/// Identifies a stored row across the two entry tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub kind: EntryKind,
    pub id: i64,
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.as_str(), self.id)
    }
}

/// Durably stored, confirmed schedule item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedEntry {
    pub id: i64,
    pub owner_id: String,
    pub payload: EntryPayload,
    pub time: ClockTime,
    pub sent: bool,
}

impl CommittedEntry {
    pub fn entry_ref(&self) -> EntryRef {
        EntryRef {
            kind: self.payload.kind(),
            id: self.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub owner_id: String,
    pub user_text: String,
    pub bot_text: String,
    pub created_at: String,
}

/// Flatten turns into (role, content) pairs, oldest first
pub fn turns_as_history(turns: &[ConversationTurn]) -> Vec<(String, String)> {
    turns
        .iter()
        .flat_map(|turn| {
            [
                ("user".to_string(), turn.user_text.clone()),
                ("assistant".to_string(), turn.bot_text.clone()),
            ]
        })
        .collect()
}
