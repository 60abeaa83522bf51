//! Shared context for command handlers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::Result;
use log::info;
use std::sync::Arc;

use crate::features::ai::LanguageModel;
use crate::features::companion::Voice;
use crate::features::confirmation::ConfirmationMachine;
use crate::features::schedule::{CommittedEntry, EntryPayload, ScheduleStore, User};

/// Shared context for all command handlers
///
/// Holds the schedule store, the confirmation machine (so `/clear` can drop
/// pending candidates), the language model for `/love` and the voice.
#[derive(Clone)]
pub struct CommandContext {
    pub store: Arc<dyn ScheduleStore>,
    pub machine: Arc<ConfirmationMachine>,
    pub model: Arc<dyn LanguageModel>,
    pub voice: Voice,
}

/// What `/clear` removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cleared {
    pub entries: usize,
    pub pending: usize,
}

impl CommandContext {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        machine: Arc<ConfirmationMachine>,
        model: Arc<dyn LanguageModel>,
        voice: Voice,
    ) -> Self {
        Self {
            store,
            machine,
            model,
            voice,
        }
    }

    /// Create or refresh the user with their delivery address
    pub async fn register_user(&self, owner_id: &str, name: &str, address: Option<String>) -> Result<()> {
        self.store
            .upsert_user(&User {
                owner_id: owner_id.to_string(),
                name: name.to_string(),
                channel_address: address,
            })
            .await
    }

    pub async fn status_text(&self, owner_id: &str, nickname: &str) -> Result<String> {
        let entries = self.store.entries_for_owner(owner_id).await?;
        Ok(render_status(&entries, nickname))
    }

    pub async fn clear(&self, owner_id: &str) -> Result<Cleared> {
        let pending = self.machine.discard(owner_id).await;
        let entries = self.store.clear_owner(owner_id).await?;
        info!("/clear for {owner_id}: {entries} entries, {pending} pending candidates");
        Ok(Cleared { entries, pending })
    }
}

fn entry_line(entry: &CommittedEntry) -> String {
    let marker = if entry.sent { "✅" } else { "⏳" };
    match &entry.payload {
        EntryPayload::Medication(m) => format!(
            "{marker} `{}` 💊 {} x{} ({} meal, {})",
            entry.time, m.name, m.quantity, m.meal, m.frequency
        ),
        EntryPayload::Task(task) => format!("{marker} `{}` 📝 {task}", entry.time),
    }
}

/// Committed entries in time order, each with its sent marker
pub fn render_status(entries: &[CommittedEntry], nickname: &str) -> String {
    if entries.is_empty() {
        return format!("You don't have any reminders yet, {nickname} 🌸 Tell me about your meds!");
    }

    let mut sorted: Vec<&CommittedEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| (e.time, e.id));

    let mut text = format!("**Your reminders, {nickname}** 💖\n");
    for entry in &sorted {
        text.push_str(&entry_line(entry));
        text.push('\n');
    }
    text
}

pub fn render_cleared(cleared: Cleared, nickname: &str) -> String {
    if cleared.entries == 0 && cleared.pending == 0 {
        return format!("There was nothing to clear, {nickname} 🌸");
    }
    format!(
        "All cleared, {nickname}! Removed {} reminder(s){} 💕",
        cleared.entries,
        if cleared.pending > 0 {
            format!(" and {} waiting for confirmation", cleared.pending)
        } else {
            String::new()
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClockTime;
    use crate::database::Database;
    use crate::features::extraction::EntityExtractor;
    use crate::features::schedule::{Frequency, MealRelation, Medication, NewEntry};
    use crate::testing::ScriptedModel;
    use std::time::Duration;

    #[test]
    fn test_command_context_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<CommandContext>();
    }

    async fn context(responses: Vec<Result<String, String>>) -> (CommandContext, Database) {
        let db = Database::new(":memory:").await.unwrap();
        let model = Arc::new(ScriptedModel::new(responses));
        let machine = ConfirmationMachine::new(
            Arc::new(db.clone()),
            Arc::new(db.clone()),
            EntityExtractor::new(model.clone(), 3, Duration::ZERO),
            10,
        );
        let ctx = CommandContext::new(
            Arc::new(db.clone()),
            Arc::new(machine),
            model,
            Voice::new(vec!["Bole".into()]),
        );
        (ctx, db)
    }

    fn entry(id: i64, payload: EntryPayload, time: (u8, u8), sent: bool) -> CommittedEntry {
        CommittedEntry {
            id,
            owner_id: "u1".into(),
            payload,
            time: ClockTime::new(time.0, time.1).unwrap(),
            sent,
        }
    }

    #[test]
    fn test_render_status_sorted_with_markers() {
        let fexet = EntryPayload::Medication(Medication {
            name: "Fexet".into(),
            quantity: 1,
            meal: MealRelation::Before,
            frequency: Frequency::Daily,
        });
        let entries = vec![
            entry(1, fexet, (20, 0), true),
            entry(2, EntryPayload::Task("drink water".into()), (16, 45), false),
        ];
        let text = render_status(&entries, "Bole");
        let water = text.find("drink water").unwrap();
        let fexet = text.find("Fexet").unwrap();
        assert!(water < fexet);
        assert!(text.contains("✅ `20:00` 💊 Fexet x1 (before meal, daily)"));
        assert!(text.contains("⏳ `16:45` 📝 drink water"));
    }

    #[test]
    fn test_render_status_empty() {
        assert!(render_status(&[], "Bole").contains("don't have any reminders"));
    }

    #[tokio::test]
    async fn test_clear_removes_entries_and_pending() {
        let fexet = r#"{"medication":[{"name":"Fexet","time":"20:00"}]}"#;
        let (ctx, db) = context(vec![Ok(fexet.to_string())]).await;
        db.insert_entry(&NewEntry {
            owner_id: "u1".into(),
            payload: EntryPayload::Task("drink water".into()),
            time: ClockTime::new(16, 45).unwrap(),
        })
        .await
        .unwrap();
        ctx.machine.handle_text("u1", "Bole", "Fexet night").await;

        let cleared = ctx.clear("u1").await.unwrap();
        assert_eq!(cleared, Cleared { entries: 1, pending: 1 });
        assert!(db.entries_for_owner("u1").await.unwrap().is_empty());
        assert!(render_cleared(cleared, "Bole").contains("Removed 1 reminder(s) and 1 waiting"));
    }

    #[tokio::test]
    async fn test_register_user_sets_address() {
        let (ctx, db) = context(vec![]).await;
        ctx.register_user("u1", "Anu", Some("42".into())).await.unwrap();
        let user = db.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.channel_address.as_deref(), Some("42"));
    }
}
