//! Renders the message body for a due entry

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::care::care_notes;
use crate::features::ai::LanguageModel;
use crate::features::schedule::{
    turns_as_history, CommittedEntry, ConversationLog, ConversationTurn, EntryPayload, Medication,
    User,
};

const REMINDER_PROMPT: &str = include_str!("../../../prompt/reminder.md");

pub fn fallback_medication_text(nickname: &str, medication: &Medication) -> String {
    format!(
        "💖 {nickname}, it's time for your {} {} ({} your meal) 🌸 Feeling okay today?",
        medication.quantity, medication.name, medication.meal
    )
}

pub fn task_text(nickname: &str, task: &str) -> String {
    format!("⏰ {nickname}, it's time to {task}! 💖")
}

pub struct ReminderComposer {
    model: Arc<dyn LanguageModel>,
    conversation_log: Arc<dyn ConversationLog>,
    history_turns: usize,
    generation_timeout: Duration,
}

impl ReminderComposer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        conversation_log: Arc<dyn ConversationLog>,
        history_turns: usize,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            model,
            conversation_log,
            history_turns,
            generation_timeout,
        }
    }

    async fn history(&self, owner_id: &str) -> Vec<ConversationTurn> {
        self.conversation_log
            .recent_turns(owner_id, self.history_turns)
            .await
            .unwrap_or_else(|e| {
                warn!("Could not load history for {owner_id}: {e}");
                Vec::new()
            })
    }

    async fn generate(
        &self,
        user: &User,
        nickname: &str,
        medication: &Medication,
        history: &[ConversationTurn],
        limit: Duration,
    ) -> String {
        let system_prompt = REMINDER_PROMPT
            .replace("{nickname}", nickname)
            .replace("{name}", &user.name);
        let request = format!(
            "Remind {nickname} to take {} {} {} their meal.",
            medication.quantity, medication.name, medication.meal
        );

        let generated = timeout(
            limit,
            self.model
                .complete(&system_prompt, &request, &turns_as_history(history)),
        )
        .await;

        match generated {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Reminder generation failed for {}: {e}", medication.name);
                fallback_medication_text(nickname, medication)
            }
            Err(_) => {
                warn!(
                    "Reminder generation timed out after {:?} for {}",
                    limit, medication.name
                );
                fallback_medication_text(nickname, medication)
            }
        }
    }

    /// Message for `entry`. Never fails: generation problems fall back to a template.
    ///
    /// Generation gets at most `budget` (and never more than the composer's own
    /// timeout), so the caller keeps time to deliver the fallback.
    pub async fn compose(
        &self,
        user: &User,
        nickname: &str,
        entry: &CommittedEntry,
        budget: Duration,
    ) -> String {
        let limit = budget.min(self.generation_timeout);
        match &entry.payload {
            EntryPayload::Task(task) => task_text(nickname, task),
            EntryPayload::Medication(medication) => {
                let history = self.history(&entry.owner_id).await;
                let mut text = self.generate(user, nickname, medication, &history, limit)
                    .await;
                let notes = care_notes(
                    &medication.name,
                    medication.quantity,
                    medication.meal,
                    &history,
                );
                debug!("Adding {} care note(s) for {}", notes.len(), medication.name);
                text.push_str("\n\n");
                text.push_str(&notes.join("\n"));
                text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClockTime;
    use crate::database::Database;
    use crate::features::schedule::{Frequency, MealRelation};
    use crate::testing::ScriptedModel;

    const BUDGET: Duration = Duration::from_secs(5);

    fn user() -> User {
        User {
            owner_id: "u1".into(),
            name: "Anu".into(),
            channel_address: Some("42".into()),
        }
    }

    fn entry(payload: EntryPayload) -> CommittedEntry {
        CommittedEntry {
            id: 1,
            owner_id: "u1".into(),
            payload,
            time: ClockTime::new(20, 0).unwrap(),
            sent: false,
        }
    }

    fn fexet() -> Medication {
        Medication {
            name: "Fexet".into(),
            quantity: 1,
            meal: MealRelation::Before,
            frequency: Frequency::Daily,
        }
    }

    async fn composer(responses: Vec<Result<String, String>>) -> ReminderComposer {
        let db = Database::new(":memory:").await.unwrap();
        ReminderComposer::new(
            Arc::new(ScriptedModel::new(responses)),
            Arc::new(db),
            10,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_medication_text_has_generated_body_and_notes() {
        let composer = composer(vec![Ok("Time for Fexet, Bole 💖".to_string())]).await;
        let text = composer
            .compose(&user(), "Bole", &entry(EntryPayload::Medication(fexet())), BUDGET)
            .await;
        assert!(text.starts_with("Time for Fexet, Bole 💖"));
        for note in care_notes("Fexet", 1, MealRelation::Before, &[]) {
            assert!(text.contains(&note));
        }
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back() {
        let composer = composer(vec![Err("down".to_string())]).await;
        let text = composer
            .compose(&user(), "Bole", &entry(EntryPayload::Medication(fexet())), BUDGET)
            .await;
        assert!(text.starts_with(&fallback_medication_text("Bole", &fexet())));
    }

    #[tokio::test]
    async fn test_task_text_is_deterministic() {
        let composer = composer(vec![]).await;
        let text = composer
            .compose(&user(), "Bole", &entry(EntryPayload::Task("drink water".into())), BUDGET)
            .await;
        assert_eq!(text, "⏰ Bole, it's time to drink water! 💖");
    }

    #[tokio::test]
    async fn test_slow_generation_falls_back_within_budget() {
        let db = Database::new(":memory:").await.unwrap();
        let composer = ReminderComposer::new(
            Arc::new(ScriptedModel::repeating("late").with_delay(Duration::from_millis(400))),
            Arc::new(db),
            10,
            Duration::from_secs(5),
        );

        let started = tokio::time::Instant::now();
        let text = composer
            .compose(
                &user(),
                "Bole",
                &entry(EntryPayload::Medication(fexet())),
                Duration::from_millis(50),
            )
            .await;
        assert!(started.elapsed() < Duration::from_millis(400));
        assert!(text.starts_with(&fallback_medication_text("Bole", &fexet())));
        assert!(!text.contains("late"));
    }
}
