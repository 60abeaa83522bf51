//! Affectionate voice: nickname choice and every static reply text

use log::warn;
use rand::seq::IndexedRandom;

use crate::features::ai::LanguageModel;

const LOVE_PROMPT: &str = include_str!("../../../prompt/love.md");
const FALLBACK_NICKNAME: &str = "dear";

#[derive(Debug, Clone)]
pub struct Voice {
    nicknames: Vec<String>,
}

impl Voice {
    pub fn new(nicknames: Vec<String>) -> Self {
        let nicknames = nicknames
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { nicknames }
    }

    /// A nickname picked at random for this response
    pub fn pick(&self) -> String {
        self.nicknames
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| FALLBACK_NICKNAME.to_string())
    }
}

pub fn welcome(nickname: &str) -> String {
    format!(
        "Hi, my sweet {nickname}! 💖 I'm here to look after you.\n\
         Tell me about your medicines or anything you want a nudge for, like \
         \"Fexet night 1\" or \"drink water at 4:45 PM\", and I'll remind you right on time. 🌸"
    )
}

pub fn help_text(nickname: &str) -> String {
    format!(
        "Here's how I can take care of you, {nickname} 🌸\n\n\
         • Send me your meds: `Fexet night 1`, `Predni 2 after every meal`\n\
         • Or a task: `drink water at 4:45 PM`\n\
         • I'll ask you to confirm. Reply **yes**, **no**, or **no, 18:00**\n\n\
         `/status` shows your reminders, `/clear` removes them all, `/love` is just for you 💕"
    )
}

/// Generic apology when the language service is unreachable
pub fn apology(nickname: &str) -> String {
    format!("Oh, {nickname}, I'm having a little trouble thinking right now 😔 Could you try again in a moment? 💕")
}

/// Fixed re-prompt for unparsable extractor output
pub fn confused(nickname: &str) -> String {
    format!("Oh, {nickname}, I got a bit confused! Could you tell me about your meds again? 😊")
}

/// Used when the model found nothing to schedule and said nothing either
pub fn check_in(nickname: &str) -> String {
    format!("How are you feeling today, {nickname}? 🌸 Tell me if there's a medicine or task I should remind you about.")
}

pub fn still_waiting(nickname: &str) -> String {
    format!("Before anything new, {nickname}, I still need a yes or no on this 💖")
}

pub fn discarded(nickname: &str) -> String {
    format!("Okay, {nickname}, I've let those go. Tell me again whenever you're ready 🌸")
}

pub fn all_set(nickname: &str, saved: usize) -> String {
    let noun = if saved == 1 { "reminder" } else { "reminders" };
    format!("All set, my dear {nickname}! I saved {saved} {noun} for you 💖 I'll remind you on time! 😘")
}

pub fn save_failed(nickname: &str, label: &str, time: &str, saved: usize) -> String {
    let mut text = format!("Oh, {nickname}, I couldn't save {label} at {time}! 😔");
    if saved > 0 {
        text.push_str(&format!(" The {saved} before it are safe."));
    }
    text.push_str(" Reply **yes** to try the rest again 💕");
    text
}

pub fn love_fallback(nickname: &str) -> String {
    format!("You mean the world to me, {nickname} 💖 Take care of yourself today, okay? 😘")
}

/// Generated affectionate note, falling back to a static one
pub async fn love_note(model: &dyn LanguageModel, nickname: &str) -> String {
    let prompt = LOVE_PROMPT.replace("{nickname}", nickname);
    match model
        .complete(&prompt, &format!("Send {nickname} some love"), &[])
        .await
    {
        Ok(text) => text,
        Err(e) => {
            warn!("Love note generation failed: {e}");
            love_fallback(nickname)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[test]
    fn test_pick_from_configured() {
        let voice = Voice::new(vec!["Bole".into(), " Kukku Patto ".into(), "".into()]);
        assert_eq!(voice.nicknames.len(), 2);
        for _ in 0..20 {
            let nickname = voice.pick();
            assert!(nickname == "Bole" || nickname == "Kukku Patto");
        }
    }

    #[test]
    fn test_pick_without_nicknames() {
        assert_eq!(Voice::new(vec![]).pick(), "dear");
    }

    #[test]
    fn test_save_failed_mentions_item() {
        let text = save_failed("Bole", "Fexet", "20:00", 2);
        assert!(text.contains("couldn't save Fexet at 20:00"));
        assert!(text.contains("The 2 before it"));
        assert!(!save_failed("Bole", "Fexet", "20:00", 0).contains("before it"));
    }

    #[tokio::test]
    async fn test_love_note_fallback() {
        let model = ScriptedModel::new(vec![Err("down".to_string())]);
        assert_eq!(love_note(&model, "Bole").await, love_fallback("Bole"));

        let model = ScriptedModel::new(vec![Ok("I adore you 💖".to_string())]);
        assert_eq!(love_note(&model, "Bole").await, "I adore you 💖");
    }
}
