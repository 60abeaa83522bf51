//! Deterministic care notes appended to medication reminders

use crate::features::schedule::{ConversationTurn, MealRelation};

/// (name keyword, note) pairs matched case-insensitively against the medication name
const NAME_NOTES: &[(&str, &str)] = &[
    ("iron", "🍊 A little orange juice helps it along; skip tea or coffee for an hour."),
    ("calcium", "🥛 Keep it apart from iron tablets if you take both."),
    ("vitamin d", "🧈 It likes a meal with a bit of fat."),
    ("predni", "🍞 Have something to eat with it, please."),
    ("metformin", "🍽️ Take it with your meal to be gentle on your tummy."),
    ("antibiotic", "⏳ Finish the whole course, even when you feel better."),
];

const UNWELL_WORDS: &[&str] = &[
    "sick", "unwell", "tired", "headache", "pain", "fever", "nausea", "dizzy",
];

fn meal_note(meal: MealRelation) -> &'static str {
    match meal {
        MealRelation::Before => "🕐 This one goes before your meal.",
        MealRelation::After => "🍽️ Eat something first, then take this one.",
    }
}

/// Notes for one dose. Output depends only on the arguments.
pub fn care_notes(
    name: &str,
    quantity: u32,
    meal: MealRelation,
    history: &[ConversationTurn],
) -> Vec<String> {
    let mut notes = vec![meal_note(meal).to_string()];

    if quantity > 1 {
        notes.push(format!("💊 Remember it's {quantity} this time, not just one."));
    }

    let lowered = name.to_lowercase();
    notes.extend(
        NAME_NOTES
            .iter()
            .filter(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, note)| note.to_string()),
    );

    let unwell = history.iter().any(|turn| {
        let text = turn.user_text.to_lowercase();
        UNWELL_WORDS.iter().any(|word| text.contains(word))
    });
    if unwell {
        notes.push("💕 You mentioned not feeling great. Rest and drink some water, okay?".to_string());
    } else {
        notes.push("💧 A full glass of water with it, please.".to_string());
    }

    notes
}
