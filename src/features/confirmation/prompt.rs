//! Deterministic confirmation text built from parsed candidate fields

use crate::core::ClockTime;
use crate::features::schedule::{Candidate, MealRelation, Medication};

pub fn format_times(times: &[ClockTime]) -> String {
    times
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn dose(medication: &Medication) -> String {
    let unit = if medication.quantity == 1 { "dose" } else { "doses" };
    let meal = match medication.meal {
        MealRelation::Before => "before meals",
        MealRelation::After => "after meals",
    };
    format!("{} {unit}, {meal}, {}", medication.quantity, medication.frequency)
}

pub fn medication_question(medication: &Medication, times: &[ClockTime], nickname: &str) -> String {
    format!(
        "Is {} okay for {} ({}), {nickname}?",
        format_times(times),
        medication.name,
        dose(medication)
    )
}

pub fn task_question(task: &str, time: ClockTime, nickname: &str) -> String {
    format!("Should I remind you to {task} at {time}, {nickname}?")
}

/// Re-render a candidate's question after its fields changed
pub fn refresh_question(candidate: &mut Candidate, nickname: &str) {
    match candidate {
        Candidate::Medication(m) => {
            m.question = medication_question(&m.medication, &m.times, nickname);
        }
        Candidate::Task(t) => {
            t.question = task_question(&t.task, t.time, nickname);
        }
    }
}

fn candidate_line(candidate: &Candidate) -> String {
    match candidate {
        Candidate::Medication(m) => format!(
            "💊 **{}**: {} at {}",
            m.medication.name,
            dose(&m.medication),
            format_times(&m.times)
        ),
        Candidate::Task(t) => format!("📝 **{}** at {}", t.task, t.time),
    }
}

/// Summary of everything pending, ending with the reply grammar
pub fn confirmation_prompt(candidates: &[Candidate], nickname: &str) -> String {
    let mut prompt = format!("Here's what I understood, {nickname} 💖\n\n");
    for candidate in candidates {
        prompt.push_str(&format!("• {}\n", candidate_line(candidate)));
    }
    if let [only] = candidates {
        let question = match only {
            Candidate::Medication(m) => &m.question,
            Candidate::Task(t) => &t.question,
        };
        prompt.push_str(&format!("\n{question}\n"));
    }
    prompt.push_str(
        "\nReply **yes** to save, **no** to cancel, or **no, 18:00** to change the time.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::schedule::{Frequency, MedicationCandidate, TaskCandidate};

    fn fexet() -> Candidate {
        let medication = Medication {
            name: "Fexet".into(),
            quantity: 1,
            meal: MealRelation::Before,
            frequency: Frequency::Daily,
        };
        let times = vec![ClockTime::new(20, 0).unwrap()];
        let question = medication_question(&medication, &times, "Bole");
        Candidate::Medication(MedicationCandidate {
            medication,
            times,
            question,
        })
    }

    #[test]
    fn test_medication_question_uses_fields() {
        let Candidate::Medication(m) = fexet() else { unreachable!() };
        assert_eq!(
            m.question,
            "Is 20:00 okay for Fexet (1 dose, before meals, daily), Bole?"
        );
    }

    #[test]
    fn test_prompt_lists_every_candidate() {
        let time = ClockTime::new(16, 45).unwrap();
        let task = Candidate::Task(TaskCandidate {
            task: "drink water".into(),
            time,
            question: task_question("drink water", time, "Bole"),
        });
        let prompt = confirmation_prompt(&[fexet(), task], "Bole");
        assert!(prompt.contains("**Fexet**: 1 dose, before meals, daily at 20:00"));
        assert!(prompt.contains("**drink water** at 16:45"));
        assert!(prompt.contains("**yes**"));
    }

    #[test]
    fn test_refresh_question_after_retime() {
        let mut candidate = fexet();
        if let Candidate::Medication(m) = &mut candidate {
            m.times = vec![ClockTime::new(18, 0).unwrap()];
        }
        refresh_question(&mut candidate, "Kukku Patto");
        let Candidate::Medication(m) = candidate else { unreachable!() };
        assert!(m.question.starts_with("Is 18:00 okay"));
        assert!(m.question.ends_with("Kukku Patto?"));
    }
}
