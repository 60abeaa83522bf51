//! Entity extraction over the language model
//!
//! Sends the user's text with recent history, then leniently parses the
//! reply into medication and task candidates.

use log::{debug, error, warn};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::time_phrases::{find_times, medication_times};
use crate::core::preview;
use crate::features::ai::LanguageModel;
use crate::features::confirmation::prompt::{medication_question, task_question};
use crate::features::schedule::{
    Frequency, MealRelation, Medication, MedicationCandidate, TaskCandidate,
};

const EXTRACTION_PROMPT: &str = include_str!("../../../prompt/extraction.md");

/// Parsed candidates plus the model's own free-text reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionResult {
    pub medications: Vec<MedicationCandidate>,
    pub tasks: Vec<TaskCandidate>,
    /// Advisory text for the user; only shown when no candidates were found
    pub response: Option<String>,
}

impl ExtractionResult {
    pub fn candidate_count(&self) -> usize {
        self.medications.len() + self.tasks.len()
    }
}

/// Outcome of one extraction request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Parsed(ExtractionResult),
    /// The model answered but the answer could not be parsed
    Malformed,
    /// Every attempt to reach the model failed
    Unavailable,
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default, alias = "medications")]
    medication: Vec<RawMedication>,
    #[serde(default, alias = "tasks", alias = "reminders")]
    task: Vec<RawTask>,
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMedication {
    #[serde(default)]
    name: String,
    #[serde(default)]
    quantity: Value,
    #[serde(default, alias = "meal")]
    meal_timing: Option<String>,
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default, alias = "times")]
    time: Value,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default, alias = "text")]
    task: String,
    #[serde(default)]
    time: Value,
}

/// Strip code fences and any chatter around the JSON object
pub fn strip_markers(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        text = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn quantity_from(value: &Value) -> u32 {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s
            .split_whitespace()
            .next()
            .and_then(|word| word.parse::<u64>().ok()),
        _ => None,
    };
    parsed
        .filter(|q| *q >= 1)
        .map(|q| q.min(u32::MAX as u64) as u32)
        .unwrap_or(1)
}

fn time_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    }
}

/// Parse the model's reply. Returns `None` when it is not usable JSON.
pub fn parse_extraction(raw: &str, nickname: &str) -> Option<ExtractionResult> {
    let parsed: RawExtraction = serde_json::from_str(strip_markers(raw)).ok()?;

    let medications = parsed
        .medication
        .into_iter()
        .filter(|m| !m.name.trim().is_empty())
        .map(|m| {
            let medication = Medication {
                name: m.name.trim().to_string(),
                quantity: quantity_from(&m.quantity),
                meal: m
                    .meal_timing
                    .as_deref()
                    .map(MealRelation::parse_lenient)
                    .unwrap_or_default(),
                frequency: m
                    .frequency
                    .as_deref()
                    .map(Frequency::parse_lenient)
                    .unwrap_or_default(),
            };
            let times = medication_times(&time_text(&m.time));
            let question = medication_question(&medication, &times, nickname);
            MedicationCandidate {
                medication,
                times,
                question,
            }
        })
        .collect();

    let tasks = parsed
        .task
        .into_iter()
        .filter(|t| !t.task.trim().is_empty())
        .filter_map(|t| {
            let task = t.task.trim().to_string();
            match find_times(&time_text(&t.time)).first() {
                Some(&time) => {
                    let question = task_question(&task, time, nickname);
                    Some(TaskCandidate {
                        task,
                        time,
                        question,
                    })
                }
                None => {
                    warn!("Dropping task '{task}' without a recognisable time");
                    None
                }
            }
        })
        .collect();

    Some(ExtractionResult {
        medications,
        tasks,
        response: parsed
            .response
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
    })
}

/// Stateless adapter from free text to candidate entries
#[derive(Clone)]
pub struct EntityExtractor {
    model: Arc<dyn LanguageModel>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl EntityExtractor {
    pub fn new(model: Arc<dyn LanguageModel>, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            model,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    fn system_prompt(nickname: &str) -> String {
        EXTRACTION_PROMPT.replace("{nickname}", nickname)
    }

    pub async fn extract(
        &self,
        text: &str,
        history: &[(String, String)],
        nickname: &str,
    ) -> Extraction {
        let system_prompt = Self::system_prompt(nickname);

        for attempt in 1..=self.max_attempts {
            match self.model.complete(&system_prompt, text, history).await {
                Ok(raw) => {
                    debug!("Extractor raw reply: '{}'", preview(&raw));
                    return match parse_extraction(&raw, nickname) {
                        Some(result) => {
                            debug!(
                                "Extracted {} medication(s), {} task(s)",
                                result.medications.len(),
                                result.tasks.len()
                            );
                            Extraction::Parsed(result)
                        }
                        None => {
                            warn!("Malformed extractor output: '{}'", preview(&raw));
                            Extraction::Malformed
                        }
                    };
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        "Extraction attempt {attempt}/{} failed: {e}. Retrying in {:?}...",
                        self.max_attempts, self.retry_delay
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    error!("Extraction failed after {} attempts: {e}", self.max_attempts);
                }
            }
        }
        Extraction::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    #[test]
    fn test_strip_markers() {
        assert_eq!(strip_markers("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_markers("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_markers("Sure! {\"a\":1} hope that helps"), "{\"a\":1}");
        assert_eq!(strip_markers("no json here"), "no json here");
    }

    #[test]
    fn test_parse_medication_with_defaults() {
        let raw = r#"{"medication":[{"name":"Fexet","time":"night"}],"response":"ok"}"#;
        let result = parse_extraction(raw, "Bole").unwrap();
        assert_eq!(result.medications.len(), 1);

        let candidate = &result.medications[0];
        assert_eq!(candidate.medication.name, "Fexet");
        assert_eq!(candidate.medication.quantity, 1);
        assert_eq!(candidate.medication.meal, MealRelation::Before);
        assert_eq!(candidate.medication.frequency, Frequency::Daily);
        assert_eq!(candidate.times[0].to_string(), "20:00");
        assert!(candidate.question.contains("20:00"));
        assert!(candidate.question.contains("Fexet"));
    }

    #[test]
    fn test_parse_lenient_fields() {
        let raw = r#"```json
        {"medication":[{"name":"Predni","quantity":"2 tablets","meal_timing":"after","frequency":"every 6 hours","time":["08:00","every meal"]}]}
        ```"#;
        let result = parse_extraction(raw, "Bole").unwrap();
        let candidate = &result.medications[0];
        assert_eq!(candidate.medication.quantity, 2);
        assert_eq!(candidate.medication.meal, MealRelation::After);
        assert_eq!(candidate.medication.frequency, Frequency::EverySixHours);
        let times: Vec<String> = candidate.times.iter().map(|t| t.to_string()).collect();
        assert_eq!(times, vec!["08:00", "14:00", "20:00"]);
        assert!(result.response.is_none());
    }

    #[test]
    fn test_parse_task() {
        let raw = r#"{"medication":[],"task":[{"task":"drink water","time":"4:45 PM"}],"response":"Sure"}"#;
        let result = parse_extraction(raw, "Bole").unwrap();
        assert!(result.medications.is_empty());
        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].task, "drink water");
        assert_eq!(result.tasks[0].time.to_string(), "16:45");
    }

    #[test]
    fn test_task_without_time_dropped() {
        let raw = r#"{"task":[{"task":"call mum"}]}"#;
        let result = parse_extraction(raw, "Bole").unwrap();
        assert_eq!(result.candidate_count(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_extraction("I am not JSON", "Bole").is_none());
        assert!(parse_extraction("{\"medication\": [", "Bole").is_none());
    }

    #[tokio::test]
    async fn test_extract_malformed() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("total nonsense".to_string())]));
        let extractor = EntityExtractor::new(model.clone(), 3, Duration::ZERO);
        let outcome = extractor.extract("hello", &[], "Bole").await;
        assert_eq!(outcome, Extraction::Malformed);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_extract_retries_then_succeeds() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err("timeout".to_string()),
            Ok(r#"{"medication":[{"name":"Fexet","quantity":1,"time":"20:00"}],"response":"ok"}"#.to_string()),
        ]));
        let extractor = EntityExtractor::new(model.clone(), 3, Duration::ZERO);
        match extractor.extract("Fexet night 1", &[], "Bole").await {
            Extraction::Parsed(result) => assert_eq!(result.medications.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_extract_unavailable_after_max_attempts() {
        let model = Arc::new(ScriptedModel::new(vec![
            Err("down".to_string()),
            Err("down".to_string()),
            Err("down".to_string()),
            Ok("{}".to_string()),
        ]));
        let extractor = EntityExtractor::new(model.clone(), 3, Duration::ZERO);
        assert_eq!(extractor.extract("hi", &[], "Bole").await, Extraction::Unavailable);
        assert_eq!(model.calls(), 3);
    }
}
