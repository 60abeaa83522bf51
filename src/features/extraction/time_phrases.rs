//! Time phrase normalisation
//!
//! Turns phrases like "night", "every meal" or "4:45 PM" into `HH:MM` clock
//! times. Bare numbers ("Fexet night 1") are never read as times: a clock time
//! needs either minutes or an am/pm marker.

use regex::Regex;
use std::sync::OnceLock;

use crate::core::ClockTime;

/// Used when a medication arrives without any recognisable time
pub const DEFAULT_MEDICATION_TIME: (u8, u8) = (8, 0);

const MEAL_TIMES: &[(u8, u8)] = &[(8, 0), (14, 0), (20, 0)];
const TWICE_TIMES: &[(u8, u8)] = &[(8, 0), (20, 0)];

fn clock_regex() -> &'static Regex {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    CLOCK.get_or_init(|| {
        Regex::new(r"\b(?P<h>\d{1,2})(?::(?P<m>\d{2}))?(?:\s*(?P<ap>am|pm)\b)?")
            .expect("clock pattern is valid")
    })
}

fn phrase_regex() -> &'static Regex {
    static PHRASE: OnceLock<Regex> = OnceLock::new();
    PHRASE.get_or_init(|| {
        Regex::new(
            r"\b(every meal|each meal|with meals|all meals|three times a day|3 times a day|thrice a day|thrice daily|twice a day|twice daily|2 times a day|morning|breakfast|noon|midday|lunch|afternoon|evening|tonight|night|dinner|bedtime)\b",
        )
        .expect("phrase pattern is valid")
    })
}

fn phrase_times(phrase: &str) -> &'static [(u8, u8)] {
    match phrase {
        "every meal" | "each meal" | "with meals" | "all meals" | "three times a day"
        | "3 times a day" | "thrice a day" | "thrice daily" => MEAL_TIMES,
        "twice a day" | "twice daily" | "2 times a day" => TWICE_TIMES,
        "morning" | "breakfast" => &[(8, 0)],
        "noon" | "midday" => &[(12, 0)],
        "lunch" | "afternoon" => &[(14, 0)],
        "evening" => &[(18, 0)],
        "tonight" | "night" | "dinner" | "bedtime" => &[(20, 0)],
        _ => &[],
    }
}

fn clock_from_parts(hour: &str, minute: Option<&str>, meridiem: Option<&str>) -> Option<ClockTime> {
    let mut hour: u8 = hour.parse().ok()?;
    let minute: u8 = match minute {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    match meridiem {
        Some(marker) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            hour %= 12;
            if marker == "pm" {
                hour += 12;
            }
        }
        None if hour > 23 => return None,
        None => {}
    }
    ClockTime::new(hour, minute)
}

/// Every time mentioned in `text`, in order of appearance, without duplicates
pub fn find_times(text: &str) -> Vec<ClockTime> {
    let text = text
        .to_lowercase()
        .replace("a.m.", "am")
        .replace("p.m.", "pm");

    let mut found: Vec<(usize, ClockTime)> = Vec::new();

    for caps in clock_regex().captures_iter(&text) {
        let minute = caps.name("m").map(|m| m.as_str());
        let meridiem = caps.name("ap").map(|m| m.as_str());
        if minute.is_none() && meridiem.is_none() {
            continue;
        }
        let Some(whole) = caps.get(0) else { continue };
        if let Some(time) = clock_from_parts(&caps["h"], minute, meridiem) {
            found.push((whole.start(), time));
        }
    }

    for m in phrase_regex().find_iter(&text) {
        for &(h, min) in phrase_times(m.as_str()) {
            if let Some(time) = ClockTime::new(h, min) {
                found.push((m.start(), time));
            }
        }
    }

    // Stable sort keeps the expansion order of multi-time phrases
    found.sort_by_key(|(pos, _)| *pos);

    let mut times = Vec::new();
    for (_, time) in found {
        if !times.contains(&time) {
            times.push(time);
        }
    }
    times
}

/// Normalise a medication time field, falling back to the default time
pub fn medication_times(raw: &str) -> Vec<ClockTime> {
    let times = find_times(raw);
    if times.is_empty() {
        let (h, m) = DEFAULT_MEDICATION_TIME;
        ClockTime::new(h, m).into_iter().collect()
    } else {
        times
    }
}
