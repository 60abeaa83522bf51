//! Outbound message sizing helpers
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

/// Discord message content limit
pub const MESSAGE_LIMIT: usize = 2000;

/// Split text into Discord-sized messages, preferring line boundaries
///
/// Never splits inside a UTF-8 character. Lines longer than the limit are cut
/// at the last character boundary that fits.
pub fn split_message(text: &str) -> Vec<String> {
    split_at_limit(text, MESSAGE_LIMIT)
}

fn split_at_limit(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let needed = if current.is_empty() { line.len() } else { line.len() + 1 };
        if current.len() + needed > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }

        let mut rest = line;
        while rest.len() > limit {
            let cut = floor_boundary(rest, limit);
            parts.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(rest);
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn floor_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Short single-line preview of user text for log lines
pub fn preview(text: &str) -> String {
    text.chars().take(100).collect::<String>().replace('\n', " ")
}
