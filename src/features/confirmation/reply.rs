//! Reply grammar while a confirmation is outstanding

use crate::core::ClockTime;
use crate::features::extraction::find_times;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationReply {
    Affirm,
    /// Empty `replacement` means a bare "no"
    Decline { replacement: Vec<ClockTime> },
    Unrecognized,
}

impl ConfirmationReply {
    /// Case-insensitive prefix match on the trimmed text, so "yes please" and
    /// "no, change it to 18:00" both count
    pub fn parse(text: &str) -> Self {
        let text = text.trim().to_lowercase();
        if text.starts_with("yes") {
            ConfirmationReply::Affirm
        } else if let Some(rest) = text.strip_prefix("no") {
            let mut replacement = find_times(rest);
            if replacement.is_empty() {
                replacement.extend(bare_hour(rest));
            }
            ConfirmationReply::Decline { replacement }
        } else {
            ConfirmationReply::Unrecognized
        }
    }
}

/// "no, 9" or "no at 21": a lone whole hour is the replacement time
fn bare_hour(rest: &str) -> Option<ClockTime> {
    let rest = rest.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!'));
    let rest = rest
        .strip_prefix("at ")
        .or_else(|| rest.strip_prefix("to "))
        .unwrap_or(rest)
        .trim();
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    ClockTime::new(rest.parse().ok()?, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirm_prefix() {
        assert_eq!(ConfirmationReply::parse("yes"), ConfirmationReply::Affirm);
        assert_eq!(ConfirmationReply::parse("  YES please"), ConfirmationReply::Affirm);
    }

    #[test]
    fn test_decline_with_time() {
        assert_eq!(
            ConfirmationReply::parse("no, change it to 18:00"),
            ConfirmationReply::Decline {
                replacement: vec![ClockTime::new(18, 0).unwrap()]
            }
        );
        assert_eq!(
            ConfirmationReply::parse("No, morning"),
            ConfirmationReply::Decline {
                replacement: vec![ClockTime::new(8, 0).unwrap()]
            }
        );
    }

    #[test]
    fn test_bare_decline() {
        assert_eq!(
            ConfirmationReply::parse("no"),
            ConfirmationReply::Decline { replacement: vec![] }
        );
        assert_eq!(
            ConfirmationReply::parse("no thanks"),
            ConfirmationReply::Decline { replacement: vec![] }
        );
    }

    #[test]
    fn test_decline_with_bare_hour() {
        assert_eq!(
            ConfirmationReply::parse("no, 9"),
            ConfirmationReply::Decline {
                replacement: vec![ClockTime::new(9, 0).unwrap()]
            }
        );
        assert_eq!(
            ConfirmationReply::parse("No at 21"),
            ConfirmationReply::Decline {
                replacement: vec![ClockTime::new(21, 0).unwrap()]
            }
        );
        // Out of range or mixed with other words stays a bare "no"
        assert_eq!(
            ConfirmationReply::parse("no, 25"),
            ConfirmationReply::Decline { replacement: vec![] }
        );
        assert_eq!(
            ConfirmationReply::parse("no, 2 tablets"),
            ConfirmationReply::Decline { replacement: vec![] }
        );
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(
            ConfirmationReply::parse("I also take Predni"),
            ConfirmationReply::Unrecognized
        );
        assert_eq!(ConfirmationReply::parse(""), ConfirmationReply::Unrecognized);
    }
}
