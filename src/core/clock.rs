//! Wall-clock time of day at minute granularity
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A delivery time of day (`HH:MM`, 24h, no seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Current time of day in the deployment's local zone
    pub fn now_local() -> Self {
        Self::from_naive(Local::now().time())
    }

    /// Truncates seconds
    pub fn from_naive(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid time '{s}', expected HH:MM"))?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(anyhow!("Invalid time '{s}', expected HH:MM"));
        }
        let hour: u8 = h.parse().map_err(|_| anyhow!("Invalid hour in '{s}'"))?;
        let minute: u8 = m.parse().map_err(|_| anyhow!("Invalid minute in '{s}'"))?;
        Self::new(hour, minute).ok_or_else(|| anyhow!("Time out of range: '{s}'"))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let t: ClockTime = "20:00".parse().unwrap();
        assert_eq!(t.to_string(), "20:00");

        let t: ClockTime = "8:05".parse().unwrap();
        assert_eq!(t.to_string(), "08:05");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("24:00".parse::<ClockTime>().is_err());
        assert!("12:60".parse::<ClockTime>().is_err());
        assert!("1200".parse::<ClockTime>().is_err());
        assert!("12:5".parse::<ClockTime>().is_err());
        assert!("night".parse::<ClockTime>().is_err());
    }

    #[test]
    fn test_from_naive_drops_seconds() {
        let naive = NaiveTime::from_hms_opt(16, 45, 59).unwrap();
        assert_eq!(ClockTime::from_naive(naive), ClockTime::new(16, 45).unwrap());
    }

    #[test]
    fn test_serde_as_string() {
        let t = ClockTime::new(7, 30).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"07:30\"");
        let back: ClockTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
