//! Delivery of rendered reminders with bounded retry

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, error, warn};
use serenity::http::Http;
use serenity::model::id::ChannelId;
use std::sync::Arc;
use std::time::Duration;

use crate::core::split_message;

/// Sends text to a channel address
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, address: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Failed { attempts: u32 },
}

/// Up to `max_attempts` sends with a fixed delay between them
pub async fn deliver_with_retry(
    notifier: &dyn Notifier,
    address: &str,
    text: &str,
    max_attempts: u32,
    retry_delay: Duration,
) -> DeliveryOutcome {
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match notifier.send(address, text).await {
            Ok(()) => {
                debug!("Delivered to {address} on attempt {attempt}");
                return DeliveryOutcome::Delivered { attempts: attempt };
            }
            Err(e) => {
                warn!("Delivery attempt {attempt}/{max_attempts} to {address} failed: {e}");
                if attempt < max_attempts {
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    error!("Giving up on delivery to {address} after {max_attempts} attempts");
    DeliveryOutcome::Failed {
        attempts: max_attempts,
    }
}

/// Discord DM delivery; the address is a DM channel id
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, address: &str, text: &str) -> Result<()> {
        let channel_id: u64 = address
            .parse()
            .map_err(|_| anyhow!("Invalid channel address '{address}'"))?;
        let channel = ChannelId(channel_id);
        for chunk in split_message(text) {
            channel.say(&self.http, chunk).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNotifier;

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let notifier = RecordingNotifier::new();
        let outcome = deliver_with_retry(&notifier, "42", "hi", 3, Duration::ZERO).await;
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 1 });
        assert_eq!(notifier.sent(), vec![("42".to_string(), "hi".to_string())]);
    }

    #[tokio::test]
    async fn test_recovers_on_third_attempt() {
        let notifier = RecordingNotifier::failing_first(2);
        let outcome = deliver_with_retry(&notifier, "42", "hi", 3, Duration::ZERO).await;
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 3 });
        assert_eq!(notifier.attempts(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let notifier = RecordingNotifier::failing_first(5);
        let outcome = deliver_with_retry(&notifier, "42", "hi", 3, Duration::ZERO).await;
        assert_eq!(outcome, DeliveryOutcome::Failed { attempts: 3 });
        assert_eq!(notifier.attempts(), 3);
        assert!(notifier.sent().is_empty());
    }
}
