//! Per-minute dispatch of due reminders
//!
//! Every tick loads unsent entries, keeps the ones whose time equals the
//! current `HH:MM` exactly, and delivers each in its own task. `sent` flips
//! only after a successful delivery. A missed minute is not caught up later.

use chrono::{Local, NaiveTime, Timelike};
use dashmap::DashSet;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use super::composer::ReminderComposer;
use super::notifier::{deliver_with_retry, DeliveryOutcome, Notifier};
use crate::core::{ClockTime, Config};
use crate::features::companion::Voice;
use crate::features::schedule::{CommittedEntry, EntryRef, ScheduleStore};

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub tick: Duration,
    pub item_timeout: Duration,
    pub delivery_max_attempts: u32,
    pub delivery_retry_delay: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick: config.dispatch_tick,
            item_timeout: config.dispatch_item_timeout,
            delivery_max_attempts: config.delivery_max_attempts,
            delivery_retry_delay: config.delivery_retry_delay,
        }
    }

    /// Time reminder generation may take inside one item
    ///
    /// Retry delays come off the item timeout first; generation gets half of
    /// what is left and the sends keep the other half.
    pub fn generation_budget(&self) -> Duration {
        let retry_pauses = self
            .delivery_retry_delay
            .saturating_mul(self.delivery_max_attempts.saturating_sub(1));
        self.item_timeout.saturating_sub(retry_pauses) / 2
    }
}

/// Result of dispatching one due entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered(EntryRef),
    /// Not attempted this tick; stays unsent
    Skipped { entry: EntryRef, reason: String },
    /// Every delivery attempt failed; stays unsent
    Failed(EntryRef),
    TimedOut(EntryRef),
    /// Delivered, but the sent flag could not be written yet
    MarkPending(EntryRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub now: ClockTime,
    pub due: usize,
    pub outcomes: Vec<DispatchOutcome>,
    /// Sent flags written on behalf of earlier ticks
    pub marks_recovered: usize,
}

impl TickReport {
    fn empty(now: ClockTime) -> Self {
        Self {
            now,
            due: 0,
            outcomes: Vec::new(),
            marks_recovered: 0,
        }
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DispatchOutcome::Delivered(_)))
            .count()
    }
}

/// How long to wait so ticks land on multiples of `tick` past the minute
pub fn delay_until_boundary(now: NaiveTime, tick: Duration) -> Duration {
    let tick_ms = tick.as_millis().max(1) as u64;
    let into_minute_ms =
        now.second() as u64 * 1000 + (now.nanosecond() / 1_000_000).min(999) as u64;
    Duration::from_millis(tick_ms - into_minute_ms % tick_ms)
}

#[derive(Clone)]
pub struct ReminderScheduler {
    store: Arc<dyn ScheduleStore>,
    notifier: Arc<dyn Notifier>,
    composer: Arc<ReminderComposer>,
    voice: Voice,
    settings: DispatchSettings,
    in_flight: Arc<DashSet<EntryRef>>,
    pending_marks: Arc<DashSet<EntryRef>>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        notifier: Arc<dyn Notifier>,
        composer: Arc<ReminderComposer>,
        voice: Voice,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            composer,
            voice,
            settings,
            in_flight: Arc::new(DashSet::new()),
            pending_marks: Arc::new(DashSet::new()),
        }
    }

    /// Tick until `shutdown` flips to true or its sender goes away
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let delay = delay_until_boundary(Local::now().time(), self.settings.tick);
        let mut interval = interval_at(Instant::now() + delay, self.settings.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "⏰ Reminder scheduler started: every {:?}, first tick in {:?}",
            self.settings.tick, delay
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = ClockTime::now_local();
                    let scheduler = self.clone();
                    // Ticks run detached so a slow one never delays the next
                    tokio::spawn(async move {
                        let report = scheduler.tick(now).await;
                        if report.due > 0 || report.marks_recovered > 0 {
                            info!(
                                "Tick {}: {} due, {} delivered, {} flag(s) recovered",
                                report.now, report.due, report.delivered(), report.marks_recovered
                            );
                        }
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("🛑 Reminder scheduler stopping");
                        break;
                    }
                }
            }
        }
    }

    async fn recover_pending_marks(&self) -> usize {
        let refs: Vec<EntryRef> = self.pending_marks.iter().map(|r| *r).collect();
        let mut recovered = 0;
        for entry_ref in refs {
            match self.store.mark_sent(entry_ref).await {
                Ok(_) => {
                    self.pending_marks.remove(&entry_ref);
                    info!("Recovered sent flag for {entry_ref}");
                    recovered += 1;
                }
                Err(e) => warn!("Sent flag for {entry_ref} still failing: {e}"),
            }
        }
        recovered
    }

    /// Scan once for entries due at `now`
    pub async fn tick(&self, now: ClockTime) -> TickReport {
        let mut report = TickReport::empty(now);
        report.marks_recovered = self.recover_pending_marks().await;

        let entries = match self.store.unsent_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to load unsent entries at {now}: {e}");
                return report;
            }
        };
        debug!("Tick {now}: {} unsent entries", entries.len());

        let due: Vec<CommittedEntry> = entries
            .into_iter()
            .filter(|entry| entry.time == now)
            .filter(|entry| !self.pending_marks.contains(&entry.entry_ref()))
            .filter(|entry| self.in_flight.insert(entry.entry_ref()))
            .collect();
        report.due = due.len();

        let mut tasks = JoinSet::new();
        for entry in due {
            let scheduler = self.clone();
            tasks.spawn(async move {
                let entry_ref = entry.entry_ref();
                let outcome = scheduler.dispatch(entry).await;
                scheduler.in_flight.remove(&entry_ref);
                outcome
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => error!("Dispatch task failed: {e}"),
            }
        }
        report
    }

    async fn dispatch(&self, entry: CommittedEntry) -> DispatchOutcome {
        let entry_ref = entry.entry_ref();

        let user = match self.store.get_user(&entry.owner_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!("Skipping {entry_ref}: owner {} not found", entry.owner_id);
                return DispatchOutcome::Skipped {
                    entry: entry_ref,
                    reason: "owner not found".to_string(),
                };
            }
            Err(e) => {
                error!("Skipping {entry_ref}: user lookup failed: {e}");
                return DispatchOutcome::Skipped {
                    entry: entry_ref,
                    reason: "user lookup failed".to_string(),
                };
            }
        };
        let Some(address) = user.channel_address.clone() else {
            warn!("Skipping {entry_ref}: {} has no delivery address", user.owner_id);
            return DispatchOutcome::Skipped {
                entry: entry_ref,
                reason: "no delivery address".to_string(),
            };
        };

        let nickname = self.voice.pick();
        let delivery = timeout(self.settings.item_timeout, async {
            let text = self
                .composer
                .compose(&user, &nickname, &entry, self.settings.generation_budget())
                .await;
            deliver_with_retry(
                self.notifier.as_ref(),
                &address,
                &text,
                self.settings.delivery_max_attempts,
                self.settings.delivery_retry_delay,
            )
            .await
        })
        .await;

        match delivery {
            Err(_) => {
                error!(
                    "Dispatch of {entry_ref} timed out after {:?}",
                    self.settings.item_timeout
                );
                DispatchOutcome::TimedOut(entry_ref)
            }
            Ok(DeliveryOutcome::Failed { attempts }) => {
                error!("Reminder {entry_ref} not delivered after {attempts} attempts");
                DispatchOutcome::Failed(entry_ref)
            }
            Ok(DeliveryOutcome::Delivered { .. }) => match self.store.mark_sent(entry_ref).await {
                Ok(true) => {
                    info!("✅ Delivered '{}' to {}", entry.payload.label(), user.owner_id);
                    DispatchOutcome::Delivered(entry_ref)
                }
                Ok(false) => {
                    warn!("{entry_ref} was already marked sent");
                    DispatchOutcome::Delivered(entry_ref)
                }
                Err(e) => {
                    error!("Delivered {entry_ref} but could not mark it sent: {e}");
                    self.pending_marks.insert(entry_ref);
                    DispatchOutcome::MarkPending(entry_ref)
                }
            },
        }
    }
}
