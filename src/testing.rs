//! Test doubles shared by the unit tests

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::database::Database;
use crate::features::ai::LanguageModel;
use crate::features::reminders::Notifier;
use crate::features::schedule::{CommittedEntry, EntryRef, NewEntry, ScheduleStore, User};

/// Language model answering from a queue; errors once the queue runs dry
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    repeat: Option<String>,
    delay: Duration,
    stall_on: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            delay: Duration::ZERO,
            stall_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with `text`
    pub fn repeating(text: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            repeat: Some(text.to_string()),
            delay: Duration::ZERO,
            stall_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep `delay` before every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Never answer a user message containing `marker`
    pub fn stalling_on(mut self, marker: &str) -> Self {
        self.stall_on = Some(marker.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_message: &str,
        _history: &[(String, String)],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.stall_on {
            if user_message.contains(marker.as_str()) {
                std::future::pending::<()>().await;
            }
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(text) = &self.repeat {
            return Ok(text.clone());
        }
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Err(anyhow!("no scripted response left")),
        }
    }
}

/// Notifier that records successful sends and can be told to fail
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    fail_first: usize,
    rejected_address: Option<String>,
    hang: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail_first: 0,
            rejected_address: None,
            hang: false,
        }
    }

    /// Fails the first `n` attempts, then succeeds
    pub fn failing_first(n: usize) -> Self {
        Self {
            fail_first: n,
            ..Self::new()
        }
    }

    /// Always fails for `address`
    pub fn rejecting(address: &str) -> Self {
        Self {
            rejected_address: Some(address.to_string()),
            ..Self::new()
        }
    }

    /// Never returns
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, address: &str, text: &str) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if attempt <= self.fail_first {
            return Err(anyhow!("simulated outage (attempt {attempt})"));
        }
        if self.rejected_address.as_deref() == Some(address) {
            return Err(anyhow!("unknown channel {address}"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((address.to_string(), text.to_string()));
        Ok(())
    }
}

/// Database wrapper that fails the Nth insert (1-based, 0 = never) and,
/// when switched on, every `mark_sent`
pub struct FailingStore {
    inner: Database,
    fail_insert_at: usize,
    inserts: AtomicUsize,
    fail_marks: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Database, fail_insert_at: usize) -> Self {
        Self {
            inner,
            fail_insert_at,
            inserts: AtomicUsize::new(0),
            fail_marks: AtomicBool::new(false),
        }
    }

    pub fn fail_mark_sent(&self, fail: bool) {
        self.fail_marks.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScheduleStore for FailingStore {
    async fn upsert_user(&self, user: &User) -> Result<()> {
        self.inner.upsert_user(user).await
    }

    async fn get_user(&self, owner_id: &str) -> Result<Option<User>> {
        self.inner.get_user(owner_id).await
    }

    async fn insert_entry(&self, entry: &NewEntry) -> Result<EntryRef> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_insert_at {
            return Err(anyhow!("simulated insert failure #{n}"));
        }
        self.inner.insert_entry(entry).await
    }

    async fn unsent_entries(&self) -> Result<Vec<CommittedEntry>> {
        self.inner.unsent_entries().await
    }

    async fn entries_for_owner(&self, owner_id: &str) -> Result<Vec<CommittedEntry>> {
        self.inner.entries_for_owner(owner_id).await
    }

    async fn mark_sent(&self, entry: EntryRef) -> Result<bool> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated mark failure"));
        }
        self.inner.mark_sent(entry).await
    }

    async fn clear_owner(&self, owner_id: &str) -> Result<usize> {
        self.inner.clear_owner(owner_id).await
    }
}
