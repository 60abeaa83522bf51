//! Per-user confirmation state machine
//!
//! Each owner has one session guarded by its own async mutex, so a user's
//! messages are resolved strictly one at a time while different users proceed
//! in parallel. Sessions only hold candidates; committed entries belong to the
//! store.

use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::prompt::{confirmation_prompt, medication_question, refresh_question};
use super::reply::ConfirmationReply;
use crate::core::ClockTime;
use crate::features::companion::voice;
use crate::features::extraction::{EntityExtractor, Extraction};
use crate::features::schedule::{
    turns_as_history, Candidate, ConversationLog, EntryPayload, NewEntry, ScheduleStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingConfirmation,
}

#[derive(Debug, Default)]
struct Session {
    pending: Vec<Candidate>,
}

impl Session {
    fn phase(&self) -> SessionPhase {
        if self.pending.is_empty() {
            SessionPhase::Idle
        } else {
            SessionPhase::AwaitingConfirmation
        }
    }
}

/// What a single inbound message did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing to schedule; the model's advisory text was returned
    Advised,
    ExtractionMalformed,
    ExtractionUnavailable,
    /// Candidates are now held awaiting a yes/no
    Proposed { pending: usize },
    Committed { entries: usize },
    /// An insert failed; earlier inserts stay committed, the rest stays pending
    CommitFailed {
        committed: usize,
        failed_item: String,
        failed_time: ClockTime,
    },
    Retimed { pending: usize },
    Discarded,
    Reprompted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineReply {
    pub message: String,
    pub outcome: TurnOutcome,
}

impl MachineReply {
    fn new(message: String, outcome: TurnOutcome) -> Self {
        Self { message, outcome }
    }
}

pub struct ConfirmationMachine {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    store: Arc<dyn ScheduleStore>,
    conversation_log: Arc<dyn ConversationLog>,
    extractor: EntityExtractor,
    history_turns: usize,
}

impl ConfirmationMachine {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        conversation_log: Arc<dyn ConversationLog>,
        extractor: EntityExtractor,
        history_turns: usize,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
            conversation_log,
            extractor,
            history_turns,
        }
    }

    fn session(&self, owner_id: &str) -> Arc<Mutex<Session>> {
        // Clone the Arc out so the map shard lock is released before awaiting
        self.sessions
            .entry(owner_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    pub async fn phase(&self, owner_id: &str) -> SessionPhase {
        let handle = self.sessions.get(owner_id).map(|s| s.value().clone());
        match handle {
            Some(session) => session.lock().await.phase(),
            None => SessionPhase::Idle,
        }
    }

    pub async fn pending(&self, owner_id: &str) -> Vec<Candidate> {
        let handle = self.sessions.get(owner_id).map(|s| s.value().clone());
        match handle {
            Some(session) => session.lock().await.pending.clone(),
            None => Vec::new(),
        }
    }

    /// Drop every pending candidate of the owner, returning how many there were
    pub async fn discard(&self, owner_id: &str) -> usize {
        let handle = self.sessions.get(owner_id).map(|s| s.value().clone());
        let Some(handle) = handle else {
            return 0;
        };
        let mut session = handle.lock().await;
        let dropped = session.pending.len();
        session.pending.clear();
        drop(session);
        drop(handle);
        self.evict_if_idle(owner_id);
        dropped
    }

    /// Forget an idle session that no other turn is holding or waiting on
    fn evict_if_idle(&self, owner_id: &str) {
        let evicted = self.sessions.remove_if(owner_id, |_, session| {
            Arc::strong_count(session) == 1
                && session
                    .try_lock()
                    .map(|s| s.pending.is_empty())
                    .unwrap_or(false)
        });
        if evicted.is_some() {
            debug!("Session {owner_id} is idle, released");
        }
    }

    /// Handle one inbound free-text message from `owner_id`
    pub async fn handle_text(&self, owner_id: &str, nickname: &str, text: &str) -> MachineReply {
        let handle = self.session(owner_id);
        let mut session = handle.lock().await;

        let reply = match session.phase() {
            SessionPhase::Idle => self.intake(owner_id, nickname, text, &mut session).await,
            SessionPhase::AwaitingConfirmation => {
                self.resolve(owner_id, nickname, text, &mut session).await
            }
        };
        debug!(
            "Session {owner_id}: {:?} -> {:?}",
            reply.outcome,
            session.phase()
        );

        if let Err(e) = self
            .conversation_log
            .append_turn(owner_id, text, &reply.message)
            .await
        {
            warn!("Failed to log conversation turn for {owner_id}: {e}");
        }
        drop(session);
        drop(handle);
        self.evict_if_idle(owner_id);
        reply
    }

    async fn intake(
        &self,
        owner_id: &str,
        nickname: &str,
        text: &str,
        session: &mut Session,
    ) -> MachineReply {
        let history = match self
            .conversation_log
            .recent_turns(owner_id, self.history_turns)
            .await
        {
            Ok(turns) => turns_as_history(&turns),
            Err(e) => {
                warn!("Could not load history for {owner_id}: {e}");
                Vec::new()
            }
        };

        match self.extractor.extract(text, &history, nickname).await {
            Extraction::Unavailable => MachineReply::new(
                voice::apology(nickname),
                TurnOutcome::ExtractionUnavailable,
            ),
            Extraction::Malformed => MachineReply::new(
                voice::confused(nickname),
                TurnOutcome::ExtractionMalformed,
            ),
            Extraction::Parsed(result) if result.candidate_count() == 0 => MachineReply::new(
                result
                    .response
                    .unwrap_or_else(|| voice::check_in(nickname)),
                TurnOutcome::Advised,
            ),
            Extraction::Parsed(result) => {
                session.pending = result
                    .medications
                    .into_iter()
                    .map(Candidate::Medication)
                    .chain(result.tasks.into_iter().map(Candidate::Task))
                    .collect();
                info!(
                    "Holding {} candidate(s) for {owner_id} awaiting confirmation",
                    session.pending.len()
                );
                MachineReply::new(
                    confirmation_prompt(&session.pending, nickname),
                    TurnOutcome::Proposed {
                        pending: session.pending.len(),
                    },
                )
            }
        }
    }

    async fn resolve(
        &self,
        owner_id: &str,
        nickname: &str,
        text: &str,
        session: &mut Session,
    ) -> MachineReply {
        match ConfirmationReply::parse(text) {
            ConfirmationReply::Affirm => self.commit(owner_id, nickname, session).await,
            ConfirmationReply::Decline { replacement } if replacement.is_empty() => {
                info!(
                    "Discarding {} pending candidate(s) for {owner_id}",
                    session.pending.len()
                );
                session.pending.clear();
                MachineReply::new(voice::discarded(nickname), TurnOutcome::Discarded)
            }
            ConfirmationReply::Decline { replacement } => {
                for candidate in session.pending.iter_mut() {
                    retime(candidate, &replacement);
                    refresh_question(candidate, nickname);
                }
                MachineReply::new(
                    confirmation_prompt(&session.pending, nickname),
                    TurnOutcome::Retimed {
                        pending: session.pending.len(),
                    },
                )
            }
            ConfirmationReply::Unrecognized => MachineReply::new(
                format!(
                    "{}\n\n{}",
                    voice::still_waiting(nickname),
                    confirmation_prompt(&session.pending, nickname)
                ),
                TurnOutcome::Reprompted,
            ),
        }
    }

    /// Insert one entry per (candidate, time). Stops at the first failure;
    /// whatever was inserted is removed from the pending list.
    async fn commit(&self, owner_id: &str, nickname: &str, session: &mut Session) -> MachineReply {
        let mut committed = 0;

        while let Some(first) = session.pending.first() {
            let (payload, times) = match first {
                Candidate::Medication(m) => {
                    (EntryPayload::Medication(m.medication.clone()), m.times.clone())
                }
                Candidate::Task(t) => (EntryPayload::Task(t.task.clone()), vec![t.time]),
            };

            for time in times {
                let entry = NewEntry {
                    owner_id: owner_id.to_string(),
                    payload: payload.clone(),
                    time,
                };
                match self.store.insert_entry(&entry).await {
                    Ok(entry_ref) => {
                        info!("Committed {entry_ref} at {time} for {owner_id}");
                        committed += 1;
                        if let Some(Candidate::Medication(m)) = session.pending.first_mut() {
                            m.times.retain(|t| *t != time);
                            m.question = medication_question(&m.medication, &m.times, nickname);
                        }
                    }
                    Err(e) => {
                        error!(
                            "Failed to commit '{}' at {time} for {owner_id} after {committed} insert(s): {e}",
                            payload.label()
                        );
                        return MachineReply::new(
                            voice::save_failed(nickname, payload.label(), &time.to_string(), committed),
                            TurnOutcome::CommitFailed {
                                committed,
                                failed_item: payload.label().to_string(),
                                failed_time: time,
                            },
                        );
                    }
                }
            }
            session.pending.remove(0);
        }

        MachineReply::new(
            voice::all_set(nickname, committed),
            TurnOutcome::Committed { entries: committed },
        )
    }
}

/// Overwrite a candidate's time with the replacement. Medications take the
/// whole list; a task keeps a single time so it takes the first.
fn retime(candidate: &mut Candidate, replacement: &[ClockTime]) {
    match candidate {
        Candidate::Medication(m) => m.times = replacement.to_vec(),
        Candidate::Task(t) => {
            if let Some(&time) = replacement.first() {
                t.time = time;
            }
        }
    }
}
