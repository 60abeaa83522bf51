//! Persistence contracts used by the confirmation flow and the dispatch engine

use anyhow::Result;
use async_trait::async_trait;

use super::model::{CommittedEntry, ConversationTurn, EntryRef, NewEntry, User};

/// Durable table of users and committed schedule entries
///
/// The confirmation flow only inserts; the dispatch engine only reads unsent
/// rows and flips `sent`. Row-level atomicity of `mark_sent` is the only
/// synchronisation the two need.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Create the user or refresh its name and delivery address
    async fn upsert_user(&self, user: &User) -> Result<()>;

    async fn get_user(&self, owner_id: &str) -> Result<Option<User>>;

    /// Insert an unsent entry, returning its id
    ///
    /// An identical unsent entry for the same owner is reused rather than
    /// duplicated.
    async fn insert_entry(&self, entry: &NewEntry) -> Result<EntryRef>;

    async fn unsent_entries(&self) -> Result<Vec<CommittedEntry>>;

    async fn entries_for_owner(&self, owner_id: &str) -> Result<Vec<CommittedEntry>>;

    /// Flip `sent` false -> true. Returns false if the row was already sent
    /// or no longer exists.
    async fn mark_sent(&self, entry: EntryRef) -> Result<bool>;

    /// Delete every committed entry of the owner, returning how many went
    async fn clear_owner(&self, owner_id: &str) -> Result<usize>;
}

/// Append-only log of conversation turns
#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn append_turn(&self, owner_id: &str, user_text: &str, bot_text: &str) -> Result<()>;

    /// Most recent `limit` turns, oldest first
    async fn recent_turns(&self, owner_id: &str, limit: usize) -> Result<Vec<ConversationTurn>>;
}
