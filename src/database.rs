//! # SQLite Persistence
//!
//! Users, committed medication/task entries and the conversation log.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use sqlite::{Connection, State, Statement};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::ClockTime;
use crate::features::schedule::{
    CommittedEntry, ConversationLog, ConversationTurn, EntryKind, EntryPayload, EntryRef,
    Frequency, MealRelation, Medication, NewEntry, ScheduleStore, User,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        owner_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        channel_address TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS medications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        name TEXT NOT NULL,
        quantity INTEGER NOT NULL,
        meal_timing TEXT NOT NULL,
        frequency TEXT NOT NULL,
        time TEXT NOT NULL,
        sent INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_medications_unsent
        ON medications (owner_id, name, quantity, meal_timing, frequency, time)
        WHERE sent = 0;

    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        task TEXT NOT NULL,
        time TEXT NOT NULL,
        sent INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_unsent
        ON tasks (owner_id, task, time)
        WHERE sent = 0;

    CREATE TABLE IF NOT EXISTS conversation_turns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        user_text TEXT NOT NULL,
        bot_text TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_turns_owner ON conversation_turns (owner_id, id);
";

const MEDICATION_COLUMNS: &str = "id, owner_id, name, quantity, meal_timing, frequency, time, sent";
const TASK_COLUMNS: &str = "id, owner_id, task, time, sent";

/// Shared handle to the SQLite file; cheap to clone
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path`; `:memory:` is accepted
    pub async fn new(path: &str) -> Result<Self> {
        let connection = sqlite::open(path)?;
        connection.execute(SCHEMA)?;
        info!("Database ready at {path}");
        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    fn read_time(statement: &Statement, column: &str) -> Result<ClockTime> {
        statement.read::<String, _>(column)?.parse()
    }

    fn read_medication(statement: &Statement) -> Result<CommittedEntry> {
        let quantity = statement.read::<i64, _>("quantity")?.max(1) as u32;
        Ok(CommittedEntry {
            id: statement.read::<i64, _>("id")?,
            owner_id: statement.read::<String, _>("owner_id")?,
            payload: EntryPayload::Medication(Medication {
                name: statement.read::<String, _>("name")?,
                quantity,
                meal: MealRelation::parse_lenient(&statement.read::<String, _>("meal_timing")?),
                frequency: Frequency::parse_lenient(&statement.read::<String, _>("frequency")?),
            }),
            time: Self::read_time(statement, "time")?,
            sent: statement.read::<i64, _>("sent")? != 0,
        })
    }

    fn read_task(statement: &Statement) -> Result<CommittedEntry> {
        Ok(CommittedEntry {
            id: statement.read::<i64, _>("id")?,
            owner_id: statement.read::<String, _>("owner_id")?,
            payload: EntryPayload::Task(statement.read::<String, _>("task")?),
            time: Self::read_time(statement, "time")?,
            sent: statement.read::<i64, _>("sent")? != 0,
        })
    }

    /// Collect every row of a prepared statement, skipping rows that fail to decode
    fn collect_rows<F>(statement: &mut Statement, decode: F) -> Result<Vec<CommittedEntry>>
    where
        F: Fn(&Statement) -> Result<CommittedEntry>,
    {
        let mut rows = Vec::new();
        while let State::Row = statement.next()? {
            match decode(&*statement) {
                Ok(entry) => rows.push(entry),
                Err(e) => warn!("Skipping undecodable schedule row: {e}"),
            }
        }
        Ok(rows)
    }

    fn insert_medication(
        connection: &Connection,
        owner_id: &str,
        medication: &Medication,
        time: &str,
    ) -> Result<i64> {
        let mut statement = connection.prepare(
            "INSERT OR IGNORE INTO medications
                (owner_id, name, quantity, meal_timing, frequency, time, sent, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )?;
        statement.bind((1, owner_id))?;
        statement.bind((2, medication.name.as_str()))?;
        statement.bind((3, medication.quantity as i64))?;
        statement.bind((4, medication.meal.as_str()))?;
        statement.bind((5, medication.frequency.as_str()))?;
        statement.bind((6, time))?;
        statement.bind((7, Self::now().as_str()))?;
        statement.next()?;

        let mut lookup = connection.prepare(
            "SELECT id FROM medications
             WHERE owner_id = ? AND name = ? AND quantity = ? AND meal_timing = ?
               AND frequency = ? AND time = ? AND sent = 0",
        )?;
        lookup.bind((1, owner_id))?;
        lookup.bind((2, medication.name.as_str()))?;
        lookup.bind((3, medication.quantity as i64))?;
        lookup.bind((4, medication.meal.as_str()))?;
        lookup.bind((5, medication.frequency.as_str()))?;
        lookup.bind((6, time))?;
        match lookup.next()? {
            State::Row => Ok(lookup.read::<i64, _>("id")?),
            State::Done => Err(anyhow!("Medication row missing after insert")),
        }
    }

    fn insert_task(connection: &Connection, owner_id: &str, task: &str, time: &str) -> Result<i64> {
        let mut statement = connection.prepare(
            "INSERT OR IGNORE INTO tasks (owner_id, task, time, sent, created_at)
             VALUES (?, ?, ?, 0, ?)",
        )?;
        statement.bind((1, owner_id))?;
        statement.bind((2, task))?;
        statement.bind((3, time))?;
        statement.bind((4, Self::now().as_str()))?;
        statement.next()?;

        let mut lookup = connection
            .prepare("SELECT id FROM tasks WHERE owner_id = ? AND task = ? AND time = ? AND sent = 0")?;
        lookup.bind((1, owner_id))?;
        lookup.bind((2, task))?;
        lookup.bind((3, time))?;
        match lookup.next()? {
            State::Row => Ok(lookup.read::<i64, _>("id")?),
            State::Done => Err(anyhow!("Task row missing after insert")),
        }
    }
}

#[async_trait]
impl ScheduleStore for Database {
    async fn upsert_user(&self, user: &User) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO users (owner_id, name, channel_address, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(owner_id) DO UPDATE SET
                name = excluded.name,
                channel_address = COALESCE(excluded.channel_address, users.channel_address)",
        )?;
        statement.bind((1, user.owner_id.as_str()))?;
        statement.bind((2, user.name.as_str()))?;
        statement.bind((3, user.channel_address.as_deref()))?;
        statement.bind((4, Self::now().as_str()))?;
        statement.next()?;
        debug!("Upserted user {}", user.owner_id);
        Ok(())
    }

    async fn get_user(&self, owner_id: &str) -> Result<Option<User>> {
        let connection = self.connection.lock().await;
        let mut statement = connection
            .prepare("SELECT owner_id, name, channel_address FROM users WHERE owner_id = ?")?;
        statement.bind((1, owner_id))?;
        match statement.next()? {
            State::Row => Ok(Some(User {
                owner_id: statement.read::<String, _>("owner_id")?,
                name: statement.read::<String, _>("name")?,
                channel_address: statement.read::<Option<String>, _>("channel_address")?,
            })),
            State::Done => Ok(None),
        }
    }

    async fn insert_entry(&self, entry: &NewEntry) -> Result<EntryRef> {
        let connection = self.connection.lock().await;
        let time = entry.time.to_string();
        let id = match &entry.payload {
            EntryPayload::Medication(medication) => {
                Self::insert_medication(&connection, &entry.owner_id, medication, &time)?
            }
            EntryPayload::Task(task) => Self::insert_task(&connection, &entry.owner_id, task, &time)?,
        };
        debug!(
            "Committed {} '{}' at {} for {} (id {})",
            entry.payload.kind().as_str(),
            entry.payload.label(),
            time,
            entry.owner_id,
            id
        );
        Ok(EntryRef {
            kind: entry.payload.kind(),
            id,
        })
    }

    async fn unsent_entries(&self) -> Result<Vec<CommittedEntry>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications WHERE sent = 0 ORDER BY id"
        ))?;
        let mut entries = Self::collect_rows(&mut statement, Self::read_medication)?;

        let mut statement = connection.prepare(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE sent = 0 ORDER BY id"
        ))?;
        entries.extend(Self::collect_rows(&mut statement, Self::read_task)?);
        Ok(entries)
    }

    async fn entries_for_owner(&self, owner_id: &str) -> Result<Vec<CommittedEntry>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications WHERE owner_id = ? ORDER BY time, id"
        ))?;
        statement.bind((1, owner_id))?;
        let mut entries = Self::collect_rows(&mut statement, Self::read_medication)?;

        let mut statement = connection.prepare(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ? ORDER BY time, id"
        ))?;
        statement.bind((1, owner_id))?;
        entries.extend(Self::collect_rows(&mut statement, Self::read_task)?);
        Ok(entries)
    }

    async fn mark_sent(&self, entry: EntryRef) -> Result<bool> {
        let table = match entry.kind {
            EntryKind::Medication => "medications",
            EntryKind::Task => "tasks",
        };
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare(format!("UPDATE {table} SET sent = 1 WHERE id = ? AND sent = 0"))?;
        statement.bind((1, entry.id))?;
        statement.next()?;
        drop(statement);
        Ok(connection.change_count() > 0)
    }

    async fn clear_owner(&self, owner_id: &str) -> Result<usize> {
        let connection = self.connection.lock().await;
        let mut removed = 0;
        for table in ["medications", "tasks"] {
            let mut statement =
                connection.prepare(format!("DELETE FROM {table} WHERE owner_id = ?"))?;
            statement.bind((1, owner_id))?;
            statement.next()?;
            drop(statement);
            removed += connection.change_count();
        }
        info!("Cleared {removed} schedule entries for {owner_id}");
        Ok(removed)
    }
}

#[async_trait]
impl ConversationLog for Database {
    async fn append_turn(&self, owner_id: &str, user_text: &str, bot_text: &str) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO conversation_turns (owner_id, user_text, bot_text, created_at)
             VALUES (?, ?, ?, ?)",
        )?;
        statement.bind((1, owner_id))?;
        statement.bind((2, user_text))?;
        statement.bind((3, bot_text))?;
        statement.bind((4, Self::now().as_str()))?;
        statement.next()?;
        Ok(())
    }

    async fn recent_turns(&self, owner_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT owner_id, user_text, bot_text, created_at FROM conversation_turns
             WHERE owner_id = ? ORDER BY id DESC LIMIT ?",
        )?;
        statement.bind((1, owner_id))?;
        statement.bind((2, limit as i64))?;

        let mut turns = Vec::new();
        while let State::Row = statement.next()? {
            turns.push(ConversationTurn {
                owner_id: statement.read::<String, _>("owner_id")?,
                user_text: statement.read::<String, _>("user_text")?,
                bot_text: statement.read::<String, _>("bot_text")?,
                created_at: statement.read::<String, _>("created_at")?,
            });
        }
        turns.reverse();
        Ok(turns)
    }
}
