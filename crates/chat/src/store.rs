/// Storage abstraction for persisted chat messages.
use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::{
        FromRow, SqlitePool,
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    },
};

use crate::model::Message;

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: &Message) -> anyhow::Result<()>;

    /// One page of a room's history: page 1 holds the newest `limit`
    /// messages, returned oldest-first for display.
    async fn page(&self, room: &str, page: u32, limit: u32) -> anyhow::Result<Vec<Message>>;

    /// Full persisted count for a room, independent of paging.
    async fn count(&self, room: &str) -> anyhow::Result<u64>;

    /// Distinct author ids with at least one message in the room at or after
    /// `cutoff`.
    async fn distinct_authors_since(
        &self,
        room: &str,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Vec<String>>;

    /// Delete a message iff it exists and belongs to `author_id`. Returns
    /// whether a row was removed.
    async fn delete_owned(&self, id: &str, author_id: &str) -> anyhow::Result<bool>;

    async fn get(&self, id: &str) -> anyhow::Result<Option<Message>>;
}

// ── Sqlite implementation ────────────────────────────────────────────────────

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id            TEXT PRIMARY KEY,
    room          TEXT NOT NULL,
    author_id     TEXT NOT NULL,
    author_name   TEXT NOT NULL,
    text          TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_room_created
    ON messages (room, created_at_ms);
";

#[derive(Debug, FromRow)]
struct MessageRow {
    id: String,
    room: String,
    author_id: String,
    author_name: String,
    text: String,
    created_at_ms: i64,
}

impl MessageRow {
    fn into_message(self) -> anyhow::Result<Message> {
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_at_ms)
            .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {}", self.created_at_ms))?;
        Ok(Message {
            id: self.id,
            text: self.text,
            author_id: self.author_id,
            author_name: self.author_name,
            room: self.room,
            created_at,
        })
    }
}

pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    /// Open (creating if necessary) the store at the given sqlite path.
    pub async fn open(path: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// In-memory store for tests. A single pooled connection keeps every
    /// query on the same memory database.
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn insert(&self, message: &Message) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO messages (id, room, author_id, author_name, text, created_at_ms)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.room)
        .bind(&message.author_id)
        .bind(&message.author_name)
        .bind(&message.text)
        .bind(message.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn page(&self, room: &str, page: u32, limit: u32) -> anyhow::Result<Vec<Message>> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, room, author_id, author_name, text, created_at_ms
             FROM messages WHERE room = ?
             ORDER BY created_at_ms DESC, id DESC
             LIMIT ? OFFSET ?",
        )
        .bind(room)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        // Newest-first from the query; render oldest-first.
        let mut messages = rows
            .into_iter()
            .map(MessageRow::into_message)
            .collect::<anyhow::Result<Vec<_>>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn count(&self, room: &str) -> anyhow::Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE room = ?")
            .bind(room)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn distinct_authors_since(
        &self,
        room: &str,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT author_id FROM messages
             WHERE room = ? AND created_at_ms >= ?",
        )
        .bind(room)
        .bind(cutoff.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn delete_owned(&self, id: &str, author_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ? AND author_id = ?")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Message>> {
        let row: Option<MessageRow> = sqlx::query_as(
            "SELECT id, room, author_id, author_name, text, created_at_ms
             FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MessageRow::into_message).transpose()
    }
}
