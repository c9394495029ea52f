//! SQLite-backed store via libsql. Implements StorePort for all four record kinds.
//!
//! One database file (relay.db) in the given base directory. Schema is created
//! at connect time. The user upsert is a single INSERT .. ON CONFLICT .. RETURNING
//! statement, so concurrent ingestion events for the same sender can never produce
//! a duplicate row or a lost update.

use crate::domain::{
    CommandRecord, DomainError, MessageRecord, NewMessage, SenderIdentity, UserRecord,
};
use crate::ports::StorePort;
use chrono::Utc;
use libsql::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::info;

const MESSAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tg_id TEXT NOT NULL DEFAULT '',
    from_user TEXT NOT NULL,
    chat_id TEXT NOT NULL,
    text TEXT NOT NULL,
    raw_json TEXT NOT NULL,
    received_at TEXT NOT NULL
)"#;
const MESSAGES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_messages_received ON messages (received_at DESC)";

const USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tg_id TEXT NOT NULL UNIQUE,
    username TEXT,
    first_name TEXT,
    last_name TEXT,
    last_seen TEXT NOT NULL
)"#;

const COMMANDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS commands (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    response TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#;

/// Metric/value ledger. Extension point; not populated by the core pipeline.
const ANALYTICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS analytics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    metric TEXT NOT NULL,
    value REAL NOT NULL,
    timestamp TEXT NOT NULL
)"#;

/// SQLite store. One database file (relay.db) in the given base directory.
pub struct SqliteStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Connect to (or create) the SQLite database and ensure the schema exists.
    /// Call this once at startup; the returned store is safe to share via Arc.
    ///
    /// Sets WAL mode and synchronous=NORMAL for concurrent read/write without
    /// sacrificing durability.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Storage(e.to_string()))?;
        let db_path = base.join("relay.db");
        let path_str = db_path.to_string_lossy();
        let store = Self::open(path_str.as_ref(), db_path.clone()).await?;

        info!(path = %store.db_path.display(), "SQLite connected with WAL mode");
        Ok(store)
    }

    /// In-memory database. Used by tests; no file is created.
    pub async fn in_memory() -> Result<Self, DomainError> {
        Self::open(":memory:", PathBuf::from(":memory:")).await
    }

    async fn open(path: &str, db_path: PathBuf) -> Result<Self, DomainError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let conn = db
            .connect()
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        // WAL enables concurrent readers + one writer. PRAGMA returns a row
        // (the new value); use query and consume rows (execute fails when
        // rows are returned).
        let mut wal_rows = conn
            .query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| DomainError::Storage(format!("WAL pragma failed: {}", e)))?;
        while wal_rows
            .next()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?
            .is_some()
        {}
        let mut sync_rows = conn
            .query("PRAGMA synchronous=NORMAL", ())
            .await
            .map_err(|e| DomainError::Storage(format!("synchronous pragma failed: {}", e)))?;
        while sync_rows
            .next()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?
            .is_some()
        {}

        for ddl in [
            MESSAGES_TABLE,
            MESSAGES_INDEX,
            USERS_TABLE,
            COMMANDS_TABLE,
            ANALYTICS_TABLE,
        ] {
            conn.execute(ddl, ())
                .await
                .map_err(|e| DomainError::Storage(e.to_string()))?;
        }

        Ok(Self { conn, db_path })
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    /// Read a single i64 from a RETURNING/COUNT query.
    async fn query_scalar(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<i64, DomainError> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let row = rows
            .next()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?
            .ok_or_else(|| DomainError::Storage("query returned no row".into()))?;
        row.get(0).map_err(|e| DomainError::Storage(e.to_string()))
    }

    fn row_to_message(row: &libsql::Row) -> Result<MessageRecord, DomainError> {
        Ok(MessageRecord {
            id: row.get(0).map_err(|e| DomainError::Storage(e.to_string()))?,
            tg_id: row.get::<String>(1).unwrap_or_default(),
            from_user: row.get::<String>(2).unwrap_or_default(),
            chat_id: row.get::<String>(3).unwrap_or_default(),
            text: row.get::<String>(4).unwrap_or_default(),
            raw_json: row.get::<String>(5).unwrap_or_default(),
            received_at: row.get::<String>(6).unwrap_or_default(),
        })
    }

    fn row_to_user(row: &libsql::Row) -> Result<UserRecord, DomainError> {
        Ok(UserRecord {
            id: row.get(0).map_err(|e| DomainError::Storage(e.to_string()))?,
            tg_id: row.get::<String>(1).unwrap_or_default(),
            username: row.get::<String>(2).ok(),
            first_name: row.get::<String>(3).ok(),
            last_name: row.get::<String>(4).ok(),
            last_seen: row.get::<String>(5).unwrap_or_default(),
        })
    }

    fn row_to_command(row: &libsql::Row) -> Result<CommandRecord, DomainError> {
        Ok(CommandRecord {
            id: row.get(0).map_err(|e| DomainError::Storage(e.to_string()))?,
            name: row.get::<String>(1).unwrap_or_default(),
            description: row.get::<String>(2).ok(),
            response: row.get::<String>(3).ok(),
            created_at: row.get::<String>(4).unwrap_or_default(),
            updated_at: row.get::<String>(5).unwrap_or_default(),
        })
    }
}

#[async_trait::async_trait]
impl StorePort for SqliteStore {
    async fn append_message(&self, msg: NewMessage) -> Result<i64, DomainError> {
        self.query_scalar(
            r#"
            INSERT INTO messages (tg_id, from_user, chat_id, text, raw_json, received_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id
            "#,
            params![
                msg.tg_id.as_str(),
                msg.from_user.as_str(),
                msg.chat_id.as_str(),
                msg.text.as_str(),
                msg.raw_json.as_str(),
                Self::now(),
            ],
        )
        .await
    }

    async fn upsert_user(
        &self,
        identity: &SenderIdentity,
        seen_at: &str,
    ) -> Result<i64, DomainError> {
        // Single statement: SQLite resolves the conflict atomically, so two
        // concurrent events for the same sender cannot interleave into a
        // duplicate row or a lost update.
        self.query_scalar(
            r#"
            INSERT INTO users (tg_id, username, first_name, last_name, last_seen)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (tg_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                last_seen = excluded.last_seen
            RETURNING id
            "#,
            params![
                identity.external_id.as_str(),
                identity.username.as_deref(),
                identity.first_name.as_deref(),
                identity.last_name.as_deref(),
                seen_at,
            ],
        )
        .await
    }

    async fn list_messages(&self, limit: u32) -> Result<Vec<MessageRecord>, DomainError> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT id, tg_id, from_user, chat_id, text, raw_json, received_at
                FROM messages
                ORDER BY received_at DESC, id DESC
                LIMIT ?1
                "#,
                params![limit as i64],
            )
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut messages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?
        {
            messages.push(Self::row_to_message(&row)?);
        }
        Ok(messages)
    }

    async fn get_message(&self, id: i64) -> Result<Option<MessageRecord>, DomainError> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT id, tg_id, from_user, chat_id, text, raw_json, received_at
                FROM messages
                WHERE id = ?1
                "#,
                params![id],
            )
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        match rows
            .next()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_message(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, DomainError> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT id, tg_id, username, first_name, last_name, last_seen
                FROM users
                ORDER BY last_seen DESC, id DESC
                "#,
                (),
            )
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut users = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?
        {
            users.push(Self::row_to_user(&row)?);
        }
        Ok(users)
    }

    async fn list_commands(&self) -> Result<Vec<CommandRecord>, DomainError> {
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT id, name, description, response, created_at, updated_at
                FROM commands
                ORDER BY name ASC, id ASC
                "#,
                (),
            )
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let mut commands = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?
        {
            commands.push(Self::row_to_command(&row)?);
        }
        Ok(commands)
    }

    async fn find_command_by_name(
        &self,
        name: &str,
    ) -> Result<Option<CommandRecord>, DomainError> {
        // Trigger names are not unique; lowest id wins as the tie-break.
        let mut rows = self
            .conn
            .query(
                r#"
                SELECT id, name, description, response, created_at, updated_at
                FROM commands
                WHERE name = ?1
                ORDER BY id ASC
                LIMIT 1
                "#,
                params![name],
            )
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        match rows
            .next()
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_command(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_command(
        &self,
        name: &str,
        description: Option<&str>,
        response: Option<&str>,
    ) -> Result<i64, DomainError> {
        if name.is_empty() {
            return Err(DomainError::Validation("name required".into()));
        }
        let now = Self::now();
        self.query_scalar(
            r#"
            INSERT INTO commands (name, description, response, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
            params![name, description, response, now.as_str(), now.as_str()],
        )
        .await
    }

    async fn update_command(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        response: Option<&str>,
    ) -> Result<u64, DomainError> {
        self.conn
            .execute(
                r#"
                UPDATE commands
                SET name = ?1, description = ?2, response = ?3, updated_at = ?4
                WHERE id = ?5
                "#,
                params![name, description, response, Self::now(), id],
            )
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))
    }

    async fn delete_command(&self, id: i64) -> Result<u64, DomainError> {
        self.conn
            .execute("DELETE FROM commands WHERE id = ?1", params![id])
            .await
            .map_err(|e| DomainError::Storage(e.to_string()))
    }

    async fn count_messages(&self) -> Result<i64, DomainError> {
        self.query_scalar("SELECT COUNT(*) FROM messages", ()).await
    }

    async fn count_users(&self) -> Result<i64, DomainError> {
        self.query_scalar("SELECT COUNT(*) FROM users", ()).await
    }
}
