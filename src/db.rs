// src/db.rs
use chrono::Utc;
use rusqlite::{named_params, params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::store::{KeyValueStore, StoreError};

const DB_FILE_NAME: &str = "planner.sqlite";
const APP_DATA_DIR: &str = "workout-planner"; // Same dir name as config

/// Gets the path to the SQLite database file within the app's data directory.
pub fn get_db_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir().ok_or(StoreError::DataDir)?;
    let app_dir = data_dir.join(APP_DATA_DIR);
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    Ok(conn)
}

/// Creates the key-value table if it doesn't exist.
pub fn init_db(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,     -- JSON document
            updated_at TEXT NOT NULL -- RFC3339
        )",
        [],
    )?;
    Ok(())
}

/// Key-value store backed by a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wraps an open connection, creating the table if needed.
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::new(open_db(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Keys currently present, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(&value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (:key, :value, :ts)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            named_params! {
                ":key": key,
                ":value": text,
                ":ts": Utc::now().to_rfc3339(),
            },
        )?;
        debug!(key, bytes = text.len(), "stored value");
        Ok(())
    }
}
