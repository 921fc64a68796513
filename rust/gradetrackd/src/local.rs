//! Synchronous key-value tier: always available, read first on start-up and
//! written through on every save.

use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub trait LocalStore: Send {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    /// Human-readable description of where the values live.
    fn location(&self) -> String;
}

pub struct SqliteLocalStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteLocalStore {
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn,
            path: Some(db_path.to_path_buf()),
        })
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    Ok(())
}

impl LocalStore for SqliteLocalStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv(key, value, updated_at) VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, &now),
        )?;
        Ok(())
    }

    fn location(&self) -> String {
        match &self.path {
            Some(p) => p.to_string_lossy().to_string(),
            None => "sqlite::memory".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryLocalStore {
    values: HashMap<String, String>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_set_overwrites_and_stamps() {
        let mut store = SqliteLocalStore::in_memory().expect("open");
        assert_eq!(store.get("k").expect("get"), None);

        store.set("k", "one").expect("set");
        store.set("k", "two").expect("set again");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("two"));

        let stamped: Option<String> = store
            .conn
            .query_row("SELECT updated_at FROM kv WHERE key = 'k'", [], |r| r.get(0))
            .expect("updated_at");
        assert!(stamped.is_some());
    }

    #[test]
    fn sqlite_store_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("gradetrack-local-{}", crate::model::new_id()));
        let path = dir.join("local.sqlite3");
        {
            let mut store = SqliteLocalStore::open(&path).expect("open");
            store.set("grade-tracker:active-semester:v1", "s1").expect("set");
        }
        let store = SqliteLocalStore::open(&path).expect("reopen");
        assert_eq!(
            store.get("grade-tracker:active-semester:v1").expect("get").as_deref(),
            Some("s1")
        );
        assert_eq!(store.location(), path.to_string_lossy());
        let _ = std::fs::remove_dir_all(dir);
    }
}
