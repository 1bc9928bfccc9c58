//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};
use warden_api::{BlockedDomain, SessionRecord};
use warden_util::SessionId;

use crate::{SessionStore, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            -- Session history (append-only from the engine's point of view)
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                domains_json TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                created_date TEXT NOT NULL
            );

            -- Blocked-domain pick list
            CREATE TABLE IF NOT EXISTS blocked_domains (
                id TEXT PRIMARY KEY,
                domain TEXT NOT NULL,
                added_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_end_time ON sessions(end_time);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

/// Parse an RFC 3339 timestamp column, falling back to the epoch so one bad
/// row cannot poison a whole load.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!(raw, "Unparsable timestamp in store, defaulting to epoch");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

/// Parse the domains column; anything malformed becomes an empty list.
fn parse_domains(raw: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => {
            warn!(raw, "Malformed domains column, defaulting to empty");
            Vec::new()
        }
    }
}

impl SessionStore for SqliteStore {
    fn load_sessions(&self) -> StoreResult<Vec<SessionRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, domains_json, duration_minutes, start_time, end_time, is_active, created_date
             FROM sessions ORDER BY rowid",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SessionRecord {
                id: SessionId::from_string(row.get::<_, String>(0)?),
                domains: parse_domains(&row.get::<_, String>(1)?),
                duration_minutes: row.get(2)?,
                start_time: parse_timestamp(&row.get::<_, String>(3)?),
                end_time: parse_timestamp(&row.get::<_, String>(4)?),
                is_active: row.get(5)?,
                created_date: parse_timestamp(&row.get::<_, String>(6)?),
            })
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    fn save_sessions(&self, sessions: &[SessionRecord]) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM sessions", [])?;
        for session in sessions {
            tx.execute(
                "INSERT INTO sessions
                 (id, domains_json, duration_minutes, start_time, end_time, is_active, created_date)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    session.id.as_str(),
                    serde_json::to_string(&session.domains)?,
                    session.duration_minutes,
                    session.start_time.to_rfc3339(),
                    session.end_time.to_rfc3339(),
                    session.is_active,
                    session.created_date.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        debug!(count = sessions.len(), "Session collection saved");
        Ok(())
    }

    fn load_blocked_domains(&self) -> StoreResult<Vec<BlockedDomain>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt =
            conn.prepare("SELECT id, domain, added_at FROM blocked_domains ORDER BY rowid")?;

        let rows = stmt.query_map([], |row| {
            Ok(BlockedDomain {
                id: row.get(0)?,
                domain: row.get(1)?,
                added_at: parse_timestamp(&row.get::<_, String>(2)?),
            })
        })?;

        let mut domains = Vec::new();
        for row in rows {
            domains.push(row?);
        }
        Ok(domains)
    }

    fn save_blocked_domains(&self, domains: &[BlockedDomain]) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM blocked_domains", [])?;
        for domain in domains {
            tx.execute(
                "INSERT INTO blocked_domains (id, domain, added_at) VALUES (?, ?, ?)",
                params![domain.id, domain.domain, domain.added_at.to_rfc3339()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_session(domains: Vec<&str>, active: bool) -> SessionRecord {
        let now = Utc::now();
        SessionRecord {
            id: SessionId::new(),
            domains: domains.into_iter().map(str::to_string).collect(),
            duration_minutes: 30,
            start_time: now,
            end_time: now + Duration::minutes(30),
            is_active: active,
            created_date: now,
        }
    }

    #[test]
    fn empty_store_loads_empty_collections() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load_sessions().unwrap().is_empty());
        assert!(store.load_blocked_domains().unwrap().is_empty());
        assert!(store.is_healthy());
    }

    #[test]
    fn session_roundtrip_preserves_order() {
        let store = SqliteStore::in_memory().unwrap();
        let sessions = vec![
            make_session(vec!["a.com"], true),
            make_session(vec!["b.com", "c.com"], false),
        ];

        store.save_sessions(&sessions).unwrap();
        let loaded = store.load_sessions().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, sessions[0].id);
        assert_eq!(loaded[1].domains, vec!["b.com", "c.com"]);
        assert!(!loaded[1].is_active);
        // Timestamps survive to the second
        assert_eq!(
            loaded[0].end_time.timestamp(),
            sessions[0].end_time.timestamp()
        );
    }

    #[test]
    fn save_replaces_wholesale() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .save_sessions(&[make_session(vec!["a.com"], true)])
            .unwrap();

        let replacement = vec![make_session(vec!["b.com"], true)];
        store.save_sessions(&replacement).unwrap();

        let loaded = store.load_sessions().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].domains, vec!["b.com"]);
    }

    #[test]
    fn malformed_domains_column_defaults_to_empty() {
        let store = SqliteStore::in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO sessions VALUES ('1', 'not-json', 10,
                 '2026-01-01T00:00:00+00:00', '2026-01-01T00:10:00+00:00', 1,
                 '2026-01-01T00:00:00+00:00')",
                [],
            )
            .unwrap();
        }

        let loaded = store.load_sessions().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].domains.is_empty());
        assert!(loaded[0].is_active);
    }

    #[test]
    fn blocked_domain_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        let domains = vec![BlockedDomain {
            id: "1".into(),
            domain: "example.com".into(),
            added_at: Utc::now(),
        }];

        store.save_blocked_domains(&domains).unwrap();
        let loaded = store.load_blocked_domains().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].domain, "example.com");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .save_sessions(&[make_session(vec!["a.com"], true)])
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.load_sessions().unwrap().len(), 1);
    }
}
