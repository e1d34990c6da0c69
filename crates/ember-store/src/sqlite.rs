use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::info;

use crate::migrations;
use crate::{
    Document, DocumentStore, MAX_TXN_ATTEMPTS, StoreError, TxnOutcome, merge_fields, split_path,
    validate_collection,
};

/// SQLite-backed store. One connection behind a mutex; WAL mode so external
/// readers are not blocked by the writer.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(store_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(store_err)?;
        migrations::run(&conn).map_err(store_err)?;

        info!("Document store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database. Useful in tests and throwaway setups.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        migrations::run(&conn).map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        split_path(path)?;
        let conn = self.lock()?;
        read_row(&conn, path)
    }

    fn merge(&self, path: &str, fields: &Value) -> Result<(), StoreError> {
        let (collection, _) = split_path(path)?;
        let conn = self.lock()?;
        let existing = read_row(&conn, path)?;
        let merged = merge_fields(existing.as_ref().map(|doc| &doc.data), fields);
        let body = merged.to_string();
        match existing {
            Some(doc) => {
                conn.execute(
                    "UPDATE documents SET data = ?1, version = ?2, updated_at = datetime('now')
                     WHERE path = ?3",
                    params![body, (doc.version + 1) as i64, path],
                )
                .map_err(store_err)?;
            }
            None => {
                conn.execute(
                    "INSERT INTO documents (path, collection, data) VALUES (?1, ?2, ?3)",
                    params![path, collection, body],
                )
                .map_err(store_err)?;
            }
        }
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        validate_collection(collection)?;
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT path, data, version FROM documents WHERE collection = ?1 ORDER BY path",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map([collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(store_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(store_err)?;

        let mut docs = Vec::with_capacity(rows.len());
        for (path, data, version) in rows {
            let Some((_, id)) = path.rsplit_once('/') else {
                continue;
            };
            let value: Value = serde_json::from_str(&data)
                .map_err(|e| StoreError::Data(path.clone(), e.to_string()))?;
            docs.push((
                id.to_string(),
                Document {
                    data: value,
                    version: version as u64,
                },
            ));
        }
        Ok(docs)
    }

    fn transact(
        &self,
        path: &str,
        op: &mut dyn FnMut(Option<&Value>) -> TxnOutcome,
    ) -> Result<(), StoreError> {
        let (collection, _) = split_path(path)?;
        let conn = self.lock()?;
        for _ in 0..MAX_TXN_ATTEMPTS {
            let snapshot = read_row(&conn, path)?;
            let next = match op(snapshot.as_ref().map(|doc| &doc.data)) {
                TxnOutcome::Noop => return Ok(()),
                TxnOutcome::Write(value) => value,
            };
            let body = next.to_string();

            // Conditional on the version observed above: a concurrent writer
            // invalidates the snapshot and the cycle is retried from a fresh
            // read.
            let applied = match &snapshot {
                Some(doc) => conn
                    .execute(
                        "UPDATE documents SET data = ?1, version = ?2, updated_at = datetime('now')
                         WHERE path = ?3 AND version = ?4",
                        params![body, (doc.version + 1) as i64, path, doc.version as i64],
                    )
                    .map_err(store_err)?,
                None => conn
                    .execute(
                        "INSERT OR IGNORE INTO documents (path, collection, data)
                         VALUES (?1, ?2, ?3)",
                        params![path, collection, body],
                    )
                    .map_err(store_err)?,
            };
            if applied == 1 {
                return Ok(());
            }
        }
        Err(StoreError::Contention(path.to_string()))
    }
}

fn store_err(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn read_row(conn: &Connection, path: &str) -> Result<Option<Document>, StoreError> {
    let row = conn
        .query_row(
            "SELECT data, version FROM documents WHERE path = ?1",
            [path],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()
        .map_err(store_err)?;

    match row {
        None => Ok(None),
        Some((data, version)) => {
            let value: Value = serde_json::from_str(&data)
                .map_err(|e| StoreError::Data(path.to_string(), e.to_string()))?;
            Ok(Some(Document {
                data: value,
                version: version as u64,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_round_trips_through_sqlite() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .merge("users/u1/likes_sent/u2", &json!({ "created_at": "t0" }))
            .unwrap();
        store
            .merge("users/u1/likes_sent/u2", &json!({ "created_at": "t1" }))
            .unwrap();

        let doc = store.get("users/u1/likes_sent/u2").unwrap().unwrap();
        assert_eq!(doc.data, json!({ "created_at": "t1" }));
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn merge_keeps_fields_not_named() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .merge("matches/m1", &json!({ "created_at": "t0", "last_message_text": "" }))
            .unwrap();
        store
            .merge("matches/m1", &json!({ "last_message_text": "hi" }))
            .unwrap();

        let doc = store.get("matches/m1").unwrap().unwrap();
        assert_eq!(
            doc.data,
            json!({ "created_at": "t0", "last_message_text": "hi" })
        );
    }

    #[test]
    fn list_does_not_leak_subcollections() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.merge("matches/m1", &json!({ "a": 1 })).unwrap();
        store
            .merge("matches/m1/messages/msg1", &json!({ "text": "hello" }))
            .unwrap();

        let matches = store.list("matches").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, "m1");

        let messages = store.list("matches/m1/messages").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "msg1");
    }

    #[test]
    fn transact_is_create_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        for attempt in 0..2 {
            store
                .transact("matches/m1", &mut |existing| match existing {
                    Some(_) => TxnOutcome::Noop,
                    None => TxnOutcome::Write(json!({ "attempt": attempt })),
                })
                .unwrap();
        }

        let doc = store.get("matches/m1").unwrap().unwrap();
        assert_eq!(doc.data, json!({ "attempt": 0 }));
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn invalid_paths_are_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.get("no-slash"),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(
            store.merge("trailing/", &json!({})),
            Err(StoreError::InvalidPath(_))
        ));
        assert!(matches!(store.list(""), Err(StoreError::InvalidPath(_))));
    }
}
