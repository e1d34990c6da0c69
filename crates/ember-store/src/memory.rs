use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::{
    Document, DocumentStore, MAX_TXN_ATTEMPTS, StoreError, TxnOutcome, merge_fields, split_path,
    validate_collection,
};

/// In-memory store. Backs tests and embedded single-process use; the
/// compare-and-swap in [`transact`](DocumentStore::transact) is real, so
/// concurrent writers race exactly as they would against a remote store.
pub struct MemoryStore {
    docs: Mutex<HashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Document>>, StoreError> {
        self.docs
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        split_path(path)?;
        Ok(self.lock()?.get(path).cloned())
    }

    fn merge(&self, path: &str, fields: &Value) -> Result<(), StoreError> {
        split_path(path)?;
        let mut docs = self.lock()?;
        match docs.get_mut(path) {
            Some(doc) => {
                doc.data = merge_fields(Some(&doc.data), fields);
                doc.version += 1;
            }
            None => {
                docs.insert(
                    path.to_string(),
                    Document {
                        data: merge_fields(None, fields),
                        version: 1,
                    },
                );
            }
        }
        Ok(())
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        validate_collection(collection)?;
        let docs = self.lock()?;
        let mut rows: Vec<(String, Document)> = docs
            .iter()
            .filter_map(|(path, doc)| {
                let (parent, id) = path.rsplit_once('/')?;
                (parent == collection).then(|| (id.to_string(), doc.clone()))
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }

    fn transact(
        &self,
        path: &str,
        op: &mut dyn FnMut(Option<&Value>) -> TxnOutcome,
    ) -> Result<(), StoreError> {
        split_path(path)?;
        for _ in 0..MAX_TXN_ATTEMPTS {
            let snapshot = self.lock()?.get(path).cloned();

            // The closure runs without the lock held, so concurrent writers
            // genuinely interleave; the version check below arbitrates.
            let next = match op(snapshot.as_ref().map(|doc| &doc.data)) {
                TxnOutcome::Noop => return Ok(()),
                TxnOutcome::Write(value) => value,
            };

            let mut docs = self.lock()?;
            let current_version = docs.get(path).map(|doc| doc.version);
            if current_version == snapshot.map(|doc| doc.version) {
                let version = current_version.unwrap_or(0) + 1;
                docs.insert(path.to_string(), Document { data: next, version });
                return Ok(());
            }
        }
        Err(StoreError::Contention(path.to_string()))
    }
}
