pub mod memory;
pub mod migrations;
pub mod sqlite;

use serde_json::Value;
use thiserror::Error;

/// Attempts a contended transaction makes before giving up.
pub const MAX_TXN_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("transaction on {0} contended beyond retry budget")]
    Contention(String),
    #[error("invalid document path: {0}")]
    InvalidPath(String),
    #[error("undecodable document at {0}: {1}")]
    Data(String, String),
}

/// A stored document: its JSON value plus the per-document write version the
/// store uses for compare-and-swap.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub data: Value,
    pub version: u64,
}

/// What a transaction closure decided to do with the document it was shown.
pub enum TxnOutcome {
    /// Replace the document with this value.
    Write(Value),
    /// Leave the document untouched.
    Noop,
}

/// Minimal path-addressed document store. Paths look like
/// `users/u1/likes_sent/u2`: the last segment is the document id, everything
/// before it is the parent collection.
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document.
    fn get(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Shallow-merge `fields` into the document, creating it if absent.
    fn merge(&self, path: &str, fields: &Value) -> Result<(), StoreError>;

    /// All documents directly under `collection`, as (id, document) pairs.
    /// Documents in nested subcollections are not included.
    fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;

    /// Atomic single-document read-modify-write. `op` sees the current value
    /// (`None` if the document does not exist) and decides whether to write.
    /// The write applies only if no other writer touched the document in
    /// between; on conflict the whole read-decide-write cycle is retried, so
    /// `op` may run more than once. Exhausting the retry budget surfaces as
    /// [`StoreError::Contention`].
    fn transact(
        &self,
        path: &str,
        op: &mut dyn FnMut(Option<&Value>) -> TxnOutcome,
    ) -> Result<(), StoreError>;
}

/// Split a document path into (collection, id).
pub fn split_path(path: &str) -> Result<(&str, &str), StoreError> {
    let (collection, id) = path
        .rsplit_once('/')
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
    if id.is_empty() || collection.split('/').any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok((collection, id))
}

pub(crate) fn validate_collection(collection: &str) -> Result<(), StoreError> {
    if collection.is_empty() || collection.split('/').any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath(collection.to_string()));
    }
    Ok(())
}

/// Shallow merge: top-level fields of `fields` overwrite the same fields of
/// `existing`; every other field of `existing` is kept. A non-object existing
/// value is replaced outright.
pub fn merge_fields(existing: Option<&Value>, fields: &Value) -> Value {
    match (existing, fields) {
        (Some(Value::Object(old)), Value::Object(new)) => {
            let mut merged = old.clone();
            for (key, value) in new {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => fields.clone(),
    }
}
