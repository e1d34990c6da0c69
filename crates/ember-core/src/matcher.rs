use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use ember_store::{DocumentStore, TxnOutcome};

use crate::error::{CoreError, CoreResult};
use crate::pair::{canonical_pair_id, ordered_pair};
use crate::paths;

/// A directed "I like you" edge. At most one per ordered (from, to) pair;
/// repeating the swipe merges over the existing edge instead of appending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeEdge {
    pub created_at: DateTime<Utc>,
}

/// The shared record for a mutual pair. Created exactly once; afterwards only
/// the last_message_* fields move, and only from the chat side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDoc {
    pub users: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub last_message_text: String,
    pub last_message_from: String,
}

/// What a like produced: `match_id` is set iff `matched`.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeOutcome {
    pub matched: bool,
    pub match_id: Option<String>,
}

/// A match as seen by one of its participants.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub id: String,
    pub doc: MatchDoc,
}

/// Ids a user has already swiped on, either way. Discover feeds exclude these
/// when assembling a candidate batch.
#[derive(Debug, Clone, Default)]
pub struct SwipedIds {
    pub liked: Vec<String>,
    pub passed: Vec<String>,
}

#[derive(Clone)]
pub struct Matchmaker {
    store: Arc<dyn DocumentStore>,
}

impl Matchmaker {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Record `source` liking `target`; if the reverse edge already exists,
    /// establish the canonical match record. Idempotent, and safe when both
    /// sides call it concurrently: both compute the same match id, and the
    /// create-if-absent transaction lets exactly one writer through.
    pub fn submit_like(&self, source: &str, target: &str) -> CoreResult<LikeOutcome> {
        validate_swipe(source, target)?;

        let now = Utc::now();
        self.store.merge(
            &paths::like_edge(source, target),
            &json!({ "created_at": now }),
        )?;

        if self.store.get(&paths::like_edge(target, source))?.is_none() {
            return Ok(LikeOutcome {
                matched: false,
                match_id: None,
            });
        }

        let match_id = canonical_pair_id(source, target);
        let (lo, hi) = ordered_pair(source, target);
        let doc = json!({
            "users": [lo, hi],
            "created_at": now,
            "last_message_at": now,
            "last_message_text": "",
            "last_message_from": source,
        });

        let mut created = false;
        self.store
            .transact(&paths::match_doc(&match_id), &mut |existing| {
                if existing.is_some() {
                    // Already matched; leave created_at and chat state alone.
                    TxnOutcome::Noop
                } else {
                    created = true;
                    TxnOutcome::Write(doc.clone())
                }
            })?;
        if created {
            debug!(match_id = %match_id, "match created");
        }

        Ok(LikeOutcome {
            matched: true,
            match_id: Some(match_id),
        })
    }

    /// Record `source` passing on `target`. Pass edges only feed the discover
    /// exclusion set; they never participate in matching.
    pub fn submit_pass(&self, source: &str, target: &str) -> CoreResult<()> {
        validate_swipe(source, target)?;
        self.store.merge(
            &paths::pass_edge(source, target),
            &json!({ "created_at": Utc::now() }),
        )?;
        Ok(())
    }

    /// Everyone `uid` has already liked or passed on.
    pub fn swiped_ids(&self, uid: &str) -> CoreResult<SwipedIds> {
        validate_uid(uid)?;
        let liked = self
            .store
            .list(&paths::likes_sent(uid))?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let passed = self
            .store
            .list(&paths::passes(uid))?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        Ok(SwipedIds { liked, passed })
    }

    /// All matches `uid` participates in, most recent conversation first.
    pub fn list_matches(&self, uid: &str) -> CoreResult<Vec<MatchRecord>> {
        validate_uid(uid)?;
        let mut records: Vec<MatchRecord> = Vec::new();
        for (id, doc) in self.store.list(paths::MATCHES)? {
            let parsed: MatchDoc = match serde_json::from_value(doc.data) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Corrupt match document '{}': {}", id, e);
                    continue;
                }
            };
            if parsed.users.iter().any(|u| u == uid) {
                records.push(MatchRecord { id, doc: parsed });
            }
        }
        records.sort_by(|a, b| b.doc.last_message_at.cmp(&a.doc.last_message_at));
        Ok(records)
    }
}

fn validate_swipe(source: &str, target: &str) -> CoreResult<()> {
    validate_uid(source)?;
    if target.trim().is_empty() {
        return Err(CoreError::InvalidArgument("target uid is required".into()));
    }
    if source == target {
        return Err(CoreError::InvalidArgument(
            "cannot swipe on yourself".into(),
        ));
    }
    Ok(())
}

fn validate_uid(uid: &str) -> CoreResult<()> {
    if uid.trim().is_empty() {
        return Err(CoreError::InvalidArgument("uid is required".into()));
    }
    Ok(())
}
