use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use ember_store::{DocumentStore, StoreError};

use crate::error::{CoreError, CoreResult};
use crate::matcher::MatchDoc;
use crate::paths;

/// Cap on one message-history page.
pub const MESSAGE_PAGE_LIMIT: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from_uid: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: String,
    pub message: ChatMessage,
}

/// Messaging inside an established match. This is the only writer of the
/// match document's last_message_* fields after creation.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn DocumentStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Append a message and move the match's last-message fields forward.
    pub fn send_message(
        &self,
        sender: &str,
        match_id: &str,
        text: &str,
    ) -> CoreResult<MessageRecord> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::InvalidArgument("text is required".into()));
        }
        self.require_participant(sender, match_id)?;

        let now = Utc::now();
        let message_id = Uuid::new_v4().to_string();
        self.store.merge(
            &paths::message_doc(match_id, &message_id),
            &json!({ "from_uid": sender, "text": text, "created_at": now }),
        )?;
        self.store.merge(
            &paths::match_doc(match_id),
            &json!({
                "last_message_at": now,
                "last_message_text": text,
                "last_message_from": sender,
            }),
        )?;

        Ok(MessageRecord {
            id: message_id,
            message: ChatMessage {
                from_uid: sender.to_string(),
                text: text.to_string(),
                created_at: now,
            },
        })
    }

    /// Message history, oldest first, capped at [`MESSAGE_PAGE_LIMIT`].
    pub fn list_messages(
        &self,
        requester: &str,
        match_id: &str,
        limit: Option<usize>,
    ) -> CoreResult<Vec<MessageRecord>> {
        self.require_participant(requester, match_id)?;
        let limit = limit.unwrap_or(MESSAGE_PAGE_LIMIT).min(MESSAGE_PAGE_LIMIT);

        let mut records: Vec<MessageRecord> = Vec::new();
        for (id, doc) in self.store.list(&paths::messages(match_id))? {
            match serde_json::from_value::<ChatMessage>(doc.data) {
                Ok(message) => records.push(MessageRecord { id, message }),
                Err(e) => warn!("Corrupt message document '{}': {}", id, e),
            }
        }
        records.sort_by(|a, b| {
            a.message
                .created_at
                .cmp(&b.message.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        records.truncate(limit);
        Ok(records)
    }

    fn require_participant(&self, uid: &str, match_id: &str) -> CoreResult<MatchDoc> {
        if uid.trim().is_empty() {
            return Err(CoreError::InvalidArgument("uid is required".into()));
        }
        if match_id.trim().is_empty() {
            return Err(CoreError::InvalidArgument("match id is required".into()));
        }

        let path = paths::match_doc(match_id);
        let doc = self.store.get(&path)?.ok_or(CoreError::NotFound)?;
        let parsed: MatchDoc = serde_json::from_value(doc.data)
            .map_err(|e| CoreError::Store(StoreError::Data(path, e.to_string())))?;
        if !parsed.users.iter().any(|u| u == uid) {
            return Err(CoreError::Forbidden);
        }
        Ok(parsed)
    }
}
