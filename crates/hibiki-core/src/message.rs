use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat message normalized by the watch loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    /// Platform message id, used for deduplication across pages.
    pub external_id: String,
    /// Human-readable author name.
    pub author_name: String,
    /// Platform-specific author identity key.
    pub author_id: String,
    /// Whether the author is the chat owner or a moderator.
    pub is_owner: bool,
    /// Message text content.
    pub text: String,
    /// Publish timestamp reported by the platform. Not monotonic
    /// across pages; `arrival_order` is the authoritative sort key.
    pub published_at: DateTime<Utc>,
    /// Monotonic sequence number assigned at ingestion.
    pub arrival_order: u64,
}

/// One row of the display log. Append-only; never mutated once
/// appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub timestamp: DateTime<Utc>,
    /// Author label ("System" for watcher-reported failures).
    pub author: String,
    pub text: String,
    pub is_owner: bool,
    pub is_bot: bool,
    /// Delivery outcome for bot-sent messages; `None` for everything
    /// else.
    #[serde(default)]
    pub sent: Option<bool>,
}

impl DisplayRecord {
    /// A record mirroring a viewer message.
    pub fn viewer(msg: &ChatMessage) -> Self {
        Self {
            timestamp: msg.published_at,
            author: msg.author_name.clone(),
            text: msg.text.clone(),
            is_owner: msg.is_owner,
            is_bot: false,
            sent: None,
        }
    }

    /// A record for a bot-authored message, tagged with delivery
    /// outcome.
    pub fn bot(text: impl Into<String>, sent: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            author: "Bot".to_string(),
            text: text.into(),
            is_owner: true,
            is_bot: true,
            sent: Some(sent),
        }
    }

    /// A record reporting a watcher-level failure to the viewer.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            author: "System".to_string(),
            text: text.into(),
            is_owner: true,
            is_bot: true,
            sent: None,
        }
    }
}

/// One raw item returned by the chat transport, before normalization.
#[derive(Debug, Clone)]
pub struct ChatItem {
    pub external_id: String,
    pub author_name: String,
    pub author_id: String,
    pub is_owner: bool,
    pub is_moderator: bool,
    /// Absent for non-text event types (membership events, super
    /// chats, deletions); the watcher skips those.
    pub text: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// One page of chat messages from the transport.
#[derive(Debug, Clone, Default)]
pub struct ChatPage {
    pub items: Vec<ChatItem>,
    /// Pagination cursor to feed into the next fetch.
    pub next_cursor: Option<String>,
    /// Transport-recommended delay before the next fetch.
    pub polling_interval_ms: Option<u64>,
}
