//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/IO types here — these are mapped from adapters.

use serde::{Deserialize, Serialize};

/// One archived inbound chat event. Append-only; never updated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    /// External network message id. May be empty; not a uniqueness constraint.
    pub tg_id: String,
    /// Normalized sender display label at the time of receipt.
    pub from_user: String,
    pub chat_id: String,
    pub text: String,
    /// Verbatim serialized event payload.
    pub raw_json: String,
    /// RFC 3339, assigned by the store at write time.
    pub received_at: String,
}

/// Fields for a message about to be appended. The store assigns id and received_at.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub tg_id: String,
    pub from_user: String,
    pub chat_id: String,
    pub text: String,
    pub raw_json: String,
}

/// One known sender, deduplicated by external id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub tg_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// RFC 3339; refreshed on every event from this sender.
    pub last_seen: String,
}

/// One trigger -> reply mapping, managed through the Control API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: i64,
    /// Matched against the leading token of inbound text, case-sensitive.
    pub name: String,
    pub description: Option<String>,
    pub response: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Aggregate counters, computed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_messages: i64,
    pub total_users: i64,
}

/// Sender identity as carried by an inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderIdentity {
    /// External sender id. Unique key for the user directory.
    pub external_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SenderIdentity {
    /// Display label: prefer the handle, else name parts, else "unknown".
    pub fn display_label(&self) -> String {
        if let Some(username) = &self.username {
            if !username.is_empty() {
                return username.clone();
            }
        }
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        );
        let full = full.trim();
        if full.is_empty() {
            "unknown".to_string()
        } else {
            full.to_string()
        }
    }
}

/// One inbound chat event as delivered by the event source.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// External message id, when the network provides one.
    pub external_id: Option<String>,
    /// Originating conversation; replies go back here.
    pub chat_id: String,
    pub text: Option<String>,
    pub sender: Option<SenderIdentity>,
    /// Verbatim event payload; archived alongside the message.
    pub raw: serde_json::Value,
}
