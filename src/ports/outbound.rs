//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    CommandRecord, DomainError, InboundEvent, MessageRecord, NewMessage, SenderIdentity, UserRecord,
};

/// Store port. Durable CRUD over messages, users, and the command table.
///
/// The store exclusively owns all persisted state; the listener and the
/// Control API hold only request-scoped views.
#[async_trait::async_trait]
pub trait StorePort: Send + Sync {
    /// Append one inbound event. Always inserts; duplicate external message
    /// ids are allowed. The store assigns id and received_at. Returns the id.
    async fn append_message(&self, msg: NewMessage) -> Result<i64, DomainError>;

    /// Insert-or-update one sender, keyed on the unique external id, as a
    /// single atomic operation. Overwrites display fields and last_seen on
    /// conflict. Returns the stable id for that sender.
    async fn upsert_user(
        &self,
        identity: &SenderIdentity,
        seen_at: &str,
    ) -> Result<i64, DomainError>;

    /// Most recent messages first, capped at `limit`.
    async fn list_messages(&self, limit: u32) -> Result<Vec<MessageRecord>, DomainError>;

    async fn get_message(&self, id: i64) -> Result<Option<MessageRecord>, DomainError>;

    /// Most recently seen senders first.
    async fn list_users(&self) -> Result<Vec<UserRecord>, DomainError>;

    /// Commands ordered by name.
    async fn list_commands(&self) -> Result<Vec<CommandRecord>, DomainError>;

    /// Exact, case-sensitive lookup on the full trigger name. When several
    /// rows share a name, the lowest id wins.
    async fn find_command_by_name(&self, name: &str)
        -> Result<Option<CommandRecord>, DomainError>;

    /// Fails with `DomainError::Validation` when `name` is empty.
    async fn create_command(
        &self,
        name: &str,
        description: Option<&str>,
        response: Option<&str>,
    ) -> Result<i64, DomainError>;

    /// Returns the changed-row count. 0 means no such id; not an error.
    async fn update_command(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        response: Option<&str>,
    ) -> Result<u64, DomainError>;

    /// Returns the changed-row count. 0 means no such id; not an error.
    async fn delete_command(&self, id: i64) -> Result<u64, DomainError>;

    async fn count_messages(&self) -> Result<i64, DomainError>;

    async fn count_users(&self) -> Result<i64, DomainError>;
}

/// Inbound event source: a long-lived subscription to the external network.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Wait for and return the next batch of inbound events. Blocks (long
    /// poll) until events arrive or the poll window elapses; an empty batch
    /// is normal. A connection-level failure is returned as
    /// `DomainError::Source` and ends the subscription.
    async fn next_batch(&self) -> Result<Vec<InboundEvent>, DomainError>;
}

/// Outbound sink: deliver one message to a conversation on the external network.
#[async_trait::async_trait]
pub trait OutboundSink: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DomainError>;
}
