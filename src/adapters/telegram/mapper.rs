//! Map Telegram Bot API update JSON to domain events.
//!
//! Only `message` updates become InboundEvents; everything else is skipped.
//! The message object is kept verbatim as the event's raw payload.

use crate::domain::{InboundEvent, SenderIdentity};
use serde_json::Value;

/// Extract the update_id used to advance the getUpdates offset.
pub fn update_id(update: &Value) -> Option<i64> {
    update.get("update_id")?.as_i64()
}

/// Map one update to an InboundEvent. Returns None for non-message updates
/// (edited messages, callback queries, ...) and for messages without a chat.
pub fn update_to_event(update: &Value) -> Option<InboundEvent> {
    let message = update.get("message")?;
    let chat_id = id_string(message.get("chat")?.get("id")?)?;

    let external_id = message.get("message_id").and_then(id_string);
    let text = message
        .get("text")
        .and_then(|v| v.as_str())
        .map(String::from);
    let sender = message.get("from").and_then(sender_identity);

    Some(InboundEvent {
        external_id,
        chat_id,
        text,
        sender,
        raw: message.clone(),
    })
}

fn sender_identity(from: &Value) -> Option<SenderIdentity> {
    let external_id = id_string(from.get("id")?)?;
    Some(SenderIdentity {
        external_id,
        username: str_field(from, "username"),
        first_name: str_field(from, "first_name"),
        last_name: str_field(from, "last_name"),
    })
}

fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Telegram ids are integers on the wire; the store keys on strings.
fn id_string(v: &Value) -> Option<String> {
    if let Some(n) = v.as_i64() {
        return Some(n.to_string());
    }
    v.as_str().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_full_message_update() {
        let update = json!({
            "update_id": 10,
            "message": {
                "message_id": 55,
                "from": {"id": 7, "username": "alice", "first_name": "Alice"},
                "chat": {"id": -100123},
                "text": "/start now"
            }
        });
        let event = update_to_event(&update).unwrap();
        assert_eq!(event.external_id.as_deref(), Some("55"));
        assert_eq!(event.chat_id, "-100123");
        assert_eq!(event.text.as_deref(), Some("/start now"));
        let sender = event.sender.unwrap();
        assert_eq!(sender.external_id, "7");
        assert_eq!(sender.username.as_deref(), Some("alice"));
        assert_eq!(sender.last_name, None);
        assert_eq!(event.raw, update["message"]);
    }

    #[test]
    fn maps_message_without_text_or_sender() {
        let update = json!({
            "update_id": 11,
            "message": {"message_id": 56, "chat": {"id": 9}, "sticker": {}}
        });
        let event = update_to_event(&update).unwrap();
        assert_eq!(event.text, None);
        assert!(event.sender.is_none());
        assert_eq!(event.chat_id, "9");
    }

    #[test]
    fn skips_non_message_updates() {
        let update = json!({"update_id": 12, "callback_query": {"id": "x"}});
        assert!(update_to_event(&update).is_none());
        assert_eq!(update_id(&update), Some(12));
    }
}
