//! Ingestion pipeline: archive every inbound event, keep the sender directory
//! current, and auto-reply on trigger matches.
//!
//! - `SubscriptionListener` long-polls the event source and feeds a bounded
//!   channel (backpressure: the poll loop blocks on send().await when full).
//! - `IngestService` consumes the channel; each event runs in its own task,
//!   capped by a semaphore, so a slow outbound send never stalls ingestion
//!   of later events.
//! - Per-event failures are logged and never terminate the subscription.

use crate::domain::{DomainError, InboundEvent, NewMessage};
use crate::ports::{EventSource, OutboundSink, StorePort};
use crate::usecases::trigger_resolver::TriggerResolver;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Maximum events processed concurrently.
const MAX_CONCURRENT_EVENTS: usize = 8;

/// Long-poll loop: pull event batches from the source and push them into the
/// pipeline channel. Returns only on a connection-level source failure, which
/// is fatal to the subscription (the caller decides what survives it).
pub struct SubscriptionListener {
    source: Arc<dyn EventSource>,
    tx: mpsc::Sender<InboundEvent>,
}

impl SubscriptionListener {
    pub fn new(source: Arc<dyn EventSource>, tx: mpsc::Sender<InboundEvent>) -> Self {
        Self { source, tx }
    }

    pub async fn run(&self) -> Result<(), DomainError> {
        info!("inbound subscription started");
        loop {
            let batch = self.source.next_batch().await?;
            for event in batch {
                if self.tx.send(event).await.is_err() {
                    // Pipeline receiver dropped; nothing left to feed.
                    return Err(DomainError::Source("event pipeline closed".into()));
                }
            }
        }
    }
}

/// Per-event pipeline worker. Consumes the channel until it closes.
pub struct IngestService {
    store: Arc<dyn StorePort>,
    resolver: TriggerResolver,
    sink: Option<Arc<dyn OutboundSink>>,
}

impl IngestService {
    pub fn new(
        store: Arc<dyn StorePort>,
        resolver: TriggerResolver,
        sink: Option<Arc<dyn OutboundSink>>,
    ) -> Self {
        Self {
            store,
            resolver,
            sink,
        }
    }

    /// Run the worker. Processes until the channel is closed. One task per
    /// event, gated by a semaphore; errors are logged and isolated.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<InboundEvent>) {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(MAX_CONCURRENT_EVENTS));

        while let Some(event) = rx.recv().await {
            let sem = Arc::clone(&semaphore);
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                let _permit = sem.acquire().await.expect("semaphore closed");
                let chat_id = event.chat_id.clone();
                if let Err(e) = service.process_event(event).await {
                    warn!(chat_id, error = %e, "event processing failed; subscription continues");
                }
            });
        }

        info!("ingest worker finished (channel closed)");
    }

    /// The per-event pipeline: normalize sender label, archive the message,
    /// upsert the sender, resolve the trigger table, reply on a match.
    pub async fn process_event(&self, event: InboundEvent) -> Result<(), DomainError> {
        let from_user = event
            .sender
            .as_ref()
            .map(|s| s.display_label())
            .unwrap_or_else(|| "unknown".to_string());

        let raw_json = event.raw.to_string();
        let text = event.text.clone().unwrap_or_else(|| raw_json.clone());

        let message_id = self
            .store
            .append_message(NewMessage {
                tg_id: event.external_id.clone().unwrap_or_default(),
                from_user,
                chat_id: event.chat_id.clone(),
                text,
                raw_json,
            })
            .await?;
        debug!(message_id, chat_id = %event.chat_id, "archived inbound message");

        if let Some(sender) = &event.sender {
            self.store
                .upsert_user(sender, &Utc::now().to_rfc3339())
                .await?;
        }

        if let Some(reply) = self.resolver.resolve(event.text.as_deref()).await? {
            match &self.sink {
                Some(sink) => {
                    sink.send(&event.chat_id, &reply).await?;
                    info!(chat_id = %event.chat_id, "trigger matched; reply sent");
                }
                None => {
                    debug!(chat_id = %event.chat_id, "trigger matched but no sink configured");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::SqliteStore;
    use crate::domain::SenderIdentity;
    use tokio::sync::Mutex;

    /// Records outbound sends instead of talking to a network.
    struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl OutboundSink for RecordingSink {
        async fn send(&self, chat_id: &str, text: &str) -> Result<(), DomainError> {
            self.sent
                .lock()
                .await
                .push((chat_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn event(text: Option<&str>, sender_id: Option<&str>) -> InboundEvent {
        InboundEvent {
            external_id: Some("555".to_string()),
            chat_id: "42".to_string(),
            text: text.map(String::from),
            sender: sender_id.map(|id| SenderIdentity {
                external_id: id.to_string(),
                username: Some("alice".to_string()),
                first_name: None,
                last_name: None,
            }),
            raw: serde_json::json!({"message_id": 555}),
        }
    }

    async fn service_with_sink(
        sink: Option<Arc<dyn OutboundSink>>,
    ) -> (Arc<SqliteStore>, IngestService) {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let resolver = TriggerResolver::new(store.clone() as Arc<dyn StorePort>);
        let service = IngestService::new(store.clone() as Arc<dyn StorePort>, resolver, sink);
        (store, service)
    }

    #[tokio::test]
    async fn resend_appends_twice_but_upserts_once() {
        let (store, service) = service_with_sink(None).await;
        service
            .process_event(event(Some("hello"), Some("100")))
            .await
            .unwrap();
        service
            .process_event(event(Some("hello"), Some("100")))
            .await
            .unwrap();
        assert_eq!(store.count_messages().await.unwrap(), 2);
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn trigger_match_sends_reply_to_originating_chat() {
        let sink = RecordingSink::new();
        let (store, service) =
            service_with_sink(Some(sink.clone() as Arc<dyn OutboundSink>)).await;
        store
            .create_command("/start", None, Some("hi"))
            .await
            .unwrap();

        service
            .process_event(event(Some("/start now"), Some("100")))
            .await
            .unwrap();

        let sent = sink.sent.lock().await;
        assert_eq!(sent.as_slice(), &[("42".to_string(), "hi".to_string())]);
    }

    #[tokio::test]
    async fn no_match_sends_nothing() {
        let sink = RecordingSink::new();
        let (_store, service) =
            service_with_sink(Some(sink.clone() as Arc<dyn OutboundSink>)).await;
        service
            .process_event(event(Some("just chatting"), Some("100")))
            .await
            .unwrap();
        assert!(sink.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn match_without_sink_is_not_an_error() {
        let (store, service) = service_with_sink(None).await;
        store
            .create_command("/start", None, Some("hi"))
            .await
            .unwrap();
        service
            .process_event(event(Some("/start"), Some("100")))
            .await
            .unwrap();
        assert_eq!(store.count_messages().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn senderless_event_archives_as_unknown_without_user_row() {
        let (store, service) = service_with_sink(None).await;
        service
            .process_event(event(Some("anon"), None))
            .await
            .unwrap();
        assert_eq!(store.count_users().await.unwrap(), 0);
        let messages = store.list_messages(10).await.unwrap();
        assert_eq!(messages[0].from_user, "unknown");
    }

    #[tokio::test]
    async fn textless_event_stores_serialized_payload() {
        let (store, service) = service_with_sink(None).await;
        service.process_event(event(None, Some("100"))).await.unwrap();
        let messages = store.list_messages(10).await.unwrap();
        assert_eq!(messages[0].text, messages[0].raw_json);
        assert!(messages[0].text.contains("message_id"));
    }

    #[tokio::test]
    async fn display_fields_reflect_most_recent_event() {
        let (store, service) = service_with_sink(None).await;
        let mut first = event(Some("hi"), Some("100"));
        first.sender.as_mut().unwrap().username = Some("before".to_string());
        let mut second = event(Some("hi again"), Some("100"));
        second.sender.as_mut().unwrap().username = Some("after".to_string());

        service.process_event(first).await.unwrap();
        service.process_event(second).await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username.as_deref(), Some("after"));
    }
}
