//! Telegram Bot API adapter over HTTPS.
//!
//! Implements EventSource with getUpdates long polling and OutboundSink with
//! sendMessage. The getUpdates offset is kept in-process; Telegram re-delivers
//! unacknowledged updates after a restart, which is fine for an append-only
//! archive.

use crate::adapters::telegram::mapper;
use crate::domain::{DomainError, InboundEvent};
use crate::ports::{EventSource, OutboundSink};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Telegram Bot API gateway. One instance serves both poll loop and send path.
pub struct BotApi {
    http: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u64,
    /// Next update_id to request; advanced past every update seen.
    offset: AtomicI64,
}

#[derive(Deserialize)]
struct UpdatesEnvelope {
    ok: bool,
    #[serde(default)]
    result: Vec<Value>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct SendEnvelope {
    ok: bool,
    description: Option<String>,
}

impl BotApi {
    /// Create the gateway for the given bot token. `poll_timeout_secs` is the
    /// getUpdates long-poll window; the HTTP client timeout is set above it
    /// so the server, not the client, ends the poll.
    pub fn new(token: &str, poll_timeout_secs: u64) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 15))
            .build()
            .map_err(|e| DomainError::Source(e.to_string()))?;
        Ok(Self {
            http,
            base_url: format!("https://api.telegram.org/bot{}", token),
            poll_timeout_secs,
            offset: AtomicI64::new(0),
        })
    }
}

#[async_trait::async_trait]
impl EventSource for BotApi {
    async fn next_batch(&self) -> Result<Vec<InboundEvent>, DomainError> {
        let offset = self.offset.load(Ordering::SeqCst);
        let envelope: UpdatesEnvelope = self
            .http
            .get(format!("{}/getUpdates", self.base_url))
            .query(&[
                ("timeout", self.poll_timeout_secs.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| DomainError::Source(e.to_string()))?
            .json()
            .await
            .map_err(|e| DomainError::Source(e.to_string()))?;

        if !envelope.ok {
            return Err(DomainError::Source(
                envelope
                    .description
                    .unwrap_or_else(|| "getUpdates rejected".to_string()),
            ));
        }

        let mut events = Vec::new();
        for update in &envelope.result {
            if let Some(id) = mapper::update_id(update) {
                self.offset.fetch_max(id + 1, Ordering::SeqCst);
            }
            match mapper::update_to_event(update) {
                Some(event) => events.push(event),
                None => debug!("skipping non-message update"),
            }
        }
        Ok(events)
    }
}

#[async_trait::async_trait]
impl OutboundSink for BotApi {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DomainError> {
        let envelope: SendEnvelope = self
            .http
            .post(format!("{}/sendMessage", self.base_url))
            .json(&serde_json::json!({"chat_id": chat_id, "text": text}))
            .send()
            .await
            .map_err(|e| DomainError::Send(e.to_string()))?
            .json()
            .await
            .map_err(|e| DomainError::Send(e.to_string()))?;

        if !envelope.ok {
            return Err(DomainError::Send(
                envelope
                    .description
                    .unwrap_or_else(|| "sendMessage rejected".to_string()),
            ));
        }
        Ok(())
    }
}
