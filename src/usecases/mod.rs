//! Application use cases. Orchestrate domain logic via ports.

pub mod ingest_service;
pub mod trigger_resolver;

pub use ingest_service::{IngestService, SubscriptionListener};
pub use trigger_resolver::TriggerResolver;
