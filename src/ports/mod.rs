//! Port traits. API boundaries for the hexagon.
//!
//! Outbound: called by application into infrastructure (store, Telegram).
//! The inbound surfaces are the HTTP router and the subscription listener.

pub mod outbound;

pub use outbound::{EventSource, OutboundSink, StorePort};
