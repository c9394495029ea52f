//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Bad caller input. Client's fault; never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested identifier does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persistence layer failure. Fatal to the current operation, not retried.
    #[error("Storage error: {0}")]
    Storage(String),

    /// No outbound sink configured (e.g. missing bot token). Distinct from
    /// a transient send failure.
    #[error("Outbound sink not configured")]
    SinkUnavailable,

    /// Outbound attempt made and rejected or timed out by the external network.
    #[error("Send failed: {0}")]
    Send(String),

    /// Inbound subscription failure (connection-level). Fatal to the listener.
    #[error("Event source error: {0}")]
    Source(String),
}
