//! Infrastructure adapters. Implement outbound ports and the HTTP surface.
//!
//! Telegram, SQLite, operator API. Map errors to DomainError.

pub mod http;
pub mod persistence;
pub mod telegram;
