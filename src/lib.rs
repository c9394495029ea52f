//! tg-relay: Telegram chat archive + command auto-reply with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
