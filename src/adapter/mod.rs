//! Outbound adapters: SQLite persistence and the HTTP marketplace client.

pub mod http;
pub mod sqlite;
