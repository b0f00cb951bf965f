//! Data access layer: entity definitions and durable store backends.

pub mod lobby_store;
pub mod models;
pub mod storage;
