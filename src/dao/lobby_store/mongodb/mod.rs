//! MongoDB implementation of the [`LobbyStore`](super::LobbyStore) trait.

pub mod config;
pub mod connection;
pub mod error;
pub mod store;

pub use config::MongoConfig;
pub use store::MongoLobbyStore;
