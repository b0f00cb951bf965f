//! Business logic layered between the routes/gateway and the DAO.

pub mod documentation;
pub mod events;
pub mod health_service;
pub mod leaderboard;
pub mod lobby_manager;
pub mod orchestrator;
pub mod rounds;
pub mod scoring;
pub mod storage_supervisor;
pub mod websocket_service;
