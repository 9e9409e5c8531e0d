//! Matchmaking module: queue lanes, direct-match messages and shared identifiers.

pub mod messages;
pub mod swimlane;
pub mod types;
