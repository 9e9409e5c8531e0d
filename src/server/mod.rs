//! Server layer root module.
//!
//! - `stomp`: frame codec and the message catalog
//! - `connection`: client channels (WebSocket, HTTP shim)
//! - `dispatch`: the single-consumer loop in front of the core
//! - `matchmaking` and `game_session`: lanes, direct matches and running matches

pub mod connection;
pub mod dispatch;
pub mod error;
pub mod game_session;
pub mod matchmaking;
pub mod online_players;
pub mod router;
pub mod state;
pub mod stomp;
pub mod ws_error;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch; 0 if the clock is set before it.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}
