//! Match lifecycle: player identities, running matches and the coordinator
//! that owns both.

pub mod deck;
pub mod messages;
pub mod operation_resolution;
pub mod player;
pub mod player_order;
pub mod server;
pub mod session;

pub use server::GameServerCore;
