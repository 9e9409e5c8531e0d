//! Matchmaking configuration constants.
//!
//! Lane identifiers and the denial payload clients expect when a direct match
//! cannot be proposed.

/// Error number carried in the denial reason when the direct-match target is offline.
pub const DIRECT_MATCH_OFFLINE_ERROR: u32 = 42055;

/// Human readable text paired with `DIRECT_MATCH_OFFLINE_ERROR`.
pub const DIRECT_MATCH_OFFLINE_MESSAGE: &str = "Cannot battle with offline player.";

/// Top-level code of every `MatchmakingDenied` message.
pub const MATCHMAKING_DENIED_CODE: u32 = 16100;

/// Error number used when an accept refers to a proposal that no longer matches.
pub const DIRECT_MATCH_STALE_ERROR: u32 = 42056;

/// Number of players consumed by one pairing.
pub const PLAYERS_PER_MATCH: usize = 2;
