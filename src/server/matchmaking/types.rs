use serde::{Deserialize, Serialize};

/// Stable account identifier a client binds with its first `SupplementalData`.
pub type PlayerId = String;

/// Globally unique match identifier (UUID v4, hyphenated).
pub type MatchId = String;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum GameplayType {
    Casual,
    Ranked,
    Friend,
}

impl GameplayType {
    pub fn code(self) -> u16 {
        match self {
            GameplayType::Casual => 1,
            GameplayType::Ranked => 2,
            GameplayType::Friend => 3,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum GameMode {
    Standard,
    Expanded,
    Unlimited,
}

impl GameMode {
    pub fn code(self) -> u16 {
        match self {
            GameMode::Standard => 1,
            GameMode::Expanded => 2,
            GameMode::Unlimited => 3,
        }
    }
}

/// What a player asks for when entering a queue.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakingContext {
    pub gameplay_type: GameplayType,
    pub game_mode: GameMode,
}

/// Match options a direct-match proposer chooses for both sides.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchSharedContext {
    pub game_mode: GameMode,
    pub use_auto_select: bool,
    pub use_match_timer: bool,
    pub use_operation_timer: bool,
    /// Match clock in seconds.
    pub match_time: u32,
}

/// One entry of the online players listing.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct OnlinePlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub current_match: Option<MatchId>,
}
