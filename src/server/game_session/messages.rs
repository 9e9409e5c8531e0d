//! In-match messages and the player setup message.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::game::store::{CardSource, RuleSet};
use crate::game::types::{Delta, OperationId, OperationStatus, SelectionView};
use crate::server::matchmaking::types::{GameMode, MatchId, PlayerId};

/// Deck as the client edits it: card name to number of copies.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeckList {
    pub id: String,
    pub name: String,
    pub cards: HashMap<String, u32>,
}

/// Cosmetics shown to the opponent. Slot name to item id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Outfit {
    pub items: BTreeMap<String, String>,
}

/// Identifies the player and carries what they will play with.
///
/// Every field is optional; only the ones present are applied.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(default, rename_all = "PascalCase")]
pub struct SupplementalData {
    pub player_id: Option<PlayerId>,
    pub current_region: Option<String>,
    pub deck_information: Option<DeckList>,
    pub outfit_information: Option<Outfit>,
    pub player_display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameMessageKind {
    MatchOperation,
    MatchInput,
    MatchInputUpdate,
    SendEmote,
    MatchReadyTimeout,
    OpponentMatchTimeout,
    OpponentOperationTimeout,
    ChangeCoinState,
    ChangeDeckOrder,
}

/// Envelope for everything a client sends while in a match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameMessage {
    pub message_type: GameMessageKind,
    /// Operation an input answers.
    pub operation_id: Option<OperationId>,
    pub payload: Vec<u8>,
}

/// Tells a client which match to join once paired.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinSession {
    pub region: Option<String>,
    pub match_id: MatchId,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDetails {
    pub player_id: PlayerId,
    pub display_name: String,
    pub seat: u8,
    pub deck_name: String,
    pub outfit: Outfit,
}

/// Everything a client needs to render the match before the first operation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub match_id: MatchId,
    pub game_mode: GameMode,
    pub players: Vec<PlayerDetails>,
    pub ready_up_timeout_secs: u32,
    pub feature_flags: BTreeMap<String, bool>,
    pub rules: RuleSet,
    pub cards: Vec<CardSource>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub status: OperationStatus,
    /// Index of the first delta in `deltas` within the whole operation.
    pub delta_index: usize,
    pub deltas: Vec<Delta>,
    pub is_input_update: bool,
    pub is_game_over: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum MatchMessageBody {
    OperationResult(OperationResult),
    Selection(SelectionView),
    Emote { from: PlayerId, emote: String },
}

/// Envelope for everything the server sends about a running match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchMessage {
    pub match_id: MatchId,
    pub operation_id: OperationId,
    pub body: MatchMessageBody,
}
