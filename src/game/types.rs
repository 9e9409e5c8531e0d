use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::game::store::RuleSet;
use crate::server::matchmaking::types::{GameMode, MatchId, PlayerId};

pub type OperationId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationStatus {
    Error,
    WaitingForInput,
    Resolved,
}

/// One state change produced by the engine. Opaque to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub kind: String,
    pub data: Vec<u8>,
}

impl Delta {
    pub fn new(kind: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: kind.to_string(),
            data: data.into(),
        }
    }
}

/// What a player sees while the engine waits for a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionView {
    /// The player who must choose gets the full selection detail.
    Own { player_id: PlayerId, detail: Vec<u8> },
    /// The other player only learns who is choosing.
    Opponent {
        player_id: PlayerId,
        acting_player: PlayerId,
        summary: Vec<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Action,
    Input,
    InputUpdate,
    /// Server-originated: `origin` forfeits.
    ForceQuit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Operation being answered, for inputs.
    pub operation_id: Option<OperationId>,
    pub origin: PlayerId,
    pub kind: OperationKind,
    pub payload: Vec<u8>,
}

impl Operation {
    pub fn force_quit(player_id: &str) -> Self {
        Self {
            operation_id: None,
            origin: player_id.to_string(),
            kind: OperationKind::ForceQuit,
            payload: Vec::new(),
        }
    }
}

/// Result of feeding one operation to the engine.
///
/// `deltas` holds every delta of `operation_id` produced so far; the server
/// forwards only the ones it has not sent yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    pub operation_id: OperationId,
    pub status: OperationStatus,
    pub deltas: Vec<Delta>,
    pub is_game_over: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatSetup {
    pub player_id: PlayerId,
    pub display_name: String,
    /// One entry per copy, in deck order.
    pub decklist: Vec<String>,
}

/// Everything an engine needs to open a match. Seat 0 is the first player.
#[derive(Debug, Clone)]
pub struct MatchSetup {
    pub match_id: MatchId,
    pub mode: GameMode,
    pub seats: [SeatSetup; 2],
    pub rules: Arc<RuleSet>,
    pub feature_flags: BTreeMap<String, bool>,
    pub rng_seed: u64,
}
