use std::collections::HashSet;

use crate::config::game::UNNAMED_PLAYER;
use crate::server::connection::ConnectionHandle;
use crate::server::error::CoreError;
use crate::server::game_session::messages::{DeckList, Outfit};
use crate::server::matchmaking::types::{MatchId, PlayerId};

/// A direct match this player proposed and the target has not answered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundProposal {
    pub target: PlayerId,
    pub token: String,
    pub transaction_id: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirectMatchState {
    pub outbound: Option<OutboundProposal>,
    /// Players whose proposal to us is pending.
    pub inbound: HashSet<PlayerId>,
}

/// Everything the server knows about one connection.
///
/// The player id is bound once by the first `SupplementalData` carrying it and
/// never changes afterwards.
pub struct PlayerIdentity {
    pub connection: ConnectionHandle,
    pub player_id: Option<PlayerId>,
    pub display_name: Option<String>,
    pub region: Option<String>,
    pub deck: Option<DeckList>,
    pub outfit: Option<Outfit>,
    pub current_match: Option<MatchId>,
    pub direct: DirectMatchState,
}

impl PlayerIdentity {
    pub fn new(connection: ConnectionHandle) -> Self {
        Self {
            connection,
            player_id: None,
            display_name: None,
            region: None,
            deck: None,
            outfit: None,
            current_match: None,
            direct: DirectMatchState::default(),
        }
    }

    pub fn bound_player_id(&self) -> Result<&PlayerId, CoreError> {
        self.player_id.as_ref().ok_or(CoreError::UnboundIdentity)
    }

    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.player_id.as_deref())
            .unwrap_or(UNNAMED_PLAYER)
    }

    /// A player may only queue, propose or accept once identified with a deck and an outfit.
    pub fn ensure_ready_for_match(&self) -> Result<(), CoreError> {
        self.bound_player_id()?;
        if self.deck.is_none() {
            return Err(CoreError::SetupIncomplete("decklist"));
        }
        if self.outfit.is_none() {
            return Err(CoreError::SetupIncomplete("player outfit"));
        }
        Ok(())
    }
}
