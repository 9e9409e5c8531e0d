//! Coordinator errors and how the dispatch loop treats each of them.

use thiserror::Error;

use crate::game::EngineError;
use crate::server::connection::ConnectionId;
use crate::server::game_session::messages::GameMessageKind;
use crate::server::matchmaking::swimlane::SwimlaneError;
use crate::server::matchmaking::types::{GameMode, GameplayType, MatchId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The client broke the protocol; its connection is closed.
    ProtocolViolation,
    /// Normal in a live system; the client gets a `MatchmakingDenied`.
    ExpectedRuntimeCondition,
    /// The engine rejected an operation or could not open a match; reported only.
    EngineFailure,
    /// Server-side bug; reported and the connection is closed.
    InternalInvariantViolation,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot start or propose a game: {0} not sent yet")]
    SetupIncomplete(&'static str),
    #[error("player {0} is not online")]
    PlayerOffline(PlayerId),
    #[error("connection is bound to {bound}, refusing to rebind to {requested}")]
    DuplicateOrConflictingPlayerId { bound: PlayerId, requested: PlayerId },
    #[error("match {0} already has an operation in flight")]
    AlreadySendingOperation(MatchId),
    #[error("{0} cannot be handled here")]
    UnknownMessageType(&'static str),
    #[error("player is not in a match")]
    MatchNotFound,
    #[error("direct match invitation does not match the proposer's current proposal")]
    InvitationTokenMismatch,
    #[error("player {0} is already queued")]
    AlreadyQueued(PlayerId),
    #[error("no matchmaking lane for {gameplay_type:?} {mode:?}")]
    UnsupportedMode { gameplay_type: GameplayType, mode: GameMode },
    #[error("{0:?} is not allowed in a two-player match")]
    ForbiddenOperation(GameMessageKind),
    #[error("connection has not identified itself yet")]
    UnboundIdentity,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("deck holds {cards} cards, more than the {limit} allowed")]
    OversizedDeck { cards: u64, limit: u64 },
    #[error("engine rejected operation {operation_id} in match {match_id}")]
    EngineFailure { match_id: MatchId, operation_id: String },
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl CoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::PlayerOffline(_) | CoreError::InvitationTokenMismatch => ErrorClass::ExpectedRuntimeCondition,
            CoreError::EngineFailure { .. } | CoreError::Engine(_) => ErrorClass::EngineFailure,
            CoreError::UnknownConnection(_) => ErrorClass::InternalInvariantViolation,
            CoreError::SetupIncomplete(_)
            | CoreError::DuplicateOrConflictingPlayerId { .. }
            | CoreError::AlreadySendingOperation(_)
            | CoreError::UnknownMessageType(_)
            | CoreError::MatchNotFound
            | CoreError::AlreadyQueued(_)
            | CoreError::UnsupportedMode { .. }
            | CoreError::ForbiddenOperation(_)
            | CoreError::UnboundIdentity
            | CoreError::MalformedPayload(_)
            | CoreError::OversizedDeck { .. } => ErrorClass::ProtocolViolation,
        }
    }
}

impl From<SwimlaneError> for CoreError {
    fn from(err: SwimlaneError) -> Self {
        match err {
            SwimlaneError::AlreadyQueued(player_id) => CoreError::AlreadyQueued(player_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            CoreError::PlayerOffline("p".into()).class(),
            ErrorClass::ExpectedRuntimeCondition
        );
        assert_eq!(
            CoreError::InvitationTokenMismatch.class(),
            ErrorClass::ExpectedRuntimeCondition
        );
        assert_eq!(
            CoreError::AlreadySendingOperation("m".into()).class(),
            ErrorClass::ProtocolViolation
        );
        assert_eq!(
            CoreError::ForbiddenOperation(GameMessageKind::ChangeCoinState).class(),
            ErrorClass::ProtocolViolation
        );
        assert_eq!(
            CoreError::EngineFailure {
                match_id: "m".into(),
                operation_id: "o".into()
            }
            .class(),
            ErrorClass::EngineFailure
        );
        assert_eq!(
            CoreError::UnknownConnection(uuid::Uuid::nil()).class(),
            ErrorClass::InternalInvariantViolation
        );
        let bootstrap = EngineError::Bootstrap {
            match_id: "m".into(),
            reason: "no rules".into(),
        };
        assert_eq!(CoreError::from(bootstrap).class(), ErrorClass::EngineFailure);
        assert_eq!(
            CoreError::OversizedDeck { cards: 61, limit: 60 }.class(),
            ErrorClass::ProtocolViolation
        );
    }

    #[test]
    fn swimlane_duplicate_becomes_protocol_violation() {
        let err: CoreError = SwimlaneError::AlreadyQueued("p1".into()).into();
        assert!(matches!(err, CoreError::AlreadyQueued(ref p) if p == "p1"));
        assert_eq!(err.class(), ErrorClass::ProtocolViolation);
    }
}
