//! One running match.

use std::collections::VecDeque;

use crate::config::game::OPERATION_HISTORY_DEPTH;
use crate::game::MatchEngine;
use crate::game::types::OperationId;
use crate::server::connection::ConnectionId;
use crate::server::error::CoreError;
use crate::server::matchmaking::types::{GameMode, MatchId, PlayerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub player_id: PlayerId,
    pub display_name: String,
    pub connection: ConnectionId,
}

/// How many deltas of an operation both players have already been sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub operation_id: OperationId,
    pub last_sent_delta_index: usize,
}

pub struct MatchSession {
    match_id: MatchId,
    mode: GameMode,
    seats: [Seat; 2],
    engine: Box<dyn MatchEngine>,
    /// Most recent operation last.
    operations: VecDeque<OperationRecord>,
    sending: bool,
}

impl MatchSession {
    pub fn new(match_id: MatchId, mode: GameMode, seats: [Seat; 2], engine: Box<dyn MatchEngine>) -> Self {
        Self {
            match_id,
            mode,
            seats,
            engine,
            operations: VecDeque::with_capacity(OPERATION_HISTORY_DEPTH + 1),
            sending: false,
        }
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn seats(&self) -> &[Seat; 2] {
        &self.seats
    }

    pub fn opponent_of(&self, player_id: &str) -> Option<&Seat> {
        let idx = self.seats.iter().position(|s| s.player_id == player_id)?;
        self.seats.get(1 - idx)
    }

    pub fn engine(&self) -> &dyn MatchEngine {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn MatchEngine {
        self.engine.as_mut()
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Claim the session for one operation. Fails without side effects if one is already in flight.
    pub fn begin_operation(&mut self) -> Result<(), CoreError> {
        if self.sending {
            return Err(CoreError::AlreadySendingOperation(self.match_id.clone()));
        }
        self.sending = true;
        Ok(())
    }

    pub fn finish_operation(&mut self) {
        self.sending = false;
    }

    #[cfg(test)]
    pub fn current_operation(&self) -> Option<&OperationRecord> {
        self.operations.back()
    }

    /// Deltas of `operation_id` already sent; 0 for an operation not seen before.
    pub fn sent_delta_index(&self, operation_id: &str) -> usize {
        self.operations
            .iter()
            .find(|r| r.operation_id == operation_id)
            .map_or(0, |r| r.last_sent_delta_index)
    }

    /// Advance the high-water mark of `operation_id`, starting a new record if needed.
    pub fn record_sent(&mut self, operation_id: &str, delta_index: usize) {
        if let Some(record) = self.operations.iter_mut().find(|r| r.operation_id == operation_id) {
            record.last_sent_delta_index = record.last_sent_delta_index.max(delta_index);
            return;
        }
        self.operations.push_back(OperationRecord {
            operation_id: operation_id.to_string(),
            last_sent_delta_index: delta_index,
        });
        while self.operations.len() > OPERATION_HISTORY_DEPTH {
            self.operations.pop_front();
        }
    }
}
