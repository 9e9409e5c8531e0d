//! Rules-free engine.
//!
//! Turns every operation into deltas without validating it. Seat 0 is asked
//! for the opening input; after that either player may act whenever nobody is
//! being waited on. A `ForceQuit`, or an action whose payload is
//! `CONCEDE_ACTION`, ends the match in favour of the other seat.

use log::debug;

use crate::game::types::{
    Delta, EngineOutcome, MatchSetup, Operation, OperationId, OperationKind, OperationStatus, SelectionView,
};
use crate::game::{EngineError, EngineFactory, MatchEngine};
use crate::server::matchmaking::types::{MatchId, PlayerId};

pub const CONCEDE_ACTION: &[u8] = b"concede";

#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughEngineFactory;

impl EngineFactory for PassthroughEngineFactory {
    fn bootstrap(&self, setup: MatchSetup) -> Result<(Box<dyn MatchEngine>, EngineOutcome), EngineError> {
        let [first, second] = &setup.seats;
        if first.player_id == second.player_id {
            return Err(EngineError::Bootstrap {
                match_id: setup.match_id.clone(),
                reason: format!("{} cannot play against themselves", first.player_id),
            });
        }

        let mut engine = PassthroughEngine {
            match_id: setup.match_id.clone(),
            seats: [first.player_id.clone(), second.player_id.clone()],
            sequence: 0,
            current: OperationId::new(),
            deltas: Vec::new(),
            awaiting: None,
            game_over: false,
        };

        let summary = format!(
            "{}:{},{}:{}",
            first.player_id,
            first.decklist.len(),
            second.player_id,
            second.decklist.len()
        );
        engine.start_operation(Delta::new("MatchStarted", summary));
        engine.awaiting = Some(engine.seats[0].clone());
        debug!("[Passthrough] Match {} opened, waiting on {}", engine.match_id, engine.seats[0]);

        let outcome = engine.outcome(OperationStatus::WaitingForInput);
        Ok((Box::new(engine), outcome))
    }
}

pub struct PassthroughEngine {
    match_id: MatchId,
    seats: [PlayerId; 2],
    sequence: u64,
    current: OperationId,
    deltas: Vec<Delta>,
    awaiting: Option<PlayerId>,
    game_over: bool,
}

impl PassthroughEngine {
    fn start_operation(&mut self, first: Delta) {
        self.sequence += 1;
        self.current = format!("{}-{}", self.match_id, self.sequence);
        self.deltas = vec![first];
    }

    fn outcome(&self, status: OperationStatus) -> EngineOutcome {
        EngineOutcome {
            operation_id: self.current.clone(),
            status,
            deltas: self.deltas.clone(),
            is_game_over: self.game_over,
        }
    }

    fn opponent_of(&self, player_id: &str) -> Option<&PlayerId> {
        match self.seats.iter().position(|seat| seat == player_id) {
            Some(idx) => self.seats.get(1 - idx),
            None => None,
        }
    }

    fn finish(&mut self, loser: &str) -> EngineOutcome {
        let winner = self.opponent_of(loser).cloned().unwrap_or_default();
        self.start_operation(Delta::new("PlayerLost", loser));
        self.deltas.push(Delta::new("GameOver", winner));
        self.awaiting = None;
        self.game_over = true;
        self.outcome(OperationStatus::Resolved)
    }
}

impl MatchEngine for PassthroughEngine {
    fn submit(&mut self, operation: Operation) -> EngineOutcome {
        if self.game_over || self.opponent_of(&operation.origin).is_none() {
            return self.outcome(OperationStatus::Error);
        }

        match operation.kind {
            OperationKind::ForceQuit => self.finish(&operation.origin),
            OperationKind::Input | OperationKind::InputUpdate => {
                let answers_current = operation
                    .operation_id
                    .as_ref()
                    .is_none_or(|id| *id == self.current);
                if self.awaiting.as_deref() != Some(operation.origin.as_str()) || !answers_current {
                    return self.outcome(OperationStatus::Error);
                }
                self.deltas.push(Delta::new("Input", operation.payload));
                if operation.kind == OperationKind::Input {
                    self.awaiting = None;
                    self.outcome(OperationStatus::Resolved)
                } else {
                    self.outcome(OperationStatus::WaitingForInput)
                }
            }
            OperationKind::Action => {
                if self.awaiting.is_some() {
                    return self.outcome(OperationStatus::Error);
                }
                if operation.payload == CONCEDE_ACTION {
                    return self.finish(&operation.origin);
                }
                self.start_operation(Delta::new("Action", operation.payload));
                self.outcome(OperationStatus::Resolved)
            }
        }
    }

    fn selection_for(&self, perspective: &str) -> Option<SelectionView> {
        let acting = self.awaiting.as_ref()?;
        if acting == perspective {
            Some(SelectionView::Own {
                player_id: perspective.to_string(),
                detail: self.current.clone().into_bytes(),
            })
        } else {
            Some(SelectionView::Opponent {
                player_id: perspective.to_string(),
                acting_player: acting.clone(),
                summary: Vec::new(),
            })
        }
    }
}
