//! Fans an engine outcome out to both seats.
//!
//! Outcomes carry every delta of their operation produced so far; only the
//! ones past the session's high-water mark are sent.

use log::{debug, error};

use super::messages::{MatchMessage, MatchMessageBody, OperationResult};
use super::server::GameServerCore;
use crate::game::types::{EngineOutcome, OperationStatus};
use crate::server::error::CoreError;
use crate::server::stomp::ServerMessage;

pub fn resolve_operation(
    core: &mut GameServerCore,
    match_id: &str,
    outcome: EngineOutcome,
    is_input_update: bool,
) -> Result<(), CoreError> {
    if outcome.status == OperationStatus::Error {
        error!(
            "[GameServer] Engine rejected operation {} in match {}",
            outcome.operation_id, match_id
        );
        return Err(CoreError::EngineFailure {
            match_id: match_id.to_string(),
            operation_id: outcome.operation_id,
        });
    }

    let session = core.matches.get(match_id).ok_or(CoreError::MatchNotFound)?;
    let total = outcome.deltas.len();
    let delta_index = session.sent_delta_index(&outcome.operation_id).min(total);
    let result = OperationResult {
        status: outcome.status,
        delta_index,
        deltas: outcome.deltas[delta_index..].to_vec(),
        is_input_update,
        is_game_over: outcome.is_game_over,
    };
    let seats: Vec<_> = session
        .seats()
        .iter()
        .map(|seat| (seat.connection, seat.player_id.clone()))
        .collect();
    let message = |body: MatchMessageBody| {
        ServerMessage::Match(MatchMessage {
            match_id: match_id.to_string(),
            operation_id: outcome.operation_id.clone(),
            body,
        })
    };

    debug!(
        "[GameServer] Match {} operation {}: {:?}, deltas {}..{}",
        match_id, outcome.operation_id, outcome.status, delta_index, total
    );
    match outcome.status {
        OperationStatus::WaitingForInput => {
            // Each side gets its own view of the pending selection.
            let selections: Vec<_> = seats
                .iter()
                .map(|(_, player_id)| session.engine().selection_for(player_id))
                .collect();
            for ((connection, _), selection) in seats.iter().zip(selections) {
                core.send_to(*connection, message(MatchMessageBody::OperationResult(result.clone())));
                if let Some(selection) = selection {
                    core.send_to(*connection, message(MatchMessageBody::Selection(selection)));
                }
            }
        }
        _ => {
            let connections: Vec<_> = seats.iter().map(|(connection, _)| *connection).collect();
            core.send_to_all(&connections, message(MatchMessageBody::OperationResult(result)));
        }
    }

    if let Some(session) = core.matches.get_mut(match_id) {
        session.record_sent(&outcome.operation_id, total);
    }
    if outcome.is_game_over {
        core.end_match(match_id);
    }
    Ok(())
}
