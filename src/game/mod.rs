//! Match engine boundary.
//!
//! The server never interprets game rules. It hands operations to a
//! `MatchEngine` and relays whatever deltas come back. Card and rule data come
//! from a `CardStore`; randomness comes from a `RandomSource`.

pub mod passthrough;
pub mod random;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod testing;

use thiserror::Error;

use crate::server::matchmaking::types::MatchId;
use types::{EngineOutcome, MatchSetup, Operation, SelectionView};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("match {match_id} could not be set up: {reason}")]
    Bootstrap { match_id: MatchId, reason: String },
}

/// One running match, owned by its session.
pub trait MatchEngine: Send {
    fn submit(&mut self, operation: Operation) -> EngineOutcome;

    /// Selection payload for `perspective`, when the engine is waiting for someone.
    fn selection_for(&self, perspective: &str) -> Option<SelectionView>;
}

/// Opens matches. The returned outcome is the bootstrap operation.
pub trait EngineFactory: Send {
    fn bootstrap(&self, setup: MatchSetup) -> Result<(Box<dyn MatchEngine>, EngineOutcome), EngineError>;
}
