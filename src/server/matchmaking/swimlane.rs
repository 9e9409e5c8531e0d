//! FIFO matchmaking lanes.
//!
//! A lane holds the players waiting for one (gameplay type, mode) pair. As soon
//! as two are waiting they leave the lane together as a `Pairing`, oldest first.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use log::{debug, info};
use thiserror::Error;

use super::types::{GameMode, GameplayType, MatchmakingContext, PlayerId};
use crate::config::matchmaking::PLAYERS_PER_MATCH;
use crate::server::connection::ConnectionId;

/// Gameplay type in the high 16 bits, mode in the low 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneKey(u32);

impl LaneKey {
    pub fn new(gameplay_type: GameplayType, mode: GameMode) -> Self {
        Self((u32::from(gameplay_type.code()) << 16) | u32::from(mode.code()))
    }

    pub fn for_context(context: &MatchmakingContext) -> Self {
        Self::new(context.gameplay_type, context.game_mode)
    }
}

impl fmt::Display for LaneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedPlayer {
    pub connection: ConnectionId,
    pub player_id: PlayerId,
    /// Transaction of the `BeginMatchmaking` that queued the player.
    pub txid: u64,
}

/// Two players taken off a lane, in queue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub lane: LaneKey,
    pub first: QueuedPlayer,
    pub second: QueuedPlayer,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwimlaneError {
    #[error("player {0} is already queued")]
    AlreadyQueued(PlayerId),
}

#[derive(Debug)]
pub struct Swimlane {
    key: LaneKey,
    queue: VecDeque<QueuedPlayer>,
}

impl Swimlane {
    pub fn new(gameplay_type: GameplayType, game_mode: GameMode) -> Self {
        Self {
            key: LaneKey::new(gameplay_type, game_mode),
            queue: VecDeque::with_capacity(PLAYERS_PER_MATCH),
        }
    }

    pub fn key(&self) -> LaneKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.queue.iter().any(|p| p.connection == connection)
    }

    /// Queue a player. Returns the pairing when this entry completes one.
    pub fn enqueue(&mut self, entry: QueuedPlayer) -> Result<Option<Pairing>, SwimlaneError> {
        let duplicate = self
            .queue
            .iter()
            .any(|p| p.connection == entry.connection || p.player_id == entry.player_id);
        if duplicate {
            return Err(SwimlaneError::AlreadyQueued(entry.player_id));
        }

        debug!("[Matchmaking] {} joined lane {}", entry.player_id, self.key);
        self.queue.push_back(entry);

        if self.queue.len() < PLAYERS_PER_MATCH {
            return Ok(None);
        }
        match (self.queue.pop_front(), self.queue.pop_front()) {
            (Some(first), Some(second)) => {
                info!(
                    "[Matchmaking] Paired {} with {} on lane {}",
                    first.player_id, second.player_id, self.key
                );
                Ok(Some(Pairing {
                    lane: self.key,
                    first,
                    second,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Take a connection out of the lane. Returns whether it was queued.
    pub fn remove(&mut self, connection: ConnectionId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|p| p.connection != connection);
        before != self.queue.len()
    }
}

/// Lanes open at startup: casual standard and casual expanded.
pub fn default_lanes() -> HashMap<LaneKey, Swimlane> {
    [GameMode::Standard, GameMode::Expanded]
        .into_iter()
        .map(|mode| {
            let lane = Swimlane::new(GameplayType::Casual, mode);
            (lane.key(), lane)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn player(name: &str) -> QueuedPlayer {
        QueuedPlayer {
            connection: Uuid::new_v4(),
            player_id: name.to_string(),
            txid: 1,
        }
    }

    fn lane() -> Swimlane {
        Swimlane::new(GameplayType::Casual, GameMode::Standard)
    }

    #[test]
    fn pairs_the_two_oldest_in_order() {
        let mut lane = lane();
        let (a, b, c) = (player("a"), player("b"), player("c"));

        assert_eq!(lane.enqueue(a.clone()).unwrap(), None);
        let pairing = lane.enqueue(b.clone()).unwrap().unwrap();
        assert_eq!(pairing.first, a);
        assert_eq!(pairing.second, b);
        assert_eq!(pairing.lane, lane.key());
        assert!(lane.is_empty());

        assert_eq!(lane.enqueue(c.clone()).unwrap(), None);
        assert_eq!(lane.len(), 1);
        assert!(lane.contains(c.connection));
    }

    #[test]
    fn fifo_over_many_players() {
        let mut lane = lane();
        let players: Vec<_> = (0..6).map(|i| player(&format!("p{i}"))).collect();
        let pairings: Vec<_> = players
            .iter()
            .filter_map(|p| lane.enqueue(p.clone()).unwrap())
            .collect();

        assert_eq!(pairings.len(), 3);
        for (i, pairing) in pairings.iter().enumerate() {
            assert_eq!(pairing.first, players[2 * i]);
            assert_eq!(pairing.second, players[2 * i + 1]);
        }
    }

    #[test]
    fn rejects_same_connection_or_same_player() {
        let mut lane = lane();
        let a = player("a");
        lane.enqueue(a.clone()).unwrap();

        assert_eq!(
            lane.enqueue(a.clone()),
            Err(SwimlaneError::AlreadyQueued("a".to_string()))
        );

        let same_player_new_connection = player("a");
        assert!(lane.enqueue(same_player_new_connection).is_err());

        let same_connection_other_id = QueuedPlayer {
            connection: a.connection,
            player_id: "z".to_string(),
            txid: 2,
        };
        assert!(lane.enqueue(same_connection_other_id).is_err());
        assert_eq!(lane.len(), 1);
    }

    #[test]
    fn remove_is_idempotent_and_keeps_order() {
        let mut lane = Swimlane {
            queue: VecDeque::new(),
            ..lane()
        };
        let (a, b) = (player("a"), player("b"));
        lane.queue.extend([a.clone(), b.clone(), player("c")]);

        assert!(lane.remove(b.connection));
        assert!(!lane.remove(b.connection));
        assert!(!lane.remove(Uuid::new_v4()));
        let order: Vec<_> = lane.queue.iter().map(|p| p.player_id.as_str()).collect();
        assert_eq!(order, ["a", "c"]);
        assert!(lane.contains(a.connection));
    }

    #[test]
    fn removing_from_an_empty_lane_is_a_no_op() {
        let mut lane = lane();
        assert!(!lane.remove(Uuid::new_v4()));
        assert!(lane.is_empty());
    }

    #[test]
    fn lane_keys_pack_type_and_mode() {
        let standard = LaneKey::new(GameplayType::Casual, GameMode::Standard);
        let expanded = LaneKey::new(GameplayType::Casual, GameMode::Expanded);
        assert_ne!(standard, expanded);
        assert_eq!(standard.0, (1 << 16) | 1);

        let lanes = default_lanes();
        assert_eq!(lanes.len(), 2);
        assert!(lanes.contains_key(&standard));
        assert!(lanes.contains_key(&expanded));
        assert!(!lanes.contains_key(&LaneKey::new(GameplayType::Ranked, GameMode::Standard)));
    }
}
