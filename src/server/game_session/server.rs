//! Game server core: the single owner of every directory.
//!
//! Holds the identities of all connections, the online player directory, the
//! matchmaking lanes and the running matches. Only the dispatch loop calls
//! into it, so nothing here is locked.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, error, info, warn};
use uuid::Uuid;

use super::deck::{flatten_decklist, validate_deck};
use super::messages::{
    GameMessage, GameMessageKind, JoinSession, MatchMessage, MatchMessageBody, PlayerDetails, SessionCreated,
    SupplementalData,
};
use super::operation_resolution::resolve_operation;
use super::player::{OutboundProposal, PlayerIdentity};
use super::player_order::PlayerOrderPolicy;
use super::session::{MatchSession, Seat};
use crate::config::game::IMPLEMENTED_CARDS_DISABLED;
use crate::config::matchmaking::{DIRECT_MATCH_OFFLINE_ERROR, DIRECT_MATCH_OFFLINE_MESSAGE};
use crate::config::settings::ServerSettings;
use crate::game::EngineFactory;
use crate::game::random::RandomSource;
use crate::game::store::{CardManifest, SharedCaches};
use crate::game::types::{MatchSetup, Operation, OperationKind, SeatSetup};
use crate::server::connection::{ConnectionHandle, ConnectionId, PreparedFrame, send_message};
use crate::server::error::CoreError;
use crate::server::matchmaking::messages::{
    AcceptDirectMatch, BeginMatchmaking, DirectMatchCancelled, DirectMatchInvitation, GetOnlineFriends,
    MatchmakingCancelled, OnlineFriendsResponse, ProposeDirectMatch, SignedMatchContext,
};
use crate::server::matchmaking::swimlane::{LaneKey, QueuedPlayer, Swimlane, default_lanes};
use crate::server::matchmaking::types::{GameMode, MatchId, OnlinePlayerInfo, PlayerId};
use crate::server::stomp::catalog::{GetImplementedExpandedCardsV1, ImplementedExpandedCardsV1, OnlinePlayersResponse};
use crate::server::stomp::{ClientMessage, ServerMessage, WireFormat};
use crate::server::ws_error::matchmaking_denied;

pub struct GameServerCore {
    settings: Arc<ServerSettings>,
    caches: Arc<SharedCaches>,
    card_manifest: CardManifest,
    engines: Box<dyn EngineFactory>,
    random: Box<dyn RandomSource>,
    order_policy: PlayerOrderPolicy,
    identities: HashMap<ConnectionId, PlayerIdentity>,
    online: HashMap<PlayerId, ConnectionId>,
    pub(super) matches: HashMap<MatchId, MatchSession>,
    lanes: HashMap<LaneKey, Swimlane>,
}

impl GameServerCore {
    pub fn new(
        settings: Arc<ServerSettings>,
        caches: Arc<SharedCaches>,
        engines: Box<dyn EngineFactory>,
        random: Box<dyn RandomSource>,
    ) -> Self {
        let card_manifest = if settings.enable_reporting_all_implemented_cards {
            CardManifest::from_names(caches.card_names())
        } else {
            CardManifest::from_names([IMPLEMENTED_CARDS_DISABLED])
        };
        Self {
            order_policy: PlayerOrderPolicy::from_settings(&settings),
            card_manifest,
            settings,
            caches,
            engines,
            random,
            identities: HashMap::new(),
            online: HashMap::new(),
            matches: HashMap::new(),
            lanes: default_lanes(),
        }
    }

    // Connections

    pub fn register_connection(&mut self, connection: ConnectionHandle) {
        let id = connection.id();
        debug!("[GameServer] Connection {} registered", id);
        self.identities.insert(id, PlayerIdentity::new(connection));
    }

    /// Purge the player behind `connection` and forget the connection.
    pub fn unregister_connection(&mut self, connection: ConnectionId) -> Result<(), CoreError> {
        let result = self.purge_player(connection);
        self.identities.remove(&connection);
        debug!("[GameServer] Connection {} unregistered", connection);
        result
    }

    #[cfg(test)]
    pub fn is_registered(&self, connection: ConnectionId) -> bool {
        self.identities.contains_key(&connection)
    }

    #[cfg(test)]
    pub fn player(&self, connection: ConnectionId) -> Option<&PlayerIdentity> {
        self.identities.get(&connection)
    }

    pub fn online_connection(&self, player_id: &str) -> Option<ConnectionId> {
        self.online.get(player_id).copied()
    }

    #[cfg(test)]
    pub fn match_session(&self, match_id: &str) -> Option<&MatchSession> {
        self.matches.get(match_id)
    }

    #[cfg(test)]
    pub fn match_session_mut(&mut self, match_id: &str) -> Option<&mut MatchSession> {
        self.matches.get_mut(match_id)
    }

    #[cfg(test)]
    pub fn lane_len(&self, gameplay_type: crate::server::matchmaking::types::GameplayType, mode: GameMode) -> usize {
        self.lanes.get(&LaneKey::new(gameplay_type, mode)).map_or(0, Swimlane::len)
    }

    fn identity(&self, connection: ConnectionId) -> Result<&PlayerIdentity, CoreError> {
        self.identities
            .get(&connection)
            .ok_or(CoreError::UnknownConnection(connection))
    }

    fn identity_mut(&mut self, connection: ConnectionId) -> Result<&mut PlayerIdentity, CoreError> {
        self.identities
            .get_mut(&connection)
            .ok_or(CoreError::UnknownConnection(connection))
    }

    // Outbound

    /// Match traffic goes out binary unless JSON is forced; everything else is JSON.
    pub(super) fn format_for(&self, message: &ServerMessage) -> WireFormat {
        if self.settings.force_json_for_all_sent_messages {
            return WireFormat::Json;
        }
        match message {
            ServerMessage::Match(_) | ServerMessage::SessionCreated(_) => WireFormat::Binary,
            _ => WireFormat::Json,
        }
    }

    pub(super) fn send_to(&self, connection: ConnectionId, message: ServerMessage) {
        match self.identities.get(&connection) {
            Some(identity) => {
                let format = self.format_for(&message);
                send_message(identity.connection.as_ref(), message, format);
            }
            None => debug!(
                "[GameServer] Dropping {} for unknown connection {}",
                message.payload_type(),
                connection
            ),
        }
    }

    /// Encode once and queue the same bytes on every connection.
    pub(super) fn send_to_all(&self, connections: &[ConnectionId], message: ServerMessage) {
        let payload_type = message.payload_type();
        let format = self.format_for(&message);
        let frame = match PreparedFrame::prepare(message, format) {
            Ok(frame) => frame,
            Err(e) => {
                error!("[GameServer] Failed to encode {}: {}", payload_type, e);
                return;
            }
        };
        for connection in connections {
            if let Some(identity) = self.identities.get(connection) {
                identity.connection.enqueue_send(frame.clone());
            }
        }
    }

    // Identity

    /// Apply a `SupplementalData`. The player id binds once; a live connection
    /// already holding the same id is dropped in favour of this one.
    pub fn handle_supplemental_data(&mut self, connection: ConnectionId, data: SupplementalData) -> Result<(), CoreError> {
        let identity = self.identity(connection)?;
        if let Some(deck) = &data.deck_information {
            validate_deck(deck)?;
        }
        let newly_bound = match (&identity.player_id, data.player_id) {
            (_, None) => None,
            (Some(bound), Some(requested)) if *bound == requested => None,
            (Some(bound), Some(requested)) => {
                return Err(CoreError::DuplicateOrConflictingPlayerId {
                    bound: bound.clone(),
                    requested,
                });
            }
            (None, Some(requested)) => Some(requested),
        };

        if let Some(player_id) = &newly_bound {
            if let Some(stale) = self.online.get(player_id).copied() {
                self.trample(stale, player_id);
            }
            self.online.insert(player_id.clone(), connection);
            info!("[GameServer] {} is online on {}", player_id, connection);
        }

        let identity = self.identity_mut(connection)?;
        if newly_bound.is_some() {
            identity.player_id = newly_bound;
        }
        if let Some(region) = data.current_region {
            identity.region = Some(region);
        }
        if let Some(name) = data.player_display_name {
            identity.display_name = Some(name);
        }
        if let Some(deck) = data.deck_information {
            identity.deck = Some(deck);
        }
        if let Some(outfit) = data.outfit_information {
            identity.outfit = Some(outfit);
        }
        Ok(())
    }

    fn trample(&mut self, stale: ConnectionId, player_id: &str) {
        warn!(
            "[GameServer] {} connected again; dropping older connection {}",
            player_id, stale
        );
        if let Err(e) = self.purge_player(stale) {
            error!("[GameServer] Purging {} failed: {}", stale, e);
        }
        if let Some(identity) = self.identities.get_mut(&stale) {
            identity.player_id = None;
            identity.connection.disconnect_immediately();
        }
    }

    // Protocol messages

    pub fn handle_protocol_message(&mut self, connection: ConnectionId, message: ClientMessage) -> Result<(), CoreError> {
        match message {
            ClientMessage::SupplementalData(data) => self.handle_supplemental_data(connection, data),
            ClientMessage::BeginMatchmaking(request) => self.begin_matchmaking(connection, request),
            ClientMessage::CancelMatchmaking(request) => {
                self.identity(connection)?;
                self.remove_from_all_matchmaking(connection);
                self.send_to(
                    connection,
                    ServerMessage::MatchmakingCancelled(MatchmakingCancelled { txid: request.txid }),
                );
                Ok(())
            }
            ClientMessage::ProposeDirectMatch(request) => self.propose_direct_match(connection, request),
            ClientMessage::CancelDirectMatch(request) => {
                self.identity(connection)?;
                let txid = self
                    .withdraw_proposal(connection)
                    .map_or(request.txid, |p| p.transaction_id);
                self.send_to(
                    connection,
                    ServerMessage::MatchmakingCancelled(MatchmakingCancelled { txid }),
                );
                Ok(())
            }
            ClientMessage::AcceptDirectMatch(request) => self.accept_direct_match(connection, request),
            ClientMessage::GetOnlineFriends(request) => self.handle_get_online_friends(connection, request),
            ClientMessage::GetImplementedCards(request) => self.handle_get_implemented_cards(connection, request),
            ClientMessage::Game(message) => self.handle_game_message(connection, message),
            other @ (ClientMessage::Heartbeat(_) | ClientMessage::Query(_)) => {
                Err(CoreError::UnknownMessageType(other.payload_type()))
            }
        }
    }

    fn begin_matchmaking(&mut self, connection: ConnectionId, request: BeginMatchmaking) -> Result<(), CoreError> {
        let identity = self.identity(connection)?;
        identity.ensure_ready_for_match()?;
        let player_id = identity.bound_player_id()?.clone();

        let context = request.context;
        let lane = self
            .lanes
            .get_mut(&LaneKey::for_context(&context))
            .ok_or(CoreError::UnsupportedMode {
                gameplay_type: context.gameplay_type,
                mode: context.game_mode,
            })?;

        let pairing = lane.enqueue(QueuedPlayer {
            connection,
            player_id,
            txid: request.txid,
        })?;
        match pairing {
            Some(pairing) => {
                debug!("[Matchmaking] Opening match for lane {}", pairing.lane);
                let (first, second) = (&pairing.first, &pairing.second);
                if let Err(e) = self.start_session(first.connection, second.connection, context.game_mode) {
                    self.release_unstarted([(first.connection, first.txid), (second.connection, second.txid)]);
                    return Err(e);
                }
            }
            None => debug!("[Matchmaking] {} waiting on lane {}", lane.len(), lane.key()),
        }
        Ok(())
    }

    /// Tell players whose match could not be opened that they are no longer matchmaking.
    fn release_unstarted(&mut self, players: [(ConnectionId, u64); 2]) {
        for (connection, txid) in players {
            let in_match = self
                .identities
                .get(&connection)
                .is_some_and(|identity| identity.current_match.is_some());
            if in_match {
                continue;
            }
            warn!("[Matchmaking] Match for {} could not be opened", connection);
            self.send_to(connection, ServerMessage::MatchmakingCancelled(MatchmakingCancelled { txid }));
        }
    }

    fn propose_direct_match(&mut self, connection: ConnectionId, request: ProposeDirectMatch) -> Result<(), CoreError> {
        let proposer = self.identity(connection)?;
        proposer.ensure_ready_for_match()?;
        let proposer_id = proposer.bound_player_id()?.clone();
        let proposer_name = proposer.display_name().to_string();

        let target = self
            .online_connection(&request.target_account_id)
            .filter(|target| *target != connection);
        let Some(target) = target else {
            warn!(
                "[Matchmaking] {} proposed a match to offline player {}",
                proposer_id, request.target_account_id
            );
            self.remove_from_all_matchmaking(connection);
            let denial = matchmaking_denied(request.txid, DIRECT_MATCH_OFFLINE_ERROR, DIRECT_MATCH_OFFLINE_MESSAGE);
            self.send_to(connection, ServerMessage::MatchmakingDenied(denial));
            return Ok(());
        };

        self.withdraw_proposal(connection);

        let token = Uuid::new_v4().to_string();
        let issued_at = crate::server::unix_millis();
        self.identity_mut(connection)?.direct.outbound = Some(OutboundProposal {
            target: request.target_account_id.clone(),
            token: token.clone(),
            transaction_id: request.txid,
        });
        self.identity_mut(target)?.direct.inbound.insert(proposer_id.clone());

        info!(
            "[Matchmaking] {} proposed a direct match to {}",
            proposer_id, request.target_account_id
        );
        self.send_to(
            connection,
            ServerMessage::SignedMatchContext(SignedMatchContext {
                txid: request.txid,
                mm_token: token.clone(),
                issued_at,
            }),
        );
        self.send_to(
            target,
            ServerMessage::DirectMatchInvitation(DirectMatchInvitation {
                source_account_id: proposer_id,
                source_display_name: proposer_name,
                mm_token: token,
                transaction_id: request.txid,
                issued_at,
                shared_context: request.context,
            }),
        );
        Ok(())
    }

    fn accept_direct_match(&mut self, connection: ConnectionId, request: AcceptDirectMatch) -> Result<(), CoreError> {
        let accepter = self.identity(connection)?;
        accepter.ensure_ready_for_match()?;
        let accepter_id = accepter.bound_player_id()?.clone();

        let invitation = request.invitation;
        let initiator = self
            .online_connection(&invitation.source_account_id)
            .ok_or_else(|| CoreError::PlayerOffline(invitation.source_account_id.clone()))?;
        let proposal_matches = self.identity(initiator)?.direct.outbound.as_ref().is_some_and(|p| {
            p.target == accepter_id && p.token == invitation.mm_token && p.transaction_id == invitation.transaction_id
        });
        if !proposal_matches {
            return Err(CoreError::InvitationTokenMismatch);
        }

        self.identity_mut(initiator)?.direct.outbound = None;
        self.identity_mut(connection)?
            .direct
            .inbound
            .remove(&invitation.source_account_id);

        info!(
            "[Matchmaking] {} accepted the direct match from {}",
            accepter_id, invitation.source_account_id
        );
        if let Err(e) = self.start_session(initiator, connection, invitation.shared_context.game_mode) {
            self.release_unstarted([(initiator, invitation.transaction_id), (connection, request.txid)]);
            return Err(e);
        }
        Ok(())
    }

    /// Withdraw `proposer`'s outbound proposal and tell every holder it is gone.
    fn withdraw_proposal(&mut self, proposer: ConnectionId) -> Option<OutboundProposal> {
        let identity = self.identities.get_mut(&proposer)?;
        let proposal = identity.direct.outbound.take()?;
        let proposer_id = identity.player_id.clone()?;

        let holders: Vec<ConnectionId> = self
            .identities
            .iter_mut()
            .filter_map(|(id, identity)| identity.direct.inbound.remove(&proposer_id).then_some(*id))
            .collect();
        for holder in holders {
            self.send_to(
                holder,
                ServerMessage::DirectMatchCancelled(DirectMatchCancelled {
                    mm_token: proposal.token.clone(),
                }),
            );
        }
        debug!("[Matchmaking] Proposal from {} withdrawn", proposer_id);
        Some(proposal)
    }

    /// Withdraw a proposal the proposer did not cancel themselves, and tell them.
    fn cancel_proposal_of(&mut self, proposer: ConnectionId) {
        if let Some(proposal) = self.withdraw_proposal(proposer) {
            self.send_to(
                proposer,
                ServerMessage::MatchmakingCancelled(MatchmakingCancelled {
                    txid: proposal.transaction_id,
                }),
            );
        }
    }

    /// Take the player out of every lane and every direct-match negotiation.
    fn remove_from_all_matchmaking(&mut self, connection: ConnectionId) {
        for lane in self.lanes.values_mut() {
            lane.remove(connection);
        }
        let Some(player_id) = self.identities.get(&connection).and_then(|i| i.player_id.clone()) else {
            return;
        };

        self.withdraw_proposal(connection);

        let proposers: Vec<ConnectionId> = self
            .identities
            .iter()
            .filter(|(_, i)| i.direct.outbound.as_ref().is_some_and(|p| p.target == player_id))
            .map(|(id, _)| *id)
            .collect();
        for proposer in proposers {
            self.cancel_proposal_of(proposer);
        }

        if let Some(identity) = self.identities.get_mut(&connection) {
            identity.direct.inbound.clear();
        }
    }

    pub fn handle_get_online_friends(&mut self, connection: ConnectionId, request: GetOnlineFriends) -> Result<(), CoreError> {
        self.identity(connection)?;
        let currently_online_friends = request
            .friend_ids
            .into_iter()
            .filter(|id| self.online.contains_key(id))
            .collect();
        self.send_to(
            connection,
            ServerMessage::OnlineFriends(OnlineFriendsResponse {
                currently_online_friends,
                transaction_id: request.transaction_id,
            }),
        );
        Ok(())
    }

    /// Send the implemented-card list, or just its checksum when the client's copy is current.
    pub fn handle_get_implemented_cards(
        &mut self,
        connection: ConnectionId,
        request: GetImplementedExpandedCardsV1,
    ) -> Result<(), CoreError> {
        self.identity(connection)?;
        let manifest = &self.card_manifest;
        let up_to_date = manifest.matches(request.checksum.as_deref());
        debug!(
            "[GameServer] {} asked for implemented cards (up to date: {})",
            connection, up_to_date
        );
        let reply = ImplementedExpandedCardsV1 {
            raw_implemented_card_names: (!up_to_date).then(|| manifest.joined_names().to_string()),
            checksum: manifest.checksum().to_string(),
        };
        self.send_to(connection, ServerMessage::ImplementedCards(reply));
        Ok(())
    }

    pub fn online_players(&self, include_names: bool) -> OnlinePlayersResponse {
        let player_names = include_names.then(|| {
            let mut players: Vec<OnlinePlayerInfo> = self
                .online
                .iter()
                .filter_map(|(player_id, connection)| {
                    let identity = self.identities.get(connection)?;
                    Some(OnlinePlayerInfo {
                        id: player_id.clone(),
                        name: identity.display_name().to_string(),
                        current_match: identity.current_match.clone(),
                    })
                })
                .collect();
            players.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            players
        });
        OnlinePlayersResponse {
            player_count: self.online.len(),
            player_names,
        }
    }

    // Matches

    fn handle_game_message(&mut self, connection: ConnectionId, message: GameMessage) -> Result<(), CoreError> {
        let identity = self.identity(connection)?;
        let player_id = identity.bound_player_id()?.clone();
        let match_id = identity.current_match.clone().ok_or(CoreError::MatchNotFound)?;
        if !self.matches.contains_key(&match_id) {
            return Err(CoreError::MatchNotFound);
        }

        let kind = match message.message_type {
            GameMessageKind::MatchOperation => OperationKind::Action,
            GameMessageKind::MatchInput => OperationKind::Input,
            GameMessageKind::MatchInputUpdate => OperationKind::InputUpdate,
            GameMessageKind::SendEmote => return self.relay_emote(&match_id, &player_id, message),
            GameMessageKind::MatchReadyTimeout => {
                info!("[GameServer] {} did not get ready in match {}", player_id, match_id);
                return self.force_player_to_quit(&match_id, &player_id);
            }
            GameMessageKind::OpponentMatchTimeout | GameMessageKind::OpponentOperationTimeout => {
                let opponent = self
                    .matches
                    .get(&match_id)
                    .and_then(|session| session.opponent_of(&player_id))
                    .map(|seat| seat.player_id.clone())
                    .ok_or(CoreError::MatchNotFound)?;
                info!(
                    "[GameServer] {} reported {} timed out in match {}",
                    player_id, opponent, match_id
                );
                return self.force_player_to_quit(&match_id, &opponent);
            }
            kind @ (GameMessageKind::ChangeCoinState | GameMessageKind::ChangeDeckOrder) => {
                return Err(CoreError::ForbiddenOperation(kind));
            }
        };

        self.submit_operation(
            &match_id,
            Operation {
                operation_id: message.operation_id,
                origin: player_id,
                kind,
                payload: message.payload,
            },
        )
    }

    fn relay_emote(&mut self, match_id: &str, player_id: &str, message: GameMessage) -> Result<(), CoreError> {
        let emote = String::from_utf8(message.payload)
            .map_err(|_| CoreError::MalformedPayload("emote is not UTF-8".to_string()))?;
        let opponent = self
            .matches
            .get(match_id)
            .and_then(|session| session.opponent_of(player_id))
            .map(|seat| seat.connection)
            .ok_or(CoreError::MatchNotFound)?;
        self.send_to(
            opponent,
            ServerMessage::Match(MatchMessage {
                match_id: match_id.to_string(),
                operation_id: message.operation_id.unwrap_or_default(),
                body: MatchMessageBody::Emote {
                    from: player_id.to_string(),
                    emote,
                },
            }),
        );
        Ok(())
    }

    /// Run one operation through the engine and fan the outcome out.
    pub fn submit_operation(&mut self, match_id: &str, operation: Operation) -> Result<(), CoreError> {
        let is_input_update = operation.kind == OperationKind::InputUpdate;
        let session = self.matches.get_mut(match_id).ok_or(CoreError::MatchNotFound)?;
        session.begin_operation()?;
        let outcome = session.engine_mut().submit(operation);

        let result = resolve_operation(self, match_id, outcome, is_input_update);
        if let Some(session) = self.matches.get_mut(match_id) {
            session.finish_operation();
        }
        result
    }

    fn force_player_to_quit(&mut self, match_id: &str, player_id: &str) -> Result<(), CoreError> {
        info!("[GameServer] {} forfeits match {}", player_id, match_id);
        self.submit_operation(match_id, Operation::force_quit(player_id))
    }

    /// Drop a finished match and release both players.
    pub(super) fn end_match(&mut self, match_id: &str) {
        let Some(session) = self.matches.remove(match_id) else {
            return;
        };
        for seat in session.seats() {
            if let Some(identity) = self.identities.get_mut(&seat.connection) {
                if identity.current_match.as_deref() == Some(match_id) {
                    identity.current_match = None;
                }
            }
        }
        info!("[GameServer] {:?} match {} is over", session.mode(), match_id);
    }

    /// Open a match between two ready players and send both the session details.
    ///
    /// `first` and `second` are in the order they were paired; the seat order
    /// may be swapped by the player-order policy.
    pub fn start_session(&mut self, first: ConnectionId, second: ConnectionId, mode: GameMode) -> Result<MatchId, CoreError> {
        for connection in [first, second] {
            self.identity(connection)?.ensure_ready_for_match()?;
        }
        let (first, second) = self.order_policy.order(first, second, self.random.as_mut());
        let connections = [first, second];

        let match_id = Uuid::new_v4().to_string();
        let deterministic = self.settings.deterministic_decklists;
        let seat_setups = [
            self.seat_setup(first, deterministic)?,
            self.seat_setup(second, deterministic)?,
        ];
        let card_names: BTreeSet<&String> = seat_setups.iter().flat_map(|s| s.decklist.iter()).collect();
        let cards = self.caches.cards_for(card_names);

        let mut players = Vec::with_capacity(2);
        for (seat, connection) in connections.iter().enumerate() {
            let identity = self.identity(*connection)?;
            players.push(PlayerDetails {
                player_id: identity.bound_player_id()?.clone(),
                display_name: identity.display_name().to_string(),
                seat: seat as u8,
                deck_name: identity.deck.as_ref().map(|d| d.name.clone()).unwrap_or_default(),
                outfit: identity.outfit.clone().unwrap_or_default(),
            });
        }

        let setup = MatchSetup {
            match_id: match_id.clone(),
            mode,
            seats: seat_setups.clone(),
            rules: self.caches.rules.clone(),
            feature_flags: self.caches.feature_flags.clone(),
            rng_seed: self.random.next_u64(),
        };
        let (engine, opening) = self.engines.bootstrap(setup)?;

        let seats = [0, 1].map(|i| Seat {
            player_id: seat_setups[i].player_id.clone(),
            display_name: seat_setups[i].display_name.clone(),
            connection: connections[i],
        });
        self.matches
            .insert(match_id.clone(), MatchSession::new(match_id.clone(), mode, seats, engine));
        for connection in connections {
            self.remove_from_all_matchmaking(connection);
            let identity = self.identity_mut(connection)?;
            identity.current_match = Some(match_id.clone());
            let region = identity.region.clone();
            self.send_to(
                connection,
                ServerMessage::JoinSession(JoinSession {
                    region,
                    match_id: match_id.clone(),
                }),
            );
        }

        let created = SessionCreated {
            match_id: match_id.clone(),
            game_mode: mode,
            players,
            ready_up_timeout_secs: self.settings.ready_up_timeout_secs,
            feature_flags: self.caches.feature_flags.clone(),
            rules: self.caches.rules.as_ref().clone(),
            cards,
        };
        self.send_to_all(&connections, ServerMessage::SessionCreated(Box::new(created)));
        info!(
            "[GameServer] Match {} started: {} vs {}",
            match_id, seat_setups[0].player_id, seat_setups[1].player_id
        );

        if let Some(session) = self.matches.get_mut(&match_id) {
            session.begin_operation()?;
        }
        let result = resolve_operation(self, &match_id, opening, false);
        if let Some(session) = self.matches.get_mut(&match_id) {
            session.finish_operation();
        }
        result.map(|_| match_id)
    }

    fn seat_setup(&self, connection: ConnectionId, deterministic: bool) -> Result<SeatSetup, CoreError> {
        let identity = self.identity(connection)?;
        let deck = identity.deck.as_ref().ok_or(CoreError::SetupIncomplete("decklist"))?;
        Ok(SeatSetup {
            player_id: identity.bound_player_id()?.clone(),
            display_name: identity.display_name().to_string(),
            decklist: flatten_decklist(deck, deterministic),
        })
    }

    /// Drop the match `connection` is in without consulting its engine.
    ///
    /// Used once handling a message has panicked and the engine can no longer be trusted.
    pub fn abandon_match_of(&mut self, connection: ConnectionId) -> Option<MatchId> {
        let match_id = self.identities.get(&connection)?.current_match.clone()?;
        warn!("[GameServer] Abandoning match {} after a failure", match_id);
        self.end_match(&match_id);
        Some(match_id)
    }

    /// Forget a connection outright. No engine code runs.
    pub fn forget_connection(&mut self, connection: ConnectionId) {
        self.remove_from_all_matchmaking(connection);
        let Some(identity) = self.identities.remove(&connection) else {
            return;
        };
        if let Some(player_id) = identity.player_id {
            if self.online.get(&player_id) == Some(&connection) {
                self.online.remove(&player_id);
            }
        }
    }

    /// Forfeit the player's match, drop them from matchmaking and from the online directory.
    pub fn purge_player(&mut self, connection: ConnectionId) -> Result<(), CoreError> {
        let identity = self.identity(connection)?;
        let Some(player_id) = identity.player_id.clone() else {
            return Ok(());
        };

        let mut result = Ok(());
        if let Some(match_id) = identity.current_match.clone() {
            result = self.force_player_to_quit(&match_id, &player_id);
            if result.is_err() && self.matches.contains_key(&match_id) {
                warn!(
                    "[GameServer] Forfeit of {} failed; tearing match {} down",
                    player_id, match_id
                );
                self.end_match(&match_id);
            }
        }

        self.remove_from_all_matchmaking(connection);
        if self.online.get(&player_id) == Some(&connection) {
            self.online.remove(&player_id);
            info!("[GameServer] {} is offline", player_id);
        }
        result
    }
}
