//! Closed set of messages the server accepts and emits.
//!
//! The `pay` header of a frame carries the payload type name returned by
//! `payload_type()`; it selects which struct the body is decoded into.

use serde::{Deserialize, Serialize};

use crate::server::game_session::messages::{GameMessage, JoinSession, MatchMessage, SessionCreated, SupplementalData};
use crate::server::matchmaking::messages::{
    AcceptDirectMatch, BeginMatchmaking, CancelDirectMatch, CancelMatchmaking, DirectMatchCancelled,
    DirectMatchInvitation, GetOnlineFriends, MatchmakingCancelled, MatchmakingDenied, OnlineFriendsResponse,
    ProposeDirectMatch, SignedMatchContext,
};
use crate::server::matchmaking::types::OnlinePlayerInfo;

/// Keep-alive; answered by the connection with the server clock.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    pub time_sent: i64,
}

/// Diagnostic query. With the reflect magic as `query_id` it is echoed back in
/// the format named by the first byte of `message`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryMessage {
    pub query_id: String,
    pub message: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OnlinePlayersResponse {
    pub player_count: usize,
    pub player_names: Option<Vec<OnlinePlayerInfo>>,
}

/// Asks which cards the server implements. The reply skips the card list when
/// `checksum` already matches the server's.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetImplementedExpandedCardsV1 {
    #[serde(default)]
    pub checksum: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImplementedExpandedCardsV1 {
    /// Sorted card names joined with `|`; `None` when the client's checksum matched.
    pub raw_implemented_card_names: Option<String>,
    pub checksum: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    SupplementalData(SupplementalData),
    BeginMatchmaking(BeginMatchmaking),
    CancelMatchmaking(CancelMatchmaking),
    ProposeDirectMatch(ProposeDirectMatch),
    CancelDirectMatch(CancelDirectMatch),
    AcceptDirectMatch(AcceptDirectMatch),
    GetOnlineFriends(GetOnlineFriends),
    GetImplementedCards(GetImplementedExpandedCardsV1),
    Game(GameMessage),
    Heartbeat(HeartbeatPayload),
    Query(QueryMessage),
}

impl ClientMessage {
    pub fn payload_type(&self) -> &'static str {
        match self {
            ClientMessage::SupplementalData(_) => "SupplementalDataMessageV2",
            ClientMessage::BeginMatchmaking(_) => "BeginMatchmaking",
            ClientMessage::CancelMatchmaking(_) => "CancelMatchmaking",
            ClientMessage::ProposeDirectMatch(_) => "ProposeDirectMatch",
            ClientMessage::CancelDirectMatch(_) => "CancelDirectMatch",
            ClientMessage::AcceptDirectMatch(_) => "AcceptDirectMatch",
            ClientMessage::GetOnlineFriends(_) => "GetOnlineFriends",
            ClientMessage::GetImplementedCards(_) => "GetImplementedExpandedCardsV1",
            ClientMessage::Game(_) => "GameMessage",
            ClientMessage::Heartbeat(_) => "HeartbeatPayload",
            ClientMessage::Query(_) => "QueryMessage",
        }
    }

    /// Transaction id to echo in a denial; 0 for messages that carry none.
    pub fn transaction_id(&self) -> u64 {
        match self {
            ClientMessage::BeginMatchmaking(m) => m.txid,
            ClientMessage::CancelMatchmaking(m) => m.txid,
            ClientMessage::ProposeDirectMatch(m) => m.txid,
            ClientMessage::CancelDirectMatch(m) => m.txid,
            ClientMessage::AcceptDirectMatch(m) => m.txid,
            ClientMessage::GetOnlineFriends(m) => m.transaction_id,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    MatchmakingCancelled(MatchmakingCancelled),
    MatchmakingDenied(MatchmakingDenied),
    SignedMatchContext(SignedMatchContext),
    DirectMatchInvitation(DirectMatchInvitation),
    DirectMatchCancelled(DirectMatchCancelled),
    OnlineFriends(OnlineFriendsResponse),
    ImplementedCards(ImplementedExpandedCardsV1),
    JoinSession(JoinSession),
    SessionCreated(Box<SessionCreated>),
    Match(MatchMessage),
    Heartbeat(HeartbeatPayload),
    Query(QueryMessage),
    OnlinePlayers(OnlinePlayersResponse),
}

impl ServerMessage {
    pub fn payload_type(&self) -> &'static str {
        match self {
            ServerMessage::MatchmakingCancelled(_) => "MatchmakingCancelled",
            ServerMessage::MatchmakingDenied(_) => "MatchmakingDenied",
            ServerMessage::SignedMatchContext(_) => "SignedMatchContext",
            ServerMessage::DirectMatchInvitation(_) => "DirectMatchInvitation",
            ServerMessage::DirectMatchCancelled(_) => "CancellationToken",
            ServerMessage::OnlineFriends(_) => "OnlineFriendsResponse",
            ServerMessage::ImplementedCards(_) => "ImplementedExpandedCardsV1",
            ServerMessage::JoinSession(_) => "JoinSession",
            ServerMessage::SessionCreated(_) => "SessionCreated",
            ServerMessage::Match(_) => "MatchMessage",
            ServerMessage::Heartbeat(_) => "HeartbeatPayload",
            ServerMessage::Query(_) => "QueryMessage",
            ServerMessage::OnlinePlayers(_) => "OnlinePlayersResponse",
        }
    }
}
