//! Queue and direct-match messages exchanged with clients.
//!
//! Field names follow the client's camelCase JSON; the binary strategy only
//! depends on field order.

use serde::{Deserialize, Serialize};

use super::types::{MatchSharedContext, MatchmakingContext, PlayerId};

// Client -> server

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BeginMatchmaking {
    pub txid: u64,
    pub context: MatchmakingContext,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancelMatchmaking {
    pub txid: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposeDirectMatch {
    pub txid: u64,
    pub target_account_id: PlayerId,
    pub context: MatchSharedContext,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancelDirectMatch {
    pub txid: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcceptDirectMatch {
    pub txid: u64,
    pub invitation: DirectMatchInvitation,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct GetOnlineFriends {
    pub friend_ids: Vec<PlayerId>,
    pub transaction_id: u64,
}

// Server -> client

/// Acknowledges a cancel, or tells a proposer their proposal is gone.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakingCancelled {
    pub txid: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakingDenied {
    pub txid: u64,
    /// JSON object `{"error": <number>, "message": <text>}`.
    pub reason: String,
    pub code: u32,
}

/// Sent to the proposer; carries the token the target must echo back.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignedMatchContext {
    pub txid: u64,
    pub mm_token: String,
    pub issued_at: i64,
}

/// Sent to the target of a proposal, and echoed back inside `AcceptDirectMatch`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectMatchInvitation {
    pub source_account_id: PlayerId,
    pub source_display_name: String,
    pub mm_token: String,
    pub transaction_id: u64,
    pub issued_at: i64,
    pub shared_context: MatchSharedContext,
}

/// Withdraws an invitation from a player holding it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectMatchCancelled {
    pub mm_token: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct OnlineFriendsResponse {
    pub currently_online_friends: Vec<PlayerId>,
    pub transaction_id: u64,
}
