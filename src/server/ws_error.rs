//! Centralized helpers for client-facing error payloads.
//!
//! Use these so every denial and HTTP error carries the same JSON shape.

use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;

use crate::config::matchmaking::{DIRECT_MATCH_OFFLINE_ERROR, DIRECT_MATCH_STALE_ERROR, MATCHMAKING_DENIED_CODE};
use crate::server::error::CoreError;
use crate::server::matchmaking::messages::MatchmakingDenied;

/// Builds a `MatchmakingDenied` whose reason is `{"error": error_number, "message": message}`.
pub fn matchmaking_denied(txid: u64, error_number: u32, message: &str) -> MatchmakingDenied {
    MatchmakingDenied {
        txid,
        reason: json!({ "error": error_number, "message": message }).to_string(),
        code: MATCHMAKING_DENIED_CODE,
    }
}

/// Denial sent back for an expected runtime condition raised while handling `txid`.
pub fn denial_for(error: &CoreError, txid: u64) -> MatchmakingDenied {
    let error_number = match error {
        CoreError::PlayerOffline(_) => DIRECT_MATCH_OFFLINE_ERROR,
        _ => DIRECT_MATCH_STALE_ERROR,
    };
    matchmaking_denied(txid, error_number, &error.to_string())
}

/// `{"error": {code, message, context}}` with `status`; a missing context is sent as "".
pub fn http_error_response(code: &str, message: &str, context: Option<&str>, status: StatusCode) -> HttpResponse {
    let body = json!({
        "error": {
            "code": code,
            "message": message,
            "context": context.unwrap_or(""),
        }
    });
    HttpResponse::build(status).json(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::matchmaking::DIRECT_MATCH_OFFLINE_MESSAGE;

    #[test]
    fn offline_denial_shape() {
        let denial = matchmaking_denied(7, DIRECT_MATCH_OFFLINE_ERROR, DIRECT_MATCH_OFFLINE_MESSAGE);
        assert_eq!(denial.txid, 7);
        assert_eq!(denial.code, 16100);
        let reason: serde_json::Value = serde_json::from_str(&denial.reason).unwrap();
        assert_eq!(reason["error"], 42055);
        assert_eq!(reason["message"], "Cannot battle with offline player.");
    }

    #[test]
    fn token_mismatch_denial_uses_stale_error() {
        let denial = denial_for(&CoreError::InvitationTokenMismatch, 3);
        let reason: serde_json::Value = serde_json::from_str(&denial.reason).unwrap();
        assert_eq!(reason["error"], DIRECT_MATCH_STALE_ERROR);
        assert_eq!(denial.txid, 3);
    }

    #[test]
    fn http_error_has_status() {
        let response = http_error_response("X", "bad", None, StatusCode::BAD_REQUEST);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
