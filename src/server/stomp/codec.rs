//! Payload encodings and the mapping between frames and catalog messages.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::server::stomp::catalog::{ClientMessage, ServerMessage};
use crate::server::stomp::error::FrameError;
use crate::server::stomp::frame::{StompFrame, Verb};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Serialization strategy for a frame body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    Json,
    Binary,
}

impl WireFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Json => CONTENT_TYPE_JSON,
            WireFormat::Binary => CONTENT_TYPE_BINARY,
        }
    }

    /// Parameters such as `;charset=utf-8` are ignored.
    pub fn from_content_type(content_type: &str) -> Result<Self, FrameError> {
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        match media_type {
            CONTENT_TYPE_JSON => Ok(WireFormat::Json),
            CONTENT_TYPE_BINARY => Ok(WireFormat::Binary),
            _ => Err(FrameError::UnknownContentType(content_type.to_string())),
        }
    }

    /// Single-byte tag clients use to name a format inside a payload.
    #[cfg(test)]
    pub fn tag(self) -> u8 {
        match self {
            WireFormat::Json => 0,
            WireFormat::Binary => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(WireFormat::Json),
            1 => Some(WireFormat::Binary),
            _ => None,
        }
    }

    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, FrameError> {
        match self {
            WireFormat::Json => Ok(serde_json::to_vec(value)?),
            WireFormat::Binary => Ok(bincode::serde::encode_to_vec(value, bincode::config::standard())?),
        }
    }

    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, FrameError> {
        match self {
            WireFormat::Json => Ok(serde_json::from_slice(bytes)?),
            WireFormat::Binary => {
                let (value, _read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
                Ok(value)
            }
        }
    }
}

/// Format of an inbound frame, from its `content-type` header.
pub fn frame_format(frame: &StompFrame) -> Result<WireFormat, FrameError> {
    let content_type = frame
        .headers
        .content_type
        .as_deref()
        .ok_or(FrameError::MissingContentType)?;
    WireFormat::from_content_type(content_type)
}

/// Decode the body of a client `SEND` frame into its catalog message.
pub fn decode_client_message(frame: &StompFrame) -> Result<ClientMessage, FrameError> {
    let format = frame_format(frame)?;
    let payload_type = frame
        .headers
        .payload_type
        .as_deref()
        .ok_or(FrameError::MissingPayloadType)?;
    let body = frame.payload.as_slice();

    let message = match payload_type {
        "SupplementalDataMessageV2" => ClientMessage::SupplementalData(format.decode(body)?),
        "BeginMatchmaking" => ClientMessage::BeginMatchmaking(format.decode(body)?),
        "CancelMatchmaking" => ClientMessage::CancelMatchmaking(format.decode(body)?),
        "ProposeDirectMatch" => ClientMessage::ProposeDirectMatch(format.decode(body)?),
        "CancelDirectMatch" => ClientMessage::CancelDirectMatch(format.decode(body)?),
        "AcceptDirectMatch" => ClientMessage::AcceptDirectMatch(format.decode(body)?),
        "GetOnlineFriends" => ClientMessage::GetOnlineFriends(format.decode(body)?),
        "GetImplementedExpandedCardsV1" => ClientMessage::GetImplementedCards(format.decode(body)?),
        "GameMessage" => ClientMessage::Game(format.decode(body)?),
        "HeartbeatPayload" => ClientMessage::Heartbeat(format.decode(body)?),
        "QueryMessage" => ClientMessage::Query(format.decode(body)?),
        other => {
            return Err(FrameError::UnknownPayloadType {
                content_type: format.content_type(),
                payload_type: other.to_string(),
            });
        }
    };
    Ok(message)
}

/// Build the `MESSAGE` frame carrying `message`.
pub fn encode_server_message(message: &ServerMessage, format: WireFormat) -> Result<StompFrame, FrameError> {
    let payload = match message {
        ServerMessage::MatchmakingCancelled(m) => format.encode(m)?,
        ServerMessage::MatchmakingDenied(m) => format.encode(m)?,
        ServerMessage::SignedMatchContext(m) => format.encode(m)?,
        ServerMessage::DirectMatchInvitation(m) => format.encode(m)?,
        ServerMessage::DirectMatchCancelled(m) => format.encode(m)?,
        ServerMessage::OnlineFriends(m) => format.encode(m)?,
        ServerMessage::ImplementedCards(m) => format.encode(m)?,
        ServerMessage::JoinSession(m) => format.encode(m)?,
        ServerMessage::SessionCreated(m) => format.encode(m.as_ref())?,
        ServerMessage::Match(m) => format.encode(m)?,
        ServerMessage::Heartbeat(m) => format.encode(m)?,
        ServerMessage::Query(m) => format.encode(m)?,
        ServerMessage::OnlinePlayers(m) => format.encode(m)?,
    };

    let mut frame = StompFrame::new(Verb::Message);
    frame.headers.content_type = Some(format.content_type().to_string());
    frame.headers.payload_type = Some(message.payload_type().to_string());
    frame.payload = payload;
    Ok(frame)
}

/// Inverse of `encode_server_message`, for asserting on what clients receive.
#[cfg(test)]
pub fn decode_server_message(frame: &StompFrame) -> Result<ServerMessage, FrameError> {
    let format = frame_format(frame)?;
    let body = frame.payload.as_slice();
    let message = match frame.headers.payload_type.as_deref().unwrap_or_default() {
        "MatchmakingCancelled" => ServerMessage::MatchmakingCancelled(format.decode(body)?),
        "MatchmakingDenied" => ServerMessage::MatchmakingDenied(format.decode(body)?),
        "SignedMatchContext" => ServerMessage::SignedMatchContext(format.decode(body)?),
        "DirectMatchInvitation" => ServerMessage::DirectMatchInvitation(format.decode(body)?),
        "CancellationToken" => ServerMessage::DirectMatchCancelled(format.decode(body)?),
        "OnlineFriendsResponse" => ServerMessage::OnlineFriends(format.decode(body)?),
        "ImplementedExpandedCardsV1" => ServerMessage::ImplementedCards(format.decode(body)?),
        "JoinSession" => ServerMessage::JoinSession(format.decode(body)?),
        "SessionCreated" => ServerMessage::SessionCreated(Box::new(format.decode(body)?)),
        "MatchMessage" => ServerMessage::Match(format.decode(body)?),
        "HeartbeatPayload" => ServerMessage::Heartbeat(format.decode(body)?),
        "QueryMessage" => ServerMessage::Query(format.decode(body)?),
        "OnlinePlayersResponse" => ServerMessage::OnlinePlayers(format.decode(body)?),
        other => {
            return Err(FrameError::UnknownPayloadType {
                content_type: format.content_type(),
                payload_type: other.to_string(),
            });
        }
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::*;
    use crate::game::store::{CardSource, RuleSet};
    use crate::game::types::{Delta, OperationStatus};
    use crate::server::game_session::messages::{
        DeckList, GameMessage, GameMessageKind, MatchMessage, MatchMessageBody, OperationResult, Outfit,
        PlayerDetails, SessionCreated, SupplementalData,
    };
    use crate::server::matchmaking::messages::{BeginMatchmaking, MatchmakingDenied};
    use crate::server::matchmaking::types::{GameMode, GameplayType, MatchmakingContext};
    use crate::server::stomp::catalog::{GetImplementedExpandedCardsV1, HeartbeatPayload};
    use crate::server::stomp::frame::HEADER_PAYLOAD_TYPE;

    fn client_frame(format: WireFormat, payload_type: &str, payload: Vec<u8>) -> StompFrame {
        let mut frame = StompFrame::new(Verb::Send);
        frame.headers.content_type = Some(format.content_type().to_string());
        frame.headers.payload_type = Some(payload_type.to_string());
        frame.payload = payload;
        frame
    }

    fn through_wire(frame: &StompFrame) -> StompFrame {
        StompFrame::decode(&frame.encode()).unwrap()
    }

    #[test]
    fn decodes_json_begin_matchmaking() {
        let body = br#"{"txid":9,"context":{"gameplayType":"Casual","gameMode":"Expanded"}}"#.to_vec();
        let frame = client_frame(WireFormat::Json, "BeginMatchmaking", body);
        let message = decode_client_message(&through_wire(&frame)).unwrap();
        assert_eq!(
            message,
            ClientMessage::BeginMatchmaking(BeginMatchmaking {
                txid: 9,
                context: MatchmakingContext {
                    gameplay_type: GameplayType::Casual,
                    game_mode: GameMode::Expanded,
                },
            })
        );
        assert_eq!(message.transaction_id(), 9);
    }

    #[test]
    fn decodes_partial_supplemental_data() {
        let body = br#"{"PlayerId":"p1","PlayerDisplayName":"Ash"}"#.to_vec();
        let frame = client_frame(WireFormat::Json, "SupplementalDataMessageV2", body);
        let ClientMessage::SupplementalData(data) = decode_client_message(&frame).unwrap() else {
            panic!("wrong message");
        };
        assert_eq!(data.player_id.as_deref(), Some("p1"));
        assert_eq!(data.player_display_name.as_deref(), Some("Ash"));
        assert!(data.deck_information.is_none());
    }

    #[test]
    fn implemented_cards_query_checksum_is_optional() {
        let frame = client_frame(WireFormat::Json, "GetImplementedExpandedCardsV1", b"{}".to_vec());
        assert_eq!(
            decode_client_message(&frame).unwrap(),
            ClientMessage::GetImplementedCards(GetImplementedExpandedCardsV1 { checksum: None })
        );

        let body = br#"{"checksum":"ab12"}"#.to_vec();
        let frame = client_frame(WireFormat::Json, "GetImplementedExpandedCardsV1", body);
        let ClientMessage::GetImplementedCards(request) = decode_client_message(&frame).unwrap() else {
            panic!("wrong message");
        };
        assert_eq!(request.checksum.as_deref(), Some("ab12"));
    }

    #[test]
    fn binary_client_message_survives_the_wire() {
        let data = SupplementalData {
            player_id: Some("p1".to_string()),
            current_region: Some("eu".to_string()),
            deck_information: Some(DeckList {
                id: "d1".to_string(),
                name: "Deck".to_string(),
                cards: HashMap::from([("sv1_001".to_string(), 4)]),
            }),
            outfit_information: Some(Outfit::default()),
            player_display_name: None,
        };
        let body = WireFormat::Binary.encode(&data).unwrap();
        let frame = client_frame(WireFormat::Binary, "SupplementalDataMessageV2", body);
        let decoded = decode_client_message(&through_wire(&frame)).unwrap();
        assert_eq!(decoded, ClientMessage::SupplementalData(data));
    }

    #[test]
    fn game_message_in_both_formats() {
        let message = GameMessage {
            message_type: GameMessageKind::MatchInput,
            operation_id: Some("op-1".to_string()),
            payload: vec![1, 2, 3],
        };
        for format in [WireFormat::Json, WireFormat::Binary] {
            let frame = client_frame(format, "GameMessage", format.encode(&message).unwrap());
            let decoded = decode_client_message(&through_wire(&frame)).unwrap();
            assert_eq!(decoded, ClientMessage::Game(message.clone()));
        }
    }

    #[test]
    fn server_messages_round_trip_in_both_formats() {
        let created = SessionCreated {
            match_id: "m1".to_string(),
            game_mode: GameMode::Standard,
            players: vec![PlayerDetails {
                player_id: "p1".to_string(),
                display_name: "Ash".to_string(),
                seat: 0,
                deck_name: "Deck".to_string(),
                outfit: Outfit::default(),
            }],
            ready_up_timeout_secs: 60,
            feature_flags: BTreeMap::from([("Emotes".to_string(), true)]),
            rules: RuleSet::default(),
            cards: vec![CardSource {
                name: "sv1_001".to_string(),
                definition: "{}".to_string(),
            }],
        };
        let messages = [
            ServerMessage::SessionCreated(Box::new(created)),
            ServerMessage::MatchmakingDenied(MatchmakingDenied {
                txid: 3,
                reason: "{}".to_string(),
                code: 16100,
            }),
            ServerMessage::Match(MatchMessage {
                match_id: "m1".to_string(),
                operation_id: "op".to_string(),
                body: MatchMessageBody::OperationResult(OperationResult {
                    status: OperationStatus::Resolved,
                    delta_index: 0,
                    deltas: vec![Delta::new("Action", "x")],
                    is_input_update: false,
                    is_game_over: false,
                }),
            }),
        ];

        for format in [WireFormat::Json, WireFormat::Binary] {
            for message in &messages {
                let frame = through_wire(&encode_server_message(message, format).unwrap());
                assert_eq!(frame.verb, Verb::Message);
                assert_eq!(frame.headers.content_type.as_deref(), Some(format.content_type()));
                assert_eq!(frame.headers.payload_type.as_deref(), Some(message.payload_type()));
                assert_eq!(&decode_server_message(&frame).unwrap(), message);
            }
        }
    }

    #[test]
    fn unknown_payload_type_is_rejected() {
        let frame = client_frame(WireFormat::Json, "LaunchRockets", b"{}".to_vec());
        let err = decode_client_message(&frame).unwrap_err();
        assert!(matches!(err, FrameError::UnknownPayloadType { .. }));
    }

    #[test]
    fn unknown_or_missing_content_type_is_rejected() {
        let mut frame = client_frame(WireFormat::Json, "HeartbeatPayload", b"{\"timeSent\":1}".to_vec());
        frame.headers.content_type = Some("text/plain".to_string());
        assert!(matches!(
            decode_client_message(&frame),
            Err(FrameError::UnknownContentType(_))
        ));

        frame.headers.content_type = None;
        assert!(matches!(decode_client_message(&frame), Err(FrameError::MissingContentType)));
    }

    #[test]
    fn body_not_matching_schema_is_rejected() {
        let frame = client_frame(WireFormat::Json, "HeartbeatPayload", b"{\"nope\":true}".to_vec());
        assert!(matches!(decode_client_message(&frame), Err(FrameError::Json(_))));

        let frame = client_frame(WireFormat::Binary, "HeartbeatPayload", vec![]);
        assert!(matches!(decode_client_message(&frame), Err(FrameError::BinaryDecode(_))));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let body = serde_json::to_vec(&HeartbeatPayload { time_sent: 5 }).unwrap();
        let mut frame = client_frame(WireFormat::Json, "HeartbeatPayload", body);
        frame.headers.content_type = Some("application/json;charset=utf-8".to_string());
        assert_eq!(
            decode_client_message(&frame).unwrap(),
            ClientMessage::Heartbeat(HeartbeatPayload { time_sent: 5 })
        );
    }

    #[test]
    fn raw_json_frame_from_a_client() {
        let raw = format!(
            "SEND\ncontent-type:application/json\n{HEADER_PAYLOAD_TYPE}:HeartbeatPayload\n\n{{\"timeSent\":42}}\0"
        );
        let frame = StompFrame::decode(raw.as_bytes()).unwrap();
        assert_eq!(
            decode_client_message(&frame).unwrap(),
            ClientMessage::Heartbeat(HeartbeatPayload { time_sent: 42 })
        );
    }
}
