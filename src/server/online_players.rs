//! `GET /players`: who is online, answered by the dispatch loop.
//!
//! The handler cannot read the core directly, so it queues an internal request
//! tagged with a `ShimConnection` and waits for the reply.

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use log::warn;
use serde::Deserialize;

use crate::config::dispatch::SHIM_REPLY_TIMEOUT_SECS;
use crate::server::connection::shim::ShimConnection;
use crate::server::dispatch::{InboundMessage, InternalRequest, ReceivedMessage};
use crate::server::state::AppState;
use crate::server::stomp::ServerMessage;
use crate::server::ws_error::http_error_response;

#[derive(Debug, Default, Deserialize)]
pub struct PlayersQuery {
    #[serde(default)]
    pub names: bool,
}

pub async fn online_players(query: web::Query<PlayersQuery>, data: web::Data<AppState>) -> HttpResponse {
    let (shim, reply) = ShimConnection::new();
    let request = ReceivedMessage {
        from: shim,
        message: InboundMessage::Internal(InternalRequest::OnlinePlayers {
            include_names: query.names,
        }),
    };
    if data.inbound.send(request).is_err() {
        warn!("[Players] Dispatch loop is gone");
        return http_error_response(
            "DISPATCH_UNAVAILABLE",
            "The server is shutting down.",
            None,
            StatusCode::SERVICE_UNAVAILABLE,
        );
    }

    match tokio::time::timeout(Duration::from_secs(SHIM_REPLY_TIMEOUT_SECS), reply).await {
        Ok(Ok(ServerMessage::OnlinePlayers(players))) => HttpResponse::Ok().json(players),
        Ok(Ok(other)) => {
            warn!("[Players] Unexpected reply {}", other.payload_type());
            http_error_response(
                "UNEXPECTED_REPLY",
                "The server answered with an unexpected message.",
                Some(other.payload_type()),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
        Ok(Err(_)) => http_error_response(
            "DISPATCH_UNAVAILABLE",
            "The request was dropped before it was answered.",
            None,
            StatusCode::SERVICE_UNAVAILABLE,
        ),
        Err(_) => http_error_response(
            "DISPATCH_TIMEOUT",
            "The server did not answer in time.",
            None,
            StatusCode::GATEWAY_TIMEOUT,
        ),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};

    use super::*;
    use crate::config::protocol::ONLINE_PLAYERS_ENDPOINT;
    use crate::server::connection::ClientConnection;
    use crate::server::connection::send_message;
    use crate::server::dispatch::inbound_queue;
    use crate::server::stomp::WireFormat;
    use crate::server::stomp::catalog::OnlinePlayersResponse;

    #[actix_web::test]
    async fn answers_with_the_dispatch_reply() {
        let (tx, mut rx) = inbound_queue();
        let state = web::Data::new(AppState::new(tx));
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route(ONLINE_PLAYERS_ENDPOINT, web::get().to(online_players)),
        )
        .await;

        // Stand-in for the dispatch loop.
        actix_web::rt::spawn(async move {
            if let Some(received) = rx.recv().await {
                assert_eq!(
                    received.message,
                    InboundMessage::Internal(InternalRequest::OnlinePlayers { include_names: true })
                );
                let reply = ServerMessage::OnlinePlayers(OnlinePlayersResponse {
                    player_count: 3,
                    player_names: None,
                });
                send_message(received.from.as_ref(), reply, WireFormat::Json);
                assert!(!received.from.is_open());
            }
        });

        let req = test::TestRequest::get().uri("/players?names=true").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["player_count"], 3);
    }

    #[actix_web::test]
    async fn closed_queue_is_service_unavailable() {
        let (tx, rx) = inbound_queue();
        drop(rx);
        let state = web::Data::new(AppState::new(tx));
        let app = test::init_service(
            App::new()
                .app_data(state)
                .route(ONLINE_PLAYERS_ENDPOINT, web::get().to(online_players)),
        )
        .await;
        let req = test::TestRequest::get().uri("/players").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
