//! HTTP and WebSocket routing configuration.

use actix_web::web;

use crate::config::protocol::{ONLINE_PLAYERS_ENDPOINT, STOMP_ENDPOINT};
use crate::server::connection::websocket::ws_stomp;
use crate::server::online_players::online_players;

/// STOMP clients connect to the WebSocket route; the players route is a plain
/// HTTP query answered by the dispatch loop.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(STOMP_ENDPOINT).to(ws_stomp))
        .service(web::resource(ONLINE_PLAYERS_ENDPOINT).route(web::get().to(online_players)));
}
