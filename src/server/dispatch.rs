//! Dispatch loop.
//!
//! Every connection pushes what it receives onto one unbounded queue. A single
//! actor drains that queue on a fixed interval and is the only caller of the
//! `GameServerCore`, so the core needs no locking.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use actix::prelude::*;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::config::dispatch::POLL_INTERVAL_MS;
use crate::config::protocol::REFLECT_MESSAGE_MAGIC;
use crate::server::connection::{ConnectionHandle, send_message};
use crate::server::error::{CoreError, ErrorClass};
use crate::server::game_session::GameServerCore;
use crate::server::stomp::catalog::{HeartbeatPayload, QueryMessage};
use crate::server::stomp::{ClientMessage, ServerMessage, WireFormat};
use crate::server::ws_error::denial_for;

/// Connection lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    Connected,
    Disconnected,
}

/// Questions asked by the HTTP side through a shim connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalRequest {
    OnlinePlayers { include_names: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Control(ControlMessage),
    Client(ClientMessage),
    Internal(InternalRequest),
}

/// A message tagged with the connection it came from.
pub struct ReceivedMessage {
    pub from: ConnectionHandle,
    pub message: InboundMessage,
}

pub type InboundSender = mpsc::UnboundedSender<ReceivedMessage>;
pub type InboundReceiver = mpsc::UnboundedReceiver<ReceivedMessage>;

pub fn inbound_queue() -> (InboundSender, InboundReceiver) {
    mpsc::unbounded_channel()
}

pub struct DispatchLoop {
    core: GameServerCore,
    inbound: InboundReceiver,
}

impl DispatchLoop {
    pub fn new(core: GameServerCore, inbound: InboundReceiver) -> Self {
        Self { core, inbound }
    }

    #[cfg(test)]
    pub fn core(&self) -> &GameServerCore {
        &self.core
    }

    /// Handle everything queued so far. Returns how many messages were taken.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(received) = self.inbound.try_recv() {
            let from = received.from.clone();
            let closing = matches!(received.message, InboundMessage::Control(ControlMessage::Disconnected));
            if panic::catch_unwind(AssertUnwindSafe(|| self.process(received))).is_err() {
                self.contain_panic(&from, closing);
            }
            handled += 1;
        }
        handled
    }

    /// A handler panicked: drop the sender and the match it was in, keep the loop running.
    fn contain_panic(&mut self, from: &ConnectionHandle, closing: bool) {
        let connection = from.id();
        error!("[Dispatch] Handling a message from {} panicked; closing it", connection);
        if let Some(match_id) = self.core.abandon_match_of(connection) {
            error!("[Dispatch] Match {} abandoned", match_id);
        }
        if closing {
            self.core.forget_connection(connection);
        }
        self.drop_connection(from);
    }

    pub fn process(&mut self, received: ReceivedMessage) {
        let ReceivedMessage { from, message } = received;
        let connection = from.id();

        match message {
            InboundMessage::Control(ControlMessage::Connected) => {
                self.core.register_connection(from);
            }
            InboundMessage::Control(ControlMessage::Disconnected) => {
                if let Err(e) = self.core.unregister_connection(connection) {
                    warn!("[Dispatch] Cleanup of {} reported: {}", connection, e);
                }
            }
            // Anything still queued from a closed socket is stale.
            _ if !from.is_open() => {
                debug!("[Dispatch] Skipping message from closed connection {}", connection);
            }
            InboundMessage::Internal(InternalRequest::OnlinePlayers { include_names }) => {
                let players = self.core.online_players(include_names);
                send_message(from.as_ref(), ServerMessage::OnlinePlayers(players), WireFormat::Json);
            }
            InboundMessage::Client(ClientMessage::Heartbeat(_)) => {
                let reply = HeartbeatPayload {
                    time_sent: crate::server::unix_millis(),
                };
                send_message(from.as_ref(), ServerMessage::Heartbeat(reply), WireFormat::Json);
            }
            InboundMessage::Client(ClientMessage::Query(query)) if reflect_format(&query).is_some() => {
                if let Some(format) = reflect_format(&query) {
                    send_message(from.as_ref(), ServerMessage::Query(query), format);
                }
            }
            InboundMessage::Client(message) => {
                let txid = message.transaction_id();
                let payload_type = message.payload_type();
                if let Err(e) = self.core.handle_protocol_message(connection, message) {
                    self.report(&from, payload_type, txid, e);
                }
            }
        }
    }

    fn report(&mut self, from: &ConnectionHandle, payload_type: &str, txid: u64, error: CoreError) {
        let connection = from.id();
        match error.class() {
            ErrorClass::ProtocolViolation => {
                warn!(
                    "[Dispatch] Protocol violation by {} on {}: {}",
                    connection, payload_type, error
                );
                self.drop_connection(from);
            }
            ErrorClass::InternalInvariantViolation => {
                error!(
                    "[Dispatch] Internal error handling {} from {}: {}",
                    payload_type, connection, error
                );
                self.drop_connection(from);
            }
            ErrorClass::ExpectedRuntimeCondition => {
                info!("[Dispatch] Denied {} from {}: {}", payload_type, connection, error);
                send_message(
                    from.as_ref(),
                    ServerMessage::MatchmakingDenied(denial_for(&error, txid)),
                    WireFormat::Json,
                );
            }
            ErrorClass::EngineFailure => {
                error!("[Dispatch] {} from {} failed: {}", payload_type, connection, error);
            }
        }
    }

    /// Close the socket now; the core is cleaned up when its `Disconnected` arrives.
    fn drop_connection(&mut self, from: &ConnectionHandle) {
        from.disconnect_immediately();
    }
}

/// Format to echo a reflect query in, if `query` is one.
fn reflect_format(query: &QueryMessage) -> Option<WireFormat> {
    if query.query_id != REFLECT_MESSAGE_MAGIC || !(1..=2).contains(&query.message.len()) {
        return None;
    }
    query.message.first().copied().and_then(WireFormat::from_tag)
}

impl Actor for DispatchLoop {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("[Dispatch] Loop started");
        ctx.run_interval(Duration::from_millis(POLL_INTERVAL_MS), |act, _ctx| {
            act.drain();
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("[Dispatch] Loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::settings::ServerSettings;
    use crate::game::random::SeededRandom;
    use crate::game::store::SharedCaches;
    use crate::game::testing::ScriptedEngineFactory;
    use crate::server::connection::recording::RecordingConnection;

    fn dispatch() -> (DispatchLoop, InboundSender) {
        let core = GameServerCore::new(
            Arc::new(ServerSettings::default()),
            Arc::new(SharedCaches::default()),
            Box::new(ScriptedEngineFactory::default()),
            Box::new(SeededRandom::new(1)),
        );
        let (tx, rx) = inbound_queue();
        (DispatchLoop::new(core, rx), tx)
    }

    fn send(tx: &InboundSender, from: &Arc<RecordingConnection>, message: InboundMessage) {
        tx.send(ReceivedMessage {
            from: from.handle(),
            message,
        })
        .unwrap();
    }

    #[test]
    fn connect_and_disconnect_update_the_registry() {
        let (mut dispatch, tx) = dispatch();
        let client = RecordingConnection::new();
        send(&tx, &client, InboundMessage::Control(ControlMessage::Connected));
        assert_eq!(dispatch.drain(), 1);
        assert!(dispatch.core().is_registered(client.handle().id()));

        client.close();
        send(&tx, &client, InboundMessage::Control(ControlMessage::Disconnected));
        dispatch.drain();
        assert!(!dispatch.core().is_registered(client.handle().id()));
    }

    #[test]
    fn reflect_query_is_echoed_in_the_requested_format() {
        let (mut dispatch, tx) = dispatch();
        let client = RecordingConnection::new();
        send(&tx, &client, InboundMessage::Control(ControlMessage::Connected));
        let query = QueryMessage {
            query_id: REFLECT_MESSAGE_MAGIC.to_string(),
            message: vec![WireFormat::Binary.tag(), 9],
        };
        send(&tx, &client, InboundMessage::Client(ClientMessage::Query(query.clone())));
        dispatch.drain();

        let frames = client.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].format(), WireFormat::Binary);
        assert_eq!(frames[0].message(), &ServerMessage::Query(query));
    }

    #[test]
    fn non_reflect_query_is_a_protocol_violation() {
        let (mut dispatch, tx) = dispatch();
        let client = RecordingConnection::new();
        send(&tx, &client, InboundMessage::Control(ControlMessage::Connected));
        let query = QueryMessage {
            query_id: "something else".to_string(),
            message: vec![0],
        };
        send(&tx, &client, InboundMessage::Client(ClientMessage::Query(query)));
        dispatch.drain();
        assert!(client.messages().is_empty());
        assert_eq!(client.disconnect_count(), 1);
    }

    #[test]
    fn messages_from_closed_connections_are_skipped() {
        let (mut dispatch, tx) = dispatch();
        let client = RecordingConnection::new();
        send(&tx, &client, InboundMessage::Control(ControlMessage::Connected));
        send(
            &tx,
            &client,
            InboundMessage::Client(ClientMessage::Heartbeat(HeartbeatPayload { time_sent: 1 })),
        );
        client.close();
        assert_eq!(dispatch.drain(), 2);
        assert!(client.messages().is_empty());
        assert_eq!(client.disconnect_count(), 0);
    }

    #[test]
    fn online_players_request_is_answered_without_registration() {
        let (mut dispatch, tx) = dispatch();
        let asker = RecordingConnection::new();
        send(
            &tx,
            &asker,
            InboundMessage::Internal(InternalRequest::OnlinePlayers { include_names: true }),
        );
        dispatch.drain();
        match asker.messages().as_slice() {
            [ServerMessage::OnlinePlayers(players)] => {
                assert_eq!(players.player_count, 0);
                assert_eq!(players.player_names, Some(Vec::new()));
            }
            other => panic!("unexpected replies: {other:?}"),
        }
    }
}
