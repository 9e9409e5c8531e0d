//! WebSocket transport.
//!
//! One `StompSession` actor per socket. It reassembles fragments, decodes
//! frames, answers heartbeats and `CONNECT` itself, and forwards everything
//! else to the dispatch loop tagged with its `WsConnection`. Outbound frames
//! travel through the actor's mailbox, which keeps them in send order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_http::ws::Item;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use log::{debug, info, warn};
use uuid::Uuid;

use super::{ClientConnection, ConnectionId, PreparedFrame};
use crate::config::protocol::{CLIENT_TIMEOUT_SECS, HEARTBEAT_INTERVAL_SECS, MESSAGE_ACCUMULATOR_SIZE};
use crate::server::dispatch::{ControlMessage, InboundMessage, InboundSender, ReceivedMessage};
use crate::server::state::AppState;
use crate::server::stomp::accumulator::FrameAccumulator;
use crate::server::stomp::catalog::HeartbeatPayload;
use crate::server::stomp::codec::{decode_client_message, frame_format};
use crate::server::stomp::{ClientMessage, FrameError, ServerMessage, StompFrame, Verb};
use crate::server::ws_error::http_error_response;

/// Frame queued for the socket.
#[derive(Message)]
#[rtype(result = "()")]
struct Outbound(Arc<PreparedFrame>);

/// Close the socket from outside the actor.
#[derive(Message)]
#[rtype(result = "()")]
struct Disconnect;

/// Handle the dispatch loop holds for a WebSocket client.
pub struct WsConnection {
    id: ConnectionId,
    addr: Addr<StompSession>,
    open: AtomicBool,
}

impl ClientConnection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn enqueue_send(&self, frame: Arc<PreparedFrame>) {
        if !self.is_open() {
            debug!(
                "[Stomp] Dropping {} for closed connection {}",
                frame.message().payload_type(),
                self.id
            );
            return;
        }
        self.addr.do_send(Outbound(frame));
    }

    fn disconnect_immediately(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.addr.do_send(Disconnect);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub struct StompSession {
    id: ConnectionId,
    inbound: InboundSender,
    connection: Option<Arc<WsConnection>>,
    accumulator: FrameAccumulator,
    last_heard: Instant,
}

impl StompSession {
    pub fn new(inbound: InboundSender) -> Self {
        Self {
            id: Uuid::new_v4(),
            inbound,
            connection: None,
            accumulator: FrameAccumulator::new(MESSAGE_ACCUMULATOR_SIZE),
            last_heard: Instant::now(),
        }
    }

    fn forward(&self, message: InboundMessage) {
        let Some(connection) = &self.connection else {
            return;
        };
        let received = ReceivedMessage {
            from: connection.clone(),
            message,
        };
        if self.inbound.send(received).is_err() {
            warn!("[Stomp] Dispatch loop is gone, dropping message from {}", self.id);
        }
    }

    /// Ping the client on an interval and drop it once it has been silent too long.
    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS), |act, ctx| {
            if act.last_heard.elapsed() > Duration::from_secs(CLIENT_TIMEOUT_SECS) {
                info!("[Stomp] Connection {} timed out", act.id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn receive(&mut self, bytes: Vec<u8>, ctx: &mut ws::WebsocketContext<Self>) {
        if let Err(e) = self.handle_frame(&bytes, ctx) {
            self.reject(e, ctx);
        }
    }

    fn reject(&mut self, error: FrameError, ctx: &mut ws::WebsocketContext<Self>) {
        warn!("[Stomp] Illegal packet from {}: {}", self.id, error);
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Protocol,
            description: Some(error.to_string()),
        }));
        ctx.stop();
    }

    fn handle_frame(&mut self, bytes: &[u8], ctx: &mut ws::WebsocketContext<Self>) -> Result<(), FrameError> {
        let frame = StompFrame::decode(bytes)?;
        match frame.verb {
            Verb::Send => match decode_client_message(&frame)? {
                ClientMessage::Heartbeat(_) => {
                    let reply = ServerMessage::Heartbeat(HeartbeatPayload {
                        time_sent: crate::server::unix_millis(),
                    });
                    let prepared = PreparedFrame::prepare(reply, frame_format(&frame)?)?;
                    ctx.binary(prepared.bytes().clone());
                }
                message => self.forward(InboundMessage::Client(message)),
            },
            Verb::Connect | Verb::Stomp => {
                ctx.binary(StompFrame::new(Verb::Connected).encode());
            }
            Verb::Disconnect => {
                ctx.close(Some(ws::CloseCode::Normal.into()));
                ctx.stop();
            }
            other => debug!("[Stomp] Ignoring {} frame from {}", other, self.id),
        }
        Ok(())
    }
}

impl Actor for StompSession {
    type Context = ws::WebsocketContext<Self>;

    /// Registers the connection with the dispatch loop.
    fn started(&mut self, ctx: &mut Self::Context) {
        let connection = Arc::new(WsConnection {
            id: self.id,
            addr: ctx.address(),
            open: AtomicBool::new(true),
        });
        self.connection = Some(connection);
        self.forward(InboundMessage::Control(ControlMessage::Connected));
        self.start_heartbeat(ctx);
        info!("[Stomp] Connection {} opened", self.id);
    }

    /// Marks the connection closed and lets the dispatch loop purge it.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(connection) = &self.connection {
            connection.open.store(false, Ordering::SeqCst);
        }
        self.forward(InboundMessage::Control(ControlMessage::Disconnected));
        info!("[Stomp] Connection {} closed", self.id);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for StompSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        self.last_heard = Instant::now();
        match msg {
            Ok(ws::Message::Binary(bytes)) => match self.accumulator.finish(&bytes) {
                Ok(whole) => self.receive(whole, ctx),
                Err(e) => self.reject(e, ctx),
            },
            Ok(ws::Message::Text(text)) => match self.accumulator.finish(text.as_bytes()) {
                Ok(whole) => self.receive(whole, ctx),
                Err(e) => self.reject(e, ctx),
            },
            Ok(ws::Message::Continuation(item)) => {
                let result = match item {
                    Item::FirstText(chunk) | Item::FirstBinary(chunk) | Item::Continue(chunk) => {
                        self.accumulator.push(&chunk).map(|_| None)
                    }
                    Item::Last(chunk) => self.accumulator.finish(&chunk).map(Some),
                };
                match result {
                    Ok(Some(whole)) => self.receive(whole, ctx),
                    Ok(None) => {}
                    Err(e) => self.reject(e, ctx),
                }
            }
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Pong(_)) | Ok(ws::Message::Nop) => {}
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("[Stomp] WebSocket error on {}: {}", self.id, e);
                ctx.stop();
            }
        }
    }
}

impl Handler<Outbound> for StompSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.binary(msg.0.bytes().clone());
    }
}

impl Handler<Disconnect> for StompSession {
    type Result = ();

    fn handle(&mut self, _msg: Disconnect, ctx: &mut Self::Context) {
        ctx.close(Some(ws::CloseReason {
            code: ws::CloseCode::Policy,
            description: Some("Disconnected by server".into()),
        }));
        ctx.stop();
    }
}

/// WebSocket endpoint speaking STOMP frames.
pub async fn ws_stomp(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    if ws::handshake(&req).is_err() {
        return Ok(http_error_response(
            "NOT_A_WEBSOCKET",
            "This endpoint only accepts WebSocket upgrades.",
            None,
            StatusCode::BAD_REQUEST,
        ));
    }

    ws::WsResponseBuilder::new(StompSession::new(data.inbound.clone()), &req, stream)
        .frame_size(MESSAGE_ACCUMULATOR_SIZE)
        .start()
}
