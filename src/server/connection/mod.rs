//! One client's duplex channel, seen from the dispatch loop.
//!
//! The coordinator only ever talks to `ClientConnection` trait objects. Sends
//! are fire-and-continue: each implementation queues frames in FIFO order and
//! returns immediately.

pub mod shim;
pub mod websocket;

#[cfg(test)]
pub mod recording;

use std::sync::Arc;

use actix_web::web::Bytes;
use log::error;
use uuid::Uuid;

use crate::server::stomp::codec::encode_server_message;
use crate::server::stomp::{FrameError, ServerMessage, WireFormat};

/// Tag attached to every inbound message, unique per connection.
pub type ConnectionId = Uuid;

pub type ConnectionHandle = Arc<dyn ClientConnection>;

pub trait ClientConnection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Queue a frame behind every frame queued before it. Never blocks.
    fn enqueue_send(&self, frame: Arc<PreparedFrame>);

    /// Close the connection. Calling it again does nothing.
    fn disconnect_immediately(&self);

    fn is_open(&self) -> bool;
}

/// A server message encoded once, ready to be written to any number of connections.
#[derive(Debug)]
pub struct PreparedFrame {
    message: ServerMessage,
    format: WireFormat,
    bytes: Bytes,
}

impl PreparedFrame {
    pub fn prepare(message: ServerMessage, format: WireFormat) -> Result<Arc<Self>, FrameError> {
        let frame = encode_server_message(&message, format)?;
        Ok(Arc::new(Self {
            message,
            format,
            bytes: Bytes::from(frame.encode()),
        }))
    }

    pub fn message(&self) -> &ServerMessage {
        &self.message
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Encode and queue `message`. A message that cannot be encoded closes the connection.
pub fn send_message(connection: &dyn ClientConnection, message: ServerMessage, format: WireFormat) {
    let payload_type = message.payload_type();
    match PreparedFrame::prepare(message, format) {
        Ok(frame) => connection.enqueue_send(frame),
        Err(e) => {
            error!(
                "[Connection] Failed to encode {} for {}: {}",
                payload_type,
                connection.id(),
                e
            );
            connection.disconnect_immediately();
        }
    }
}
