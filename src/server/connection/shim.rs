//! Connection standing in for an HTTP request.
//!
//! Lets an HTTP handler ask the dispatch loop a question: the first message the
//! loop sends to the shim is handed back through a oneshot channel, after which
//! the shim reports itself closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::{ClientConnection, ConnectionId, PreparedFrame};
use crate::server::stomp::ServerMessage;

pub struct ShimConnection {
    id: ConnectionId,
    open: AtomicBool,
    reply: Mutex<Option<oneshot::Sender<ServerMessage>>>,
}

impl ShimConnection {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<ServerMessage>) {
        let (tx, rx) = oneshot::channel();
        let shim = Arc::new(Self {
            id: Uuid::new_v4(),
            open: AtomicBool::new(true),
            reply: Mutex::new(Some(tx)),
        });
        (shim, rx)
    }

    fn take_reply(&self) -> Option<oneshot::Sender<ServerMessage>> {
        self.open.store(false, Ordering::SeqCst);
        self.reply.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl ClientConnection for ShimConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn enqueue_send(&self, frame: Arc<PreparedFrame>) {
        match self.take_reply() {
            Some(reply) => {
                if reply.send(frame.message().clone()).is_err() {
                    debug!("[Shim] Requester {} stopped waiting", self.id);
                }
            }
            None => debug!("[Shim] Extra reply for {} discarded", self.id),
        }
    }

    fn disconnect_immediately(&self) {
        self.take_reply();
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::stomp::WireFormat;
    use crate::server::stomp::catalog::OnlinePlayersResponse;

    fn reply() -> ServerMessage {
        ServerMessage::OnlinePlayers(OnlinePlayersResponse {
            player_count: 3,
            player_names: None,
        })
    }

    #[actix_web::test]
    async fn first_reply_is_delivered_then_shim_closes() {
        let (shim, rx) = ShimConnection::new();
        assert!(shim.is_open());

        shim.enqueue_send(PreparedFrame::prepare(reply(), WireFormat::Json).unwrap());
        assert!(!shim.is_open());
        shim.enqueue_send(PreparedFrame::prepare(reply(), WireFormat::Json).unwrap());

        assert_eq!(rx.await.unwrap(), reply());
    }

    #[actix_web::test]
    async fn disconnect_drops_the_reply_channel() {
        let (shim, rx) = ShimConnection::new();
        shim.disconnect_immediately();
        shim.disconnect_immediately();
        assert!(!shim.is_open());
        assert!(rx.await.is_err());
    }
}
