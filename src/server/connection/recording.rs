//! In-memory connection for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::{ClientConnection, ConnectionHandle, ConnectionId, PreparedFrame};
use crate::server::stomp::ServerMessage;

pub struct RecordingConnection {
    id: ConnectionId,
    open: AtomicBool,
    disconnects: AtomicUsize,
    sent: Mutex<Vec<Arc<PreparedFrame>>>,
}

impl RecordingConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            open: AtomicBool::new(true),
            disconnects: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn handle(self: &Arc<Self>) -> ConnectionHandle {
        self.clone()
    }

    pub fn frames(&self) -> Vec<Arc<PreparedFrame>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<ServerMessage> {
        self.frames().iter().map(|f| f.message().clone()).collect()
    }

    /// Messages received so far, clearing the record.
    pub fn take_messages(&self) -> Vec<ServerMessage> {
        let frames = std::mem::take(&mut *self.sent.lock().unwrap());
        frames.iter().map(|f| f.message().clone()).collect()
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Simulate the peer going away.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl ClientConnection for RecordingConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn enqueue_send(&self, frame: Arc<PreparedFrame>) {
        if self.is_open() {
            self.sent.lock().unwrap().push(frame);
        }
    }

    fn disconnect_immediately(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
