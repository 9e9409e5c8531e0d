//! Application state shared by the HTTP and WebSocket handlers.

use crate::server::dispatch::InboundSender;

pub struct AppState {
    /// Queue in front of the dispatch loop. Every connection gets a clone.
    pub inbound: InboundSender,
}

impl AppState {
    pub fn new(inbound: InboundSender) -> Self {
        AppState { inbound }
    }
}
