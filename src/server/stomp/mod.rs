//! STOMP-over-WebSocket wire layer.
//!
//! `frame` splits raw bytes into verb, headers and body; `accumulator` joins
//! WebSocket fragments; `codec` maps bodies to `catalog` messages using the
//! JSON or binary strategy named by the frame's content type.

pub mod accumulator;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod frame;

pub use catalog::{ClientMessage, ServerMessage};
pub use codec::WireFormat;
pub use error::FrameError;
pub use frame::{StompFrame, Verb};
