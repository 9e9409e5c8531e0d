//! Wire protocol limits.
//!
//! Bounds enforced by the frame codec and the WebSocket connection actor.

/// Longest accepted header line, terminator excluded.
pub const MAX_LINE_LENGTH: usize = 256;

/// Longest accepted verb line.
pub const MAX_COMMAND_LENGTH: usize = 16;

/// Maximum number of header lines in one frame.
pub const MAX_HEADERS: usize = 6;

/// Capacity of the per-connection fragment accumulator, in bytes.
pub const MESSAGE_ACCUMULATOR_SIZE: usize = 32 * 1024;

/// Interval between server pings (seconds).
pub const HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// A connection silent for longer than this is dropped (seconds).
pub const CLIENT_TIMEOUT_SECS: u64 = 30;

/// WebSocket route clients connect to.
pub const STOMP_ENDPOINT: &str = "/websocket/v1/external/stomp";

/// Query id that asks the server to echo a `QueryMessage` back.
pub const REFLECT_MESSAGE_MAGIC: &str = "REFLECT_MESSAGE_MAGIC";

/// HTTP route listing the players currently online.
pub const ONLINE_PLAYERS_ENDPOINT: &str = "/players";
