//! Dispatch loop timing.

/// Pause between two drains of the inbound queue (milliseconds).
pub const POLL_INTERVAL_MS: u64 = 10;

/// How long an HTTP query waits for the dispatch loop to answer (seconds).
pub const SHIM_REPLY_TIMEOUT_SECS: u64 = 5;
