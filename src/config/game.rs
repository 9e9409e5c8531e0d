//! Match session constants.
//!
//! Parameters that shape how operations flow between the engine and both players.

/// Number of operations kept per match to answer late input updates.
pub const OPERATION_HISTORY_DEPTH: usize = 2;

/// Seconds both clients are given to report ready after the session is created.
pub const DEFAULT_READY_UP_TIMEOUT_SECS: u32 = 60;

/// Seed used when `debug-fixed-rng-seed` is enabled.
pub const DEBUG_FIXED_RNG_SEED: u64 = 5;

/// Display name sent for a player that never provided one.
pub const UNNAMED_PLAYER: &str = "Unknown Player";

/// Largest deck a client may submit, counting every copy.
pub const MAX_DECK_CARDS: u64 = 60;

/// Sole entry of the implemented-cards list when reporting it is turned off.
pub const IMPLEMENTED_CARDS_DISABLED: &str = "feature-disabled";
