//! Decides which of two paired players takes seat 0.
//!
//! Lanes and direct matches hand players over in a fixed order (oldest queued,
//! or proposer first); the engine may favour seat 0, so the order is shuffled
//! unless disabled in the settings.

use log::debug;

use crate::config::settings::ServerSettings;
use crate::game::random::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerOrderPolicy {
    Randomized,
    AsSupplied,
}

impl PlayerOrderPolicy {
    pub fn from_settings(settings: &ServerSettings) -> Self {
        if settings.disable_player_order_randomization {
            PlayerOrderPolicy::AsSupplied
        } else {
            PlayerOrderPolicy::Randomized
        }
    }

    pub fn order<T>(self, first: T, second: T, random: &mut dyn RandomSource) -> (T, T) {
        match self {
            PlayerOrderPolicy::Randomized if random.coin_flip() => {
                debug!("[GameServer] Swapping player order");
                (second, first)
            }
            _ => (first, second),
        }
    }
}
