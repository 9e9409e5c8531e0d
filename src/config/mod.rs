//! Main configuration module.
//!
//! Compile-time constants live in the per-concern submodules; runtime settings
//! read from `config.json` live in `settings`.

pub mod dispatch;
pub mod game;
pub mod matchmaking;
pub mod protocol;
pub mod settings;
