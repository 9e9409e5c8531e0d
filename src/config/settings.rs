//! Runtime settings.
//!
//! Read once at startup from a JSON file with kebab-case keys. Every key is
//! optional; a missing file yields the defaults.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable that overrides the settings file location.
pub const CONFIG_PATH_ENV: &str = "CARD_RELAY_CONFIG";

/// Settings file looked up in the working directory when no override is set.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerSettings {
    pub bind_address: String,
    pub ws_port: u16,
    pub carddata_directory: PathBuf,
    /// Keep players in the order the lane (or the direct-match proposer) supplied them.
    pub disable_player_order_randomization: bool,
    /// Reseed every random source with a constant. Debugging only.
    pub debug_fixed_rng_seed: bool,
    #[serde(rename = "debug-enable-deterministic-decklist-preperation")]
    pub deterministic_decklists: bool,
    pub force_json_for_all_sent_messages: bool,
    pub ready_up_timeout_secs: u32,
    /// Answer implemented-card queries with the real card list.
    pub enable_reporting_all_implemented_cards: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            ws_port: 10850,
            carddata_directory: PathBuf::from("card-data"),
            disable_player_order_randomization: false,
            debug_fixed_rng_seed: false,
            deterministic_decklists: false,
            force_json_for_all_sent_messages: false,
            ready_up_timeout_secs: crate::config::game::DEFAULT_READY_UP_TIMEOUT_SECS,
            enable_reporting_all_implemented_cards: true,
        }
    }
}

impl ServerSettings {
    /// Load settings from `$CARD_RELAY_CONFIG`, falling back to `config.json`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("[Config] {} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if settings.debug_fixed_rng_seed {
            warn!("[Config] debug-fixed-rng-seed is enabled; matches are not random");
        }
        info!("[Config] Loaded settings from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let settings: ServerSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, ServerSettings::default());
        assert_eq!(settings.ws_port, 10850);
    }

    #[test]
    fn kebab_case_keys_are_read() {
        let settings: ServerSettings = serde_json::from_str(
            r#"{
                "ws-port": 9000,
                "carddata-directory": "/srv/cards",
                "disable-player-order-randomization": true,
                "debug-enable-deterministic-decklist-preperation": true
            }"#,
        )
        .unwrap();
        assert_eq!(settings.ws_port, 9000);
        assert_eq!(settings.carddata_directory, PathBuf::from("/srv/cards"));
        assert!(settings.disable_player_order_randomization);
        assert!(settings.deterministic_decklists);
        assert!(!settings.debug_fixed_rng_seed);
        assert!(settings.enable_reporting_all_implemented_cards);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("duel-relay-missing-{}.json", uuid::Uuid::new_v4()));
        let settings = ServerSettings::load_from(&path).unwrap();
        assert_eq!(settings, ServerSettings::default());
    }

    #[test]
    fn invalid_file_is_reported() {
        let path = std::env::temp_dir().join(format!("duel-relay-bad-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ not json").unwrap();
        let result = ServerSettings::load_from(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
