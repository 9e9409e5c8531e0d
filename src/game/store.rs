//! Card and rule data.
//!
//! The directory layout is `<root>/<set>/<card>.json` for cards (the set is the
//! card name up to its first `_`), `<root>/game-data-Base.json` for the shared
//! rules and `<root>/feature-flags.json` for client feature flags. Definitions
//! are kept as validated JSON text and forwarded to clients untouched.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use thiserror::Error;

pub const BASE_RULESET_FILE: &str = "game-data-Base.json";
pub const FEATURE_FLAGS_FILE: &str = "feature-flags.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no card data for {0}")]
    MissingCard(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSource {
    pub name: String,
    pub definition: String,
}

/// Read-only source of card and rule data.
pub trait CardStore {
    fn load_cards_by_name(&self, names: &[String]) -> Result<Vec<CardSource>, StoreError>;
    fn load_base_ruleset(&self) -> Result<RuleSet, StoreError>;
    fn load_feature_flags(&self) -> Result<BTreeMap<String, bool>, StoreError>;
    /// Every card this store can serve.
    fn card_names(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Deserialize)]
struct FeatureFlagsFile {
    #[serde(rename = "featureMap")]
    feature_map: BTreeMap<String, bool>,
}

#[derive(Debug, Clone)]
pub struct DirectoryCardStore {
    root: PathBuf,
}

impl DirectoryCardStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn card_path(&self, name: &str) -> PathBuf {
        let set = name.split('_').next().unwrap_or(name);
        self.root.join(set).join(format!("{name}.json"))
    }

    fn read_json_text(path: &Path) -> Result<String, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str::<serde::de::IgnoredAny>(&text).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(text)
    }

    fn list_dir(path: &Path) -> Result<std::fs::ReadDir, StoreError> {
        std::fs::read_dir(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl CardStore for DirectoryCardStore {
    fn load_cards_by_name(&self, names: &[String]) -> Result<Vec<CardSource>, StoreError> {
        names
            .iter()
            .map(|name| {
                let path = self.card_path(name);
                if !path.is_file() {
                    return Err(StoreError::MissingCard(name.clone()));
                }
                Ok(CardSource {
                    name: name.clone(),
                    definition: Self::read_json_text(&path)?,
                })
            })
            .collect()
    }

    fn load_base_ruleset(&self) -> Result<RuleSet, StoreError> {
        let definition = Self::read_json_text(&self.root.join(BASE_RULESET_FILE))?;
        Ok(RuleSet {
            name: "Base".to_string(),
            definition,
        })
    }

    fn load_feature_flags(&self) -> Result<BTreeMap<String, bool>, StoreError> {
        let path = self.root.join(FEATURE_FLAGS_FILE);
        let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let file: FeatureFlagsFile =
            serde_json::from_str(&text).map_err(|source| StoreError::Json { path, source })?;
        Ok(file.feature_map)
    }

    fn card_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for set_dir in Self::list_dir(&self.root)?.flatten() {
            let path = set_dir.path();
            let hidden = set_dir.file_name().to_string_lossy().starts_with('.');
            if hidden || !path.is_dir() {
                continue;
            }
            for card in Self::list_dir(&path)?.flatten() {
                let card_path = card.path();
                if card_path.extension().is_some_and(|ext| ext == "json") {
                    if let Some(stem) = card_path.file_stem() {
                        names.push(stem.to_string_lossy().into_owned());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Data shared by every match, loaded once at startup.
#[derive(Debug, Default)]
pub struct SharedCaches {
    pub rules: Arc<RuleSet>,
    pub feature_flags: BTreeMap<String, bool>,
    cards: HashMap<String, CardSource>,
}

impl SharedCaches {
    pub fn new(rules: RuleSet, feature_flags: BTreeMap<String, bool>, cards: Vec<CardSource>) -> Self {
        Self {
            rules: Arc::new(rules),
            feature_flags,
            cards: cards.into_iter().map(|card| (card.name.clone(), card)).collect(),
        }
    }

    pub fn load(store: &dyn CardStore) -> Result<Self, StoreError> {
        let rules = store.load_base_ruleset()?;
        let feature_flags = store.load_feature_flags()?;
        let names = store.card_names()?;
        let cards = store.load_cards_by_name(&names)?;
        info!(
            "[CardStore] Loaded {} cards and {} feature flags",
            cards.len(),
            feature_flags.len()
        );
        Ok(Self::new(rules, feature_flags, cards))
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn card_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.cards.keys().map(String::as_str)
    }

    /// Card data for `names`. Unknown cards are skipped; legality is the engine's call.
    pub fn cards_for<'a>(&self, names: impl IntoIterator<Item = &'a String>) -> Vec<CardSource> {
        names
            .into_iter()
            .filter_map(|name| match self.cards.get(name) {
                Some(card) => Some(card.clone()),
                None => {
                    warn!("[CardStore] No card data for {}", name);
                    None
                }
            })
            .collect()
    }
}

/// The implemented-card list as clients receive it, with its checksum.
///
/// Names are sorted and joined with `|`; the checksum is the lowercase hex
/// SHA-512 of that text, so a client can cache the list and resend the checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardManifest {
    joined_names: String,
    checksum: String,
}

impl CardManifest {
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut names: Vec<&str> = names.into_iter().collect();
        names.sort_unstable();
        let joined_names = names.join("|");
        let checksum = hex::encode(Sha512::digest(joined_names.as_bytes()));
        Self { joined_names, checksum }
    }

    pub fn joined_names(&self) -> &str {
        &self.joined_names
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn matches(&self, checksum: Option<&str>) -> bool {
        checksum == Some(self.checksum.as_str())
    }
}
