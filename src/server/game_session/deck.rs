use super::messages::DeckList;
use crate::config::game::MAX_DECK_CARDS;
use crate::server::error::CoreError;

/// Refuse decks whose total copy count is over `MAX_DECK_CARDS`.
///
/// Counts come straight from the client, so this runs before a deck is stored
/// and long before it is expanded.
pub fn validate_deck(deck: &DeckList) -> Result<(), CoreError> {
    let cards: u64 = deck.cards.values().map(|count| u64::from(*count)).sum();
    if cards > MAX_DECK_CARDS {
        return Err(CoreError::OversizedDeck {
            cards,
            limit: MAX_DECK_CARDS,
        });
    }
    Ok(())
}

/// Expand a deck into one entry per copy.
///
/// Card order follows the deck map's iteration order unless `deterministic`
/// is set, in which case cards are sorted by name.
pub fn flatten_decklist(deck: &DeckList, deterministic: bool) -> Vec<String> {
    let mut entries: Vec<(&String, &u32)> = deck.cards.iter().collect();
    if deterministic {
        entries.sort_by(|a, b| a.0.cmp(b.0));
    }
    entries
        .into_iter()
        .flat_map(|(name, count)| std::iter::repeat_n(name.clone(), *count as usize))
        .collect()
}
