//! # Game Logic
//!
//! Everything that happens inside a single game of the party card game:
//! the immutable card catalog, per-game decks, players with their hands and
//! the lifecycle state machine that drives rounds.
//!
//! ## Architecture Overview
//!
//! - [`Catalog`] is loaded once at startup and shared read-only by every game
//!   through an `Arc`.
//! - A [`Deck`] is built from the packs a game selected and is owned by that
//!   game alone.
//! - A [`Game`] owns its players, deck and settings behind one mutex. Every
//!   operation is a single critical section, so callers never observe a
//!   half-applied transition.
//!
//! Registry concerns (looking games up, eviction) and networking live in the
//! `game_repo` and `game_server` crates.
//!
//! ## Example
//!
//! ```ignore
//! let catalog = Arc::new(Catalog::load_from_file("cards.json")?);
//! let settings = GameSettings::default_for(&catalog)?;
//! let game = Game::new(catalog, settings, "Dave")?;
//! game.add_player("Bob")?;
//! game.add_player("Eve")?;
//! game.start_game()?;
//! ```

pub mod catalog;
pub mod deck;
pub mod error;
pub mod game;
pub mod player;
pub mod settings;
pub mod types;

#[cfg(test)]
mod test_support;

pub use catalog::{CardPack, Catalog, CatalogSource, SourceBlackCard, SourcePack};
pub use deck::Deck;
pub use error::{
    CatalogError, CatalogResult, DeckError, ErrorKind, GameError, GameResult, PlayerError,
    SettingsViolation,
};
pub use game::{
    Game, GameInfo, GameMetrics, GameOver, GameOverReason, GameState, GameStateInfo,
    LifecycleSnapshot, PlayOutcome, PlayerInfo, PlayerRemoval, RoundInfo, RoundOutcome,
    RoundWinner, SubmittedPlay, HAND_SIZE,
};
pub use player::Player;
pub use settings::GameSettings;
pub use types::{BlackCard, CardId, GameId, PackId, PlayerId, WhiteCard};
