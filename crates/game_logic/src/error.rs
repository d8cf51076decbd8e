//! Error types for the card game core

use crate::types::{CardId, PackId, PlayerId};
use std::io::Error as IoError;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used by the server when reporting failures to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad settings or names. User-correctable, reported verbatim.
    Validation,
    /// Operation not valid in the current lifecycle state.
    StateConflict,
    /// Unknown game, player, pack or card.
    NotFound,
    /// The deck ran out of cards.
    ResourceExhausted,
}

/// Deck construction and draw errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeckError {
    #[error("At least one card pack must be selected")]
    EmptySelection,

    #[error("Not enough {colour} cards left in the deck: requested {requested}, remaining {remaining}")]
    Exhausted {
        colour: &'static str,
        requested: usize,
        remaining: usize,
    },
}

/// Hand and play errors for a single player
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("Player name must be between {min} and {max} characters")]
    InvalidName { min: usize, max: usize },

    #[error("Cannot play an empty set of cards")]
    EmptyPlay,

    #[error("Cards have already been played this round")]
    AlreadyPlayed,

    #[error("Card {0} is in the play more than once")]
    DuplicateInPlay(CardId),

    #[error("Card {0} is not in the hand")]
    CardNotInHand(CardId),

    #[error("Card {0} is already in the hand")]
    DuplicateCard(CardId),
}

/// A single failed settings rule
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsViolation {
    #[error("Max rounds ({value}) must be between {min} and {max}")]
    MaxRounds { value: u32, min: u32, max: u32 },

    #[error("Playing to points ({value}) must be between {min} and {max}")]
    PlayingToPoints { value: u32, min: u32, max: u32 },

    #[error("Game password ({length}) is longer than {max} characters")]
    PasswordTooLong { length: usize, max: usize },

    #[error("Max players ({value}) must be between {min} and {max}")]
    MaxPlayers { value: u32, min: u32, max: u32 },

    #[error("At least {min} card pack(s) must be selected")]
    NoCardPacks { min: usize },

    #[error("Card pack {0} does not exist")]
    UnknownPack(PackId),
}

/// Card catalog loading and lookup errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read card pack file {0}: {1}")]
    FileRead(PathBuf, IoError),

    #[error("Failed to parse card pack file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Pack '{pack}' references {colour} card {index}, but only {available} exist")]
    IndexOutOfRange {
        pack: String,
        colour: &'static str,
        index: usize,
        available: usize,
    },

    #[error("Card pack {0} does not exist")]
    PackNotFound(PackId),

    #[error("{colour} card {id} does not exist")]
    CardNotFound { colour: &'static str, id: CardId },

    #[error("The catalog does not contain any card packs")]
    NoPacks,
}

/// Game state machine errors
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid game settings: {}", format_violations(.0))]
    InvalidSettings(Vec<SettingsViolation>),

    #[error("The game is full")]
    GameFull,

    #[error("A player called '{0}' is already in the game")]
    DuplicateName(String),

    #[error("Player {0} is not in the game")]
    PlayerNotFound(PlayerId),

    #[error("Operation is not allowed while the game is {0}")]
    WrongState(crate::game::GameState),

    #[error("Cannot start until {min} players have joined (currently {current})")]
    NotEnoughPlayers { min: usize, current: usize },

    #[error("Only the game owner can do that")]
    NotGameOwner,

    #[error("Only the card czar can do that")]
    NotCzar,

    #[error("The card czar cannot play white cards")]
    CzarCannotPlay,

    #[error("The black card needs {expected} white card(s), got {got}")]
    WrongCardCount { expected: usize, got: usize },

    #[error("Player {0} has not played any cards this round")]
    NoPlaySubmitted(PlayerId),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    #[error("Deck error: {0}")]
    Deck(#[from] DeckError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl GameError {
    /// Maps the error onto the client-facing error categories.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::InvalidSettings(_)
            | GameError::DuplicateName(_)
            | GameError::WrongCardCount { .. } => ErrorKind::Validation,
            GameError::Player(PlayerError::InvalidName { .. })
            | GameError::Player(PlayerError::EmptyPlay)
            | GameError::Player(PlayerError::DuplicateInPlay(_)) => ErrorKind::Validation,
            GameError::Player(PlayerError::CardNotInHand(_)) => ErrorKind::NotFound,
            GameError::Player(_) => ErrorKind::StateConflict,
            GameError::GameFull
            | GameError::WrongState(_)
            | GameError::NotEnoughPlayers { .. }
            | GameError::NotGameOwner
            | GameError::NotCzar
            | GameError::CzarCannotPlay
            | GameError::NoPlaySubmitted(_) => ErrorKind::StateConflict,
            GameError::PlayerNotFound(_) => ErrorKind::NotFound,
            GameError::Deck(DeckError::EmptySelection) => ErrorKind::Validation,
            GameError::Deck(DeckError::Exhausted { .. }) => ErrorKind::ResourceExhausted,
            GameError::Catalog(_) => ErrorKind::NotFound,
        }
    }
}

fn format_violations(violations: &[SettingsViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type GameResult<T> = Result<T, GameError>;
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_settings_lists_every_violation() {
        let err = GameError::InvalidSettings(vec![
            SettingsViolation::MaxRounds {
                value: 0,
                min: 1,
                max: 100,
            },
            SettingsViolation::NoCardPacks { min: 1 },
        ]);
        let message = err.to_string();
        assert!(message.contains("Max rounds (0)"));
        assert!(message.contains("card pack"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_exhausted_deck_is_resource_exhaustion() {
        let err: GameError = DeckError::Exhausted {
            colour: "white",
            requested: 7,
            remaining: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    }
}
