//! # Core Type Definitions
//!
//! Identifier wrappers and the immutable card types shared by every game.
//!
//! ## Key Types
//!
//! - [`GameId`] / [`PlayerId`] / [`PackId`] - UUID wrappers that cannot be confused with each other
//! - [`WhiteCard`] - an answer card, identified by its catalog index
//! - [`BlackCard`] - a prompt card with the number of answers it requires

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Index of a card inside the catalog's white or black sequence.
pub type CardId = usize;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random identifier using UUID v4.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a running game session.
    GameId
);

uuid_id!(
    /// Opaque per-player token issued when a player is created.
    ///
    /// Holding this id is the only credential needed to re-enter a game.
    PlayerId
);

uuid_id!(
    /// Identifier minted for every card pack when the catalog is built.
    PackId
);

// ============================================================================
// Cards
// ============================================================================

/// A white (answer) card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WhiteCard {
    pub id: CardId,
    pub text: String,
}

impl WhiteCard {
    pub fn new(id: CardId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// A black (prompt) card.
///
/// `pick` is the number of white cards every player must submit while this
/// card is face up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlackCard {
    pub id: CardId,
    pub text: String,
    pub pick: u32,
}

impl BlackCard {
    pub fn new(id: CardId, text: impl Into<String>, pick: u32) -> Self {
        Self {
            id,
            text: text.into(),
            pick,
        }
    }
}
