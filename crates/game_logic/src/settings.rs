//! Game settings and their validation rules.

use crate::catalog::Catalog;
use crate::error::{CatalogResult, SettingsViolation};
use crate::types::PackId;
use serde::{Deserialize, Serialize};

pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 100;

pub const MIN_PLAYING_TO_POINTS: u32 = 2;
pub const MAX_PLAYING_TO_POINTS: u32 = 50;

pub const MAX_PASSWORD_LENGTH: usize = 50;

pub const MIN_PLAYERS: u32 = 3;
pub const MAX_PLAYERS: u32 = 20;

pub const MIN_CARD_PACKS: usize = 1;

/// Per-game configuration, replaced only as a whole and only in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Game ends when this amount of rounds is reached
    pub max_rounds: u32,
    /// Game ends when someone reaches this amount of points
    pub playing_to_points: u32,
    /// Plaintext password, empty string means no password
    #[serde(rename = "gamePassword", default)]
    pub password: String,
    pub max_players: u32,
    pub card_packs: Vec<PackId>,
}

impl GameSettings {
    /// Default settings using the catalog's default pack.
    pub fn default_for(catalog: &Catalog) -> CatalogResult<Self> {
        Ok(Self {
            max_rounds: MAX_ROUNDS,
            playing_to_points: 10,
            password: String::new(),
            max_players: 10,
            card_packs: vec![catalog.default_pack()?.id],
        })
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    /// Checks every bound and reports each violation independently.
    pub fn validate(&self) -> Result<(), Vec<SettingsViolation>> {
        let mut violations = Vec::new();

        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&self.max_rounds) {
            violations.push(SettingsViolation::MaxRounds {
                value: self.max_rounds,
                min: MIN_ROUNDS,
                max: MAX_ROUNDS,
            });
        }

        if !(MIN_PLAYING_TO_POINTS..=MAX_PLAYING_TO_POINTS).contains(&self.playing_to_points) {
            violations.push(SettingsViolation::PlayingToPoints {
                value: self.playing_to_points,
                min: MIN_PLAYING_TO_POINTS,
                max: MAX_PLAYING_TO_POINTS,
            });
        }

        let password_length = self.password.chars().count();
        if password_length > MAX_PASSWORD_LENGTH {
            violations.push(SettingsViolation::PasswordTooLong {
                length: password_length,
                max: MAX_PASSWORD_LENGTH,
            });
        }

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.max_players) {
            violations.push(SettingsViolation::MaxPlayers {
                value: self.max_players,
                min: MIN_PLAYERS,
                max: MAX_PLAYERS,
            });
        }

        if self.card_packs.len() < MIN_CARD_PACKS {
            violations.push(SettingsViolation::NoCardPacks {
                min: MIN_CARD_PACKS,
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// [`validate`](Self::validate) plus a check that every selected pack exists.
    pub fn validate_with(&self, catalog: &Catalog) -> Result<(), Vec<SettingsViolation>> {
        let mut violations = self.validate().err().unwrap_or_default();
        violations.extend(
            self.card_packs
                .iter()
                .filter(|&&id| !catalog.contains_pack(id))
                .map(|&id| SettingsViolation::UnknownPack(id)),
        );

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::catalog_with;

    fn valid() -> GameSettings {
        GameSettings {
            max_rounds: 10,
            playing_to_points: 10,
            password: String::new(),
            max_players: 10,
            card_packs: vec![PackId::new()],
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut settings = valid();
        settings.max_rounds = MAX_ROUNDS;
        settings.playing_to_points = MIN_PLAYING_TO_POINTS;
        settings.max_players = MAX_PLAYERS;
        settings.password = "x".repeat(MAX_PASSWORD_LENGTH);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_every_violation_is_reported() {
        let settings = GameSettings {
            max_rounds: 0,
            playing_to_points: 51,
            password: "p".repeat(51),
            max_players: 2,
            card_packs: vec![],
        };
        let violations = settings.validate().unwrap_err();
        assert_eq!(violations.len(), 5);
        assert!(violations.contains(&SettingsViolation::NoCardPacks { min: 1 }));
        assert!(violations.contains(&SettingsViolation::MaxPlayers {
            value: 2,
            min: 3,
            max: 20
        }));
    }

    #[test]
    fn test_unknown_pack_is_reported() {
        let catalog = catalog_with(10, 2);
        let settings = valid();
        let violations = settings.validate_with(&catalog).unwrap_err();
        assert!(matches!(violations[0], SettingsViolation::UnknownPack(_)));

        let settings = GameSettings::default_for(&catalog).unwrap();
        assert!(settings.validate_with(&catalog).is_ok());
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"maxRounds":5,"playingToPoints":7,"gamePassword":"pw","maxPlayers":4,"cardPacks":[]}"#;
        let settings: GameSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.max_rounds, 5);
        assert_eq!(settings.password, "pw");
        assert!(settings.has_password());
    }
}
