//! Registry errors

use game_logic::{ErrorKind, GameError, GameId, PlayerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Cannot find game {0}")]
    GameNotFound(GameId),

    #[error("Incorrect password")]
    WrongPassword,

    #[error("Cannot find player {player_id} in game {game_id}")]
    PlayerNotFound { game_id: GameId, player_id: PlayerId },

    #[error(transparent)]
    Game(#[from] GameError),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoError::GameNotFound(_) | RepoError::PlayerNotFound { .. } => ErrorKind::NotFound,
            RepoError::WrongPassword => ErrorKind::Validation,
            RepoError::Game(err) => err.kind(),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
