//! Server and transport error types

use game_logic::{ErrorKind, GameError};
use game_repo::RepoError;
use serde::Serialize;
use thiserror::Error;

/// Failures of a single connection's transport.
///
/// These never reach other players; they only flip the owner's
/// connectivity flag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,

    #[error("Outbound queue is full")]
    QueueFull,

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Timed out waiting for the client")]
    Timeout,
}

/// Errors that can occur while running the server or serving a command.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding, accepting or upgrading a socket failed
    #[error("Network error: {0}")]
    Network(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Malformed message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Error category sent to clients alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Validation,
    StateConflict,
    NotFound,
    ResourceExhausted,
    Transport,
}

impl From<ErrorKind> for ErrorCategory {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => ErrorCategory::Validation,
            ErrorKind::StateConflict => ErrorCategory::StateConflict,
            ErrorKind::NotFound => ErrorCategory::NotFound,
            ErrorKind::ResourceExhausted => ErrorCategory::ResourceExhausted,
        }
    }
}

impl ServerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ServerError::Repo(err) => err.kind().into(),
            ServerError::Game(err) => err.kind().into(),
            ServerError::Serialization(_) | ServerError::Handshake(_) => ErrorCategory::Validation,
            ServerError::Config(_) => ErrorCategory::StateConflict,
            ServerError::Network(_) | ServerError::Transport(_) => ErrorCategory::Transport,
        }
    }
}
