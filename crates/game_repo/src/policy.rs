//! Eviction thresholds

use game_logic::{GameState, LifecycleSnapshot};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Lobby games are reclaimed after this long.
pub const MAX_LOBBY_AGE: Duration = Duration::from_secs(15 * 60);
/// Running games are reclaimed after this long.
pub const MAX_IN_PROGRESS_AGE: Duration = Duration::from_secs(3 * 60 * 60);
/// Games without a single connected player are reclaimed after this long.
pub const EMPTY_GAME_GRACE: Duration = Duration::from_secs(2);

/// Why a game was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EvictionReason {
    LobbyExpired,
    InProgressExpired,
    NoPlayersConnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub max_lobby_age: Duration,
    pub max_in_progress_age: Duration,
    pub empty_game_grace: Duration,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            max_lobby_age: MAX_LOBBY_AGE,
            max_in_progress_age: MAX_IN_PROGRESS_AGE,
            empty_game_grace: EMPTY_GAME_GRACE,
        }
    }
}

impl EvictionPolicy {
    /// Decides whether a game should go at `now`.
    ///
    /// Age counts from the last phase change, so a game that just finished
    /// and returned to the lobby starts a fresh lobby period.
    pub fn evaluate(&self, lifecycle: LifecycleSnapshot, now: Instant) -> Option<EvictionReason> {
        if let Some(empty_since) = lifecycle.empty_since {
            if now.saturating_duration_since(empty_since) > self.empty_game_grace {
                return Some(EvictionReason::NoPlayersConnected);
            }
        }

        let age = now.saturating_duration_since(lifecycle.phase_since);
        match lifecycle.state {
            GameState::InLobby if age > self.max_lobby_age => Some(EvictionReason::LobbyExpired),
            GameState::InLobby => None,
            _ if age > self.max_in_progress_age => Some(EvictionReason::InProgressExpired),
            _ => None,
        }
    }
}
