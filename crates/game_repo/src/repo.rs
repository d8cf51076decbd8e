//! The process-wide game registry
//!
//! Locking follows two tiers: the registry's `RwLock` guards the id map and
//! the age ordering, every [`Game`] guards its own fields. Callers that need
//! both always take the registry lock first and only nest the game lock
//! inside it.

use crate::error::{RepoError, RepoResult};
use crate::policy::{EvictionPolicy, EvictionReason};
use game_logic::{
    Catalog, Game, GameError, GameId, GameInfo, GameSettings, PlayerId, PlayerRemoval,
};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct GameRepo {
    catalog: Arc<Catalog>,
    policy: EvictionPolicy,
    inner: RwLock<RepoInner>,
}

#[derive(Default)]
struct RepoInner {
    games: HashMap<GameId, Arc<Game>>,
    /// Oldest first
    by_age: BTreeSet<(Instant, GameId)>,
}

impl RepoInner {
    fn insert(&mut self, game: Arc<Game>) {
        self.by_age.insert((game.created_at(), game.id()));
        self.games.insert(game.id(), game);
    }

    fn remove(&mut self, game_id: GameId) -> Option<Arc<Game>> {
        let game = self.games.remove(&game_id)?;
        self.by_age.remove(&(game.created_at(), game_id));
        Some(game)
    }

    fn game(&self, game_id: GameId) -> RepoResult<&Arc<Game>> {
        self.games
            .get(&game_id)
            .ok_or(RepoError::GameNotFound(game_id))
    }
}

impl GameRepo {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_policy(catalog, EvictionPolicy::default())
    }

    pub fn with_policy(catalog: Arc<Catalog>, policy: EvictionPolicy) -> Self {
        Self {
            catalog,
            policy,
            inner: RwLock::new(RepoInner::default()),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Creates and registers a game, returning its id and the owner's player id.
    ///
    /// The game is fully constructed before the registry lock is taken, so a
    /// failed construction never leaves anything behind.
    pub fn create_game(
        &self,
        settings: GameSettings,
        owner_name: &str,
    ) -> RepoResult<(GameId, PlayerId)> {
        let game = Game::new(self.catalog.clone(), settings, owner_name).map_err(|err| {
            warn!("Cannot create game for '{}': {}", owner_name, err);
            err
        })?;
        let ids = (game.id(), game.owner());

        self.inner.write().insert(Arc::new(game));

        info!("🎮 Created game {} for '{}'", ids.0, owner_name);
        Ok(ids)
    }

    pub fn remove_game(&self, game_id: GameId) -> RepoResult<()> {
        self.inner
            .write()
            .remove(game_id)
            .map(|_| info!("🗑️ Removed game {}", game_id))
            .ok_or(RepoError::GameNotFound(game_id))
    }

    pub fn get_game(&self, game_id: GameId) -> RepoResult<Arc<Game>> {
        self.inner.read().game(game_id).cloned()
    }

    pub fn get_games(&self) -> Vec<Arc<Game>> {
        self.inner.read().games.values().cloned().collect()
    }

    /// Lobby listing, oldest game first.
    pub fn game_infos(&self) -> Vec<GameInfo> {
        let inner = self.inner.read();
        inner
            .by_age
            .iter()
            .filter_map(|(_, id)| inner.games.get(id))
            .map(|game| game.info())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-enters an already issued player identity.
    pub fn join_game(&self, game_id: GameId, player_id: PlayerId, password: &str) -> RepoResult<()> {
        let inner = self.inner.read();
        let game = inner.game(game_id)?;

        if !game.check_password(password) {
            debug!("Wrong password for game {}", game_id);
            return Err(RepoError::WrongPassword);
        }

        if !game.has_player(player_id) {
            return Err(RepoError::PlayerNotFound { game_id, player_id });
        }

        Ok(())
    }

    /// Mints a new player in an existing game.
    pub fn create_player(&self, game_id: GameId, name: &str, password: &str) -> RepoResult<PlayerId> {
        let inner = self.inner.read();
        let game = inner.game(game_id)?;

        if !game.check_password(password) {
            return Err(RepoError::WrongPassword);
        }

        Ok(game.add_player(name)?)
    }

    pub fn connect_player(&self, game_id: GameId, player_id: PlayerId) -> RepoResult<()> {
        self.set_connected(game_id, player_id, true)
    }

    pub fn disconnect_player(&self, game_id: GameId, player_id: PlayerId) -> RepoResult<()> {
        self.set_connected(game_id, player_id, false)
    }

    fn set_connected(&self, game_id: GameId, player_id: PlayerId, connected: bool) -> RepoResult<()> {
        let inner = self.inner.read();
        inner
            .game(game_id)?
            .set_player_connected(player_id, connected)
            .map_err(|err| player_error(game_id, err))
    }

    /// Removes a player and deregisters the game once nobody is left.
    pub fn player_leave_game(&self, game_id: GameId, player_id: PlayerId) -> RepoResult<PlayerRemoval> {
        let mut inner = self.inner.write();
        let removal = inner
            .game(game_id)?
            .remove_player(player_id)
            .map_err(|err| player_error(game_id, err))?;

        if removal.players_left == 0 {
            info!("Game {} has no players left, removing it", game_id);
            inner.remove(game_id);
        }

        Ok(removal)
    }

    pub fn get_player_name(&self, game_id: GameId, player_id: PlayerId) -> RepoResult<String> {
        let inner = self.inner.read();
        inner
            .game(game_id)?
            .player_name(player_id)
            .map_err(|err| player_error(game_id, err))
    }

    pub fn change_settings(&self, game_id: GameId, settings: GameSettings) -> RepoResult<()> {
        let inner = self.inner.read();
        Ok(inner.game(game_id)?.change_settings(settings)?)
    }

    /// Evicts every game the policy considers expired at `now`.
    ///
    /// Map and age ordering are updated together under the write lock.
    /// Running it again with the same `now` evicts nothing.
    pub fn sweep(&self, now: Instant) -> Vec<(GameId, EvictionReason)> {
        let mut inner = self.inner.write();

        let expired: Vec<(GameId, EvictionReason)> = inner
            .by_age
            .iter()
            .filter_map(|&(_, id)| {
                let game = inner.games.get(&id)?;
                self.policy
                    .evaluate(game.lifecycle(), now)
                    .map(|reason| (id, reason))
            })
            .collect();

        for (id, reason) in &expired {
            inner.remove(*id);
            info!("🧹 Evicted game {} ({:?})", id, reason);
        }

        expired
    }
}

fn player_error(game_id: GameId, err: GameError) -> RepoError {
    match err {
        GameError::PlayerNotFound(player_id) => RepoError::PlayerNotFound { game_id, player_id },
        other => RepoError::Game(other),
    }
}
