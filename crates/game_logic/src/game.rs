//! Game state machine
//!
//! Every mutable field of a [`Game`] lives behind a single mutex. All public
//! methods take that lock for their whole critical section, so state changes on
//! one game are linearised while different games proceed independently.
//!
//! ## Lifecycle
//!
//! ```text
//! InLobby --start_game--> SelectingWhiteCards
//! SelectingWhiteCards --(last non-czar play)--> CzarJudging
//! CzarJudging --czar_select_winner--> DisplayingWinner
//! DisplayingWinner --next_round--> SelectingWhiteCards | InLobby (game over)
//! ```

use crate::catalog::Catalog;
use crate::deck::Deck;
use crate::error::{GameError, GameResult};
use crate::player::Player;
use crate::settings::{GameSettings, MIN_PLAYERS};
use crate::types::{BlackCard, CardId, GameId, PlayerId, WhiteCard};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Number of white cards every player holds at the start of a round.
pub const HAND_SIZE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameState {
    InLobby,
    SelectingWhiteCards,
    CzarJudging,
    DisplayingWinner,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameState::InLobby => "in the lobby",
            GameState::SelectingWhiteCards => "selecting white cards",
            GameState::CzarJudging => "waiting for the czar",
            GameState::DisplayingWinner => "displaying the winner",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Projections
// ============================================================================

/// Lobby listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub id: GameId,
    pub player_count: usize,
    pub max_players: u32,
    pub playing_to: u32,
    pub has_password: bool,
    pub state: GameState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub connected: bool,
    pub points: u32,
    pub has_played: bool,
}

/// Everything a player may see about the game, without anybody's hand.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateInfo {
    pub id: GameId,
    pub state: GameState,
    pub settings: GameSettings,
    pub players: Vec<PlayerInfo>,
    pub owner_id: PlayerId,
    pub czar_id: Option<PlayerId>,
    pub round: u32,
    pub black_card: Option<BlackCard>,
    pub last_winner: Option<PlayerId>,
}

/// Round view containing every player's hand.
///
/// Never send this to clients as-is; it exists so the caller can build one
/// filtered view per player.
#[derive(Debug, Clone)]
pub struct RoundInfo {
    pub round: u32,
    pub czar_id: PlayerId,
    pub black_card: BlackCard,
    pub hands: HashMap<PlayerId, Vec<WhiteCard>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetrics {
    pub players: usize,
    pub connected_players: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedPlay {
    pub player_id: PlayerId,
    pub cards: Vec<WhiteCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundWinner {
    pub player_id: PlayerId,
    pub name: String,
    pub cards: Vec<WhiteCard>,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GameOverReason {
    MaxRounds,
    PointsReached,
    DeckExhausted,
    NotEnoughPlayers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOver {
    pub reason: GameOverReason,
    pub winners: Vec<PlayerId>,
}

/// Result of a successful `play_cards`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    /// Every non-czar player has played and the czar is now judging
    pub judging_started: bool,
    /// The plays up for judging, taken under the same lock. Empty unless judging started.
    pub plays: Vec<SubmittedPlay>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    Started { round: u32, czar_id: PlayerId },
    GameOver(GameOver),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerRemoval {
    pub players_left: usize,
    pub new_owner: Option<PlayerId>,
    /// The czar left mid-round; plays went back to hands and a new czar was chosen
    pub round_voided: bool,
    pub judging_started: bool,
    /// The plays up for judging when `judging_started` is set
    pub plays: Vec<SubmittedPlay>,
    pub game_over: Option<GameOver>,
}

/// Fields the registry needs to decide on eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub state: GameState,
    /// When the game last entered the lobby or started running
    pub phase_since: Instant,
    pub empty_since: Option<Instant>,
}

// ============================================================================
// Game
// ============================================================================

pub struct Game {
    id: GameId,
    created_at: Instant,
    catalog: Arc<Catalog>,
    inner: Mutex<GameInner>,
}

struct GameInner {
    /// Join order, defines czar rotation
    players: Vec<PlayerId>,
    players_map: HashMap<PlayerId, Player>,
    czar: Option<PlayerId>,
    /// Set when the czar left the winner screen; rotation resumes after this player
    rotation_anchor: Option<PlayerId>,
    owner: PlayerId,
    round: u32,
    settings: GameSettings,
    black_card: Option<Arc<BlackCard>>,
    deck: Option<Deck>,
    state: GameState,
    last_winner: Option<PlayerId>,
    phase_since: Instant,
    empty_since: Option<Instant>,
    rng: StdRng,
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates a game in the lobby with `owner_name` as its only player.
    pub fn new(catalog: Arc<Catalog>, settings: GameSettings, owner_name: &str) -> GameResult<Self> {
        Self::with_rng(catalog, settings, owner_name, StdRng::from_entropy())
    }

    /// Same as [`Game::new`] with an explicit randomness source.
    pub fn with_rng(
        catalog: Arc<Catalog>,
        settings: GameSettings,
        owner_name: &str,
        rng: StdRng,
    ) -> GameResult<Self> {
        settings
            .validate_with(&catalog)
            .map_err(GameError::InvalidSettings)?;

        let owner = Player::new(owner_name)?;
        let owner_id = owner.id;
        let created_at = Instant::now();

        let mut players_map = HashMap::new();
        players_map.insert(owner_id, owner);

        Ok(Self {
            id: GameId::new(),
            created_at,
            catalog,
            inner: Mutex::new(GameInner {
                players: vec![owner_id],
                players_map,
                czar: None,
                rotation_anchor: None,
                owner: owner_id,
                round: 0,
                settings,
                black_card: None,
                deck: None,
                state: GameState::InLobby,
                last_winner: None,
                phase_since: created_at,
                // The owner has not opened a connection yet
                empty_since: Some(created_at),
                rng,
            }),
        })
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn owner(&self) -> PlayerId {
        self.inner.lock().owner
    }

    pub fn is_owner(&self, player_id: PlayerId) -> bool {
        self.inner.lock().owner == player_id
    }

    pub fn state(&self) -> GameState {
        self.inner.lock().state
    }

    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.inner.lock().players_map.contains_key(&player_id)
    }

    pub fn check_password(&self, password: &str) -> bool {
        self.inner.lock().settings.password == password
    }

    pub fn player_name(&self, player_id: PlayerId) -> GameResult<String> {
        let inner = self.inner.lock();
        inner
            .player(player_id)
            .map(|player| player.name.clone())
    }

    /// Adds a player, dealing a hand straight away if a round is running.
    pub fn add_player(&self, name: &str) -> GameResult<PlayerId> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.players.len() >= inner.settings.max_players as usize {
            return Err(GameError::GameFull);
        }

        let mut player = Player::new(name)?;

        if inner.players_map.values().any(|existing| existing.name == name) {
            return Err(GameError::DuplicateName(name.to_string()));
        }

        if inner.state != GameState::InLobby {
            let state = inner.state;
            let deck = inner.deck.as_mut().ok_or(GameError::WrongState(state))?;
            player.deal_hand(deck.draw_white(HAND_SIZE)?);
        }

        let player_id = player.id;
        inner.players.push(player_id);
        inner.players_map.insert(player_id, player);

        info!("👤 Player '{}' ({}) joined game {}", name, player_id, self.id);
        Ok(player_id)
    }

    /// Removes a player and repairs ownership and the running round.
    pub fn remove_player(&self, player_id: PlayerId) -> GameResult<PlayerRemoval> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let position = inner
            .players
            .iter()
            .position(|&id| id == player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;
        inner.players.remove(position);
        inner.players_map.remove(&player_id);

        let mut removal = PlayerRemoval {
            players_left: inner.players.len(),
            ..Default::default()
        };

        info!("👋 Player {} left game {} ({} left)", player_id, self.id, removal.players_left);

        if inner.players.is_empty() {
            return Ok(removal);
        }

        if inner.owner == player_id {
            let index = inner.rng.gen_range(0..inner.players.len());
            let new_owner = inner.players[index];
            inner.owner = new_owner;
            removal.new_owner = Some(new_owner);
            info!("👑 Player {} is the new owner of game {}", new_owner, self.id);
        }

        inner.refresh_empty_since();

        if inner.state == GameState::InLobby {
            return Ok(removal);
        }

        if inner.players.len() < MIN_PLAYERS as usize {
            removal.game_over = Some(inner.end_game(GameOverReason::NotEnoughPlayers));
            return Ok(removal);
        }

        let count = inner.players.len();
        // The player after the departed one now sits at its old index
        let next = inner.players[position % count];
        let previous = inner.players[(position + count - 1) % count];

        if inner.rotation_anchor == Some(player_id) {
            inner.rotation_anchor = Some(previous);
        }

        if inner.czar == Some(player_id) {
            if inner.state == GameState::DisplayingWinner {
                // The finished round stands; the next one goes to the departed czar's successor
                inner.czar = None;
                inner.rotation_anchor = Some(previous);
            } else {
                inner.czar = Some(next);
                for player in inner.players_map.values_mut() {
                    player.return_play();
                }
                inner.state = GameState::SelectingWhiteCards;
                removal.round_voided = true;
                debug!("Round {} of game {} voided, new czar {}", inner.round, self.id, next);
            }
        } else if inner.state == GameState::SelectingWhiteCards && inner.all_played() {
            inner.state = GameState::CzarJudging;
            removal.judging_started = true;
            removal.plays = inner.collect_plays();
        }

        Ok(removal)
    }

    /// Builds the deck, deals every hand and starts the first round.
    ///
    /// Everything that can fail happens before any field is touched.
    pub fn start_game(&self) -> GameResult<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.state != GameState::InLobby {
            return Err(GameError::WrongState(inner.state));
        }

        if inner.players.len() < MIN_PLAYERS as usize {
            return Err(GameError::NotEnoughPlayers {
                min: MIN_PLAYERS as usize,
                current: inner.players.len(),
            });
        }

        let packs = self.catalog.packs_by_ids(&inner.settings.card_packs)?;
        let deck_rng = StdRng::seed_from_u64(inner.rng.gen());
        let mut deck = Deck::build(&self.catalog, &packs, deck_rng)?;

        let black_card = deck.draw_black()?;
        let mut cards = deck.draw_white(HAND_SIZE * inner.players.len())?;

        let order = inner.players.clone();
        for player_id in &order {
            let hand = cards.split_off(cards.len() - HAND_SIZE);
            if let Some(player) = inner.players_map.get_mut(player_id) {
                player.deal_hand(hand);
                player.points = 0;
            }
        }

        inner.deck = Some(deck);
        inner.black_card = Some(black_card);
        inner.czar = order.first().copied();
        inner.rotation_anchor = None;
        inner.round += 1;
        inner.last_winner = None;
        inner.phase_since = Instant::now();
        inner.state = GameState::SelectingWhiteCards;

        info!(
            "🎲 Game {} started with {} players",
            self.id,
            inner.players.len()
        );
        Ok(())
    }

    /// Replaces the settings as a whole. Lobby only.
    pub fn change_settings(&self, settings: GameSettings) -> GameResult<()> {
        let mut inner = self.inner.lock();

        if inner.state != GameState::InLobby {
            return Err(GameError::WrongState(inner.state));
        }

        settings
            .validate_with(&self.catalog)
            .map_err(GameError::InvalidSettings)?;

        inner.settings = settings;
        debug!("Settings of game {} changed", self.id);
        Ok(())
    }

    pub fn settings(&self) -> GameSettings {
        self.inner.lock().settings.clone()
    }

    /// Submits white cards for the current black card.
    pub fn play_cards(&self, player_id: PlayerId, card_ids: &[CardId]) -> GameResult<PlayOutcome> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.state != GameState::SelectingWhiteCards {
            return Err(GameError::WrongState(inner.state));
        }

        inner.player(player_id)?;

        if inner.czar == Some(player_id) {
            return Err(GameError::CzarCannotPlay);
        }

        let expected = inner
            .black_card
            .as_ref()
            .map(|card| card.pick as usize)
            .unwrap_or(1);
        if card_ids.len() != expected {
            return Err(GameError::WrongCardCount {
                expected,
                got: card_ids.len(),
            });
        }

        let cards = card_ids
            .iter()
            .map(|&id| self.catalog.white_card(id))
            .collect::<Result<Vec<_>, _>>()?;

        inner.player_mut(player_id)?.play_card(&cards)?;

        let mut outcome = PlayOutcome {
            judging_started: inner.all_played(),
            plays: Vec::new(),
        };
        if outcome.judging_started {
            inner.state = GameState::CzarJudging;
            outcome.plays = inner.collect_plays();
            debug!("All cards played in game {}, czar is judging", self.id);
        }

        Ok(outcome)
    }

    /// The czar picks the winning play of the round.
    pub fn czar_select_winner(&self, czar_id: PlayerId, winner_id: PlayerId) -> GameResult<RoundWinner> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.state != GameState::CzarJudging {
            return Err(GameError::WrongState(inner.state));
        }

        if inner.czar != Some(czar_id) {
            return Err(GameError::NotCzar);
        }

        let winner = inner.player_mut(winner_id)?;
        let cards: Vec<WhiteCard> = winner
            .current_play()
            .ok_or(GameError::NoPlaySubmitted(winner_id))?
            .iter()
            .map(|card| (**card).clone())
            .collect();
        winner.points += 1;

        let result = RoundWinner {
            player_id: winner_id,
            name: winner.name.clone(),
            cards,
            points: winner.points,
        };

        inner.last_winner = Some(winner_id);
        inner.state = GameState::DisplayingWinner;

        info!("🏆 Player {} won round {} of game {}", winner_id, inner.round, self.id);
        Ok(result)
    }

    /// Leaves the winner screen: either the next round or the end of the game.
    pub fn next_round(&self) -> GameResult<RoundOutcome> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.state != GameState::DisplayingWinner {
            return Err(GameError::WrongState(inner.state));
        }

        if inner.round >= inner.settings.max_rounds {
            return Ok(RoundOutcome::GameOver(inner.end_game(GameOverReason::MaxRounds)));
        }

        let target = inner.settings.playing_to_points;
        if inner.players_map.values().any(|player| player.points >= target) {
            return Ok(RoundOutcome::GameOver(inner.end_game(GameOverReason::PointsReached)));
        }

        let needed: Vec<(PlayerId, usize)> = inner
            .players
            .iter()
            .filter_map(|id| inner.players_map.get(id))
            .map(|player| (player.id, HAND_SIZE.saturating_sub(player.cards_in_hand())))
            .collect();
        let total: usize = needed.iter().map(|(_, count)| count).sum();

        let state = inner.state;
        let exhausted = match inner.deck.as_ref() {
            Some(deck) => deck.remaining_black() < 1 || deck.remaining_white() < total,
            None => return Err(GameError::WrongState(state)),
        };
        if exhausted {
            warn!("Deck of game {} is exhausted", self.id);
            return Ok(RoundOutcome::GameOver(inner.end_game(GameOverReason::DeckExhausted)));
        }

        let deck = inner.deck.as_mut().ok_or(GameError::WrongState(state))?;
        let black_card = deck.draw_black()?;
        let mut cards = deck.draw_white(total)?;

        for (player_id, count) in needed {
            let refill = cards.split_off(cards.len() - count);
            if let Some(player) = inner.players_map.get_mut(&player_id) {
                player.finalise_round();
                for card in refill {
                    player.add_card_to_hand(card)?;
                }
            }
        }

        let czar = inner.next_czar();
        inner.czar = Some(czar);
        inner.rotation_anchor = None;
        inner.black_card = Some(black_card);
        inner.round += 1;
        inner.state = GameState::SelectingWhiteCards;

        debug!("Game {} moved to round {}", self.id, inner.round);
        Ok(RoundOutcome::Started {
            round: inner.round,
            czar_id: czar,
        })
    }

    pub fn set_player_connected(&self, player_id: PlayerId, connected: bool) -> GameResult<()> {
        let mut inner = self.inner.lock();
        inner.player_mut(player_id)?.connected = connected;
        inner.refresh_empty_since();
        Ok(())
    }

    pub fn info(&self) -> GameInfo {
        let inner = self.inner.lock();
        GameInfo {
            id: self.id,
            player_count: inner.players.len(),
            max_players: inner.settings.max_players,
            playing_to: inner.settings.playing_to_points,
            has_password: inner.settings.has_password(),
            state: inner.state,
        }
    }

    pub fn state_info(&self) -> GameStateInfo {
        let inner = self.inner.lock();
        GameStateInfo {
            id: self.id,
            state: inner.state,
            settings: inner.settings.clone(),
            players: inner
                .players
                .iter()
                .filter_map(|id| inner.players_map.get(id))
                .map(|player| PlayerInfo {
                    id: player.id,
                    name: player.name.clone(),
                    connected: player.connected,
                    points: player.points,
                    has_played: player.has_played(),
                })
                .collect(),
            owner_id: inner.owner,
            czar_id: inner.czar,
            round: inner.round,
            black_card: inner.black_card.as_deref().cloned(),
            last_winner: inner.last_winner,
        }
    }

    /// Full round view including every hand. Only while cards are being selected.
    pub fn round_info(&self) -> GameResult<RoundInfo> {
        let inner = self.inner.lock();

        if inner.state != GameState::SelectingWhiteCards {
            return Err(GameError::WrongState(inner.state));
        }

        let (Some(czar_id), Some(black_card)) = (inner.czar, inner.black_card.as_deref()) else {
            return Err(GameError::WrongState(inner.state));
        };

        Ok(RoundInfo {
            round: inner.round,
            czar_id,
            black_card: black_card.clone(),
            hands: inner
                .players_map
                .values()
                .map(|player| (player.id, owned(player.hand())))
                .collect(),
        })
    }

    /// One player's own hand.
    pub fn hand_of(&self, player_id: PlayerId) -> GameResult<Vec<WhiteCard>> {
        let inner = self.inner.lock();
        inner.player(player_id).map(|player| owned(player.hand()))
    }

    /// Every submitted play, in join order. Only while the czar judges.
    pub fn submitted_plays(&self) -> GameResult<Vec<SubmittedPlay>> {
        let inner = self.inner.lock();

        if inner.state != GameState::CzarJudging {
            return Err(GameError::WrongState(inner.state));
        }

        Ok(inner.collect_plays())
    }

    pub fn metrics(&self) -> GameMetrics {
        let inner = self.inner.lock();
        GameMetrics {
            players: inner.players.len(),
            connected_players: inner.connected_count(),
        }
    }

    pub fn lifecycle(&self) -> LifecycleSnapshot {
        let inner = self.inner.lock();
        LifecycleSnapshot {
            state: inner.state,
            phase_since: inner.phase_since,
            empty_since: inner.empty_since,
        }
    }
}

impl GameInner {
    fn player(&self, player_id: PlayerId) -> GameResult<&Player> {
        self.players_map
            .get(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))
    }

    fn player_mut(&mut self, player_id: PlayerId) -> GameResult<&mut Player> {
        self.players_map
            .get_mut(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))
    }

    fn all_played(&self) -> bool {
        self.players_map
            .values()
            .filter(|player| Some(player.id) != self.czar)
            .all(Player::has_played)
    }

    fn collect_plays(&self) -> Vec<SubmittedPlay> {
        self.players
            .iter()
            .filter_map(|id| self.players_map.get(id))
            .filter_map(|player| {
                player.current_play().map(|cards| SubmittedPlay {
                    player_id: player.id,
                    cards: cards.iter().map(|card| (**card).clone()).collect(),
                })
            })
            .collect()
    }

    fn connected_count(&self) -> usize {
        self.players_map.values().filter(|player| player.connected).count()
    }

    fn refresh_empty_since(&mut self) {
        if self.connected_count() > 0 {
            self.empty_since = None;
        } else if self.empty_since.is_none() {
            self.empty_since = Some(Instant::now());
        }
    }

    /// The player after the current czar (or the rotation anchor) in join order.
    fn next_czar(&self) -> PlayerId {
        let index = self
            .czar
            .or(self.rotation_anchor)
            .and_then(|czar| self.players.iter().position(|&id| id == czar))
            .map(|index| (index + 1) % self.players.len())
            .unwrap_or(0);
        self.players[index]
    }

    fn end_game(&mut self, reason: GameOverReason) -> GameOver {
        let best = self
            .players_map
            .values()
            .map(|player| player.points)
            .max()
            .unwrap_or(0);
        let winners = self
            .players
            .iter()
            .filter(|id| {
                self.players_map
                    .get(id)
                    .is_some_and(|player| player.points == best)
            })
            .copied()
            .collect();

        for player in self.players_map.values_mut() {
            player.clear_hand();
        }
        self.state = GameState::InLobby;
        self.round = 0;
        self.czar = None;
        self.rotation_anchor = None;
        self.black_card = None;
        self.deck = None;
        self.phase_since = Instant::now();

        info!("🏁 Game over ({:?})", reason);
        GameOver { reason, winners }
    }
}

fn owned(cards: Vec<Arc<WhiteCard>>) -> Vec<WhiteCard> {
    cards.iter().map(|card| (**card).clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, PlayerError};
    use crate::test_support::{catalog_with, seeded};
    use std::collections::HashSet;

    fn settings(catalog: &Catalog) -> GameSettings {
        GameSettings {
            max_rounds: 10,
            playing_to_points: 10,
            password: String::new(),
            max_players: 10,
            card_packs: vec![catalog.packs()[0].id],
        }
    }

    fn started_game() -> (Game, Vec<PlayerId>) {
        let catalog = catalog_with(200, 20);
        let game = Game::with_rng(catalog.clone(), settings(&catalog), "Dave", seeded(1)).unwrap();
        let owner = game.owner();
        let bob = game.add_player("Bob").unwrap();
        let eve = game.add_player("Eve").unwrap();
        game.start_game().unwrap();
        (game, vec![owner, bob, eve])
    }

    fn play_first_card(game: &Game, player: PlayerId) -> PlayOutcome {
        let card = game.hand_of(player).unwrap()[0].id;
        game.play_cards(player, &[card]).unwrap()
    }

    #[test]
    fn test_new_game_rejects_invalid_settings() {
        let catalog = catalog_with(50, 5);
        let mut bad = settings(&catalog);
        bad.max_rounds = 0;
        bad.max_players = 50;
        let err = Game::new(catalog, bad, "Dave").unwrap_err();
        match err {
            GameError::InvalidSettings(violations) => assert_eq!(violations.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_new_game_rejects_bad_owner_name() {
        let catalog = catalog_with(50, 5);
        let err = Game::new(catalog.clone(), settings(&catalog), "").unwrap_err();
        assert!(matches!(err, GameError::Player(PlayerError::InvalidName { .. })));
    }

    #[test]
    fn test_duplicate_name_is_case_sensitive() {
        let catalog = catalog_with(50, 5);
        let game = Game::new(catalog.clone(), settings(&catalog), "Dave").unwrap();
        assert!(matches!(
            game.add_player("Dave"),
            Err(GameError::DuplicateName(_))
        ));
        assert!(game.add_player("dave").is_ok());
    }

    #[test]
    fn test_game_full() {
        let catalog = catalog_with(50, 5);
        let mut small = settings(&catalog);
        small.max_players = 3;
        let game = Game::new(catalog, small, "Dave").unwrap();
        game.add_player("Bob").unwrap();
        game.add_player("Eve").unwrap();
        assert!(matches!(game.add_player("Mallory"), Err(GameError::GameFull)));
    }

    #[test]
    fn test_start_requires_enough_players() {
        let catalog = catalog_with(50, 5);
        let game = Game::new(catalog.clone(), settings(&catalog), "Dave").unwrap();
        let err = game.start_game().unwrap_err();
        assert!(matches!(err, GameError::NotEnoughPlayers { min: 3, current: 1 }));
        assert_eq!(game.state(), GameState::InLobby);
    }

    #[test]
    fn test_start_deals_distinct_hands() {
        let (game, players) = started_game();
        assert_eq!(game.state(), GameState::SelectingWhiteCards);

        let round = game.round_info().unwrap();
        assert_eq!(round.round, 1);
        assert_eq!(round.czar_id, players[0]);

        let mut all_cards = HashSet::new();
        for player in &players {
            let hand = &round.hands[player];
            assert_eq!(hand.len(), HAND_SIZE);
            for card in hand {
                assert!(all_cards.insert(card.id), "card {} dealt twice", card.id);
            }
        }
    }

    #[test]
    fn test_start_twice_is_wrong_state() {
        let (game, _) = started_game();
        assert!(matches!(
            game.start_game(),
            Err(GameError::WrongState(GameState::SelectingWhiteCards))
        ));
    }

    #[test]
    fn test_start_with_too_small_deck_leaves_lobby_untouched() {
        let catalog = catalog_with(10, 5);
        let game = Game::new(catalog.clone(), settings(&catalog), "Dave").unwrap();
        game.add_player("Bob").unwrap();
        game.add_player("Eve").unwrap();

        let err = game.start_game().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);

        let state = game.state_info();
        assert_eq!(state.state, GameState::InLobby);
        assert_eq!(state.round, 0);
        assert!(state.black_card.is_none());
        for player in state.players {
            assert_eq!(game.hand_of(player.id).unwrap().len(), 0);
        }
    }

    #[test]
    fn test_change_settings_only_in_lobby() {
        let catalog = catalog_with(200, 20);
        let game = Game::new(catalog.clone(), settings(&catalog), "Dave").unwrap();

        let mut bad = settings(&catalog);
        bad.playing_to_points = 1;
        assert!(matches!(
            game.change_settings(bad),
            Err(GameError::InvalidSettings(_))
        ));

        let mut good = settings(&catalog);
        good.password = "secret".to_string();
        game.change_settings(good.clone()).unwrap();
        assert_eq!(game.settings(), good);
        assert!(game.check_password("secret"));

        let (started, _) = started_game();
        assert!(matches!(
            started.change_settings(good),
            Err(GameError::WrongState(_))
        ));
    }

    #[test]
    fn test_round_flow() {
        let (game, players) = started_game();
        let czar = players[0];

        assert!(matches!(
            game.play_cards(czar, &[0]),
            Err(GameError::CzarCannotPlay)
        ));
        assert!(matches!(
            game.play_cards(players[1], &[]),
            Err(GameError::WrongCardCount { expected: 1, got: 0 })
        ));

        assert!(!play_first_card(&game, players[1]).judging_started);
        assert!(game.submitted_plays().is_err());
        assert!(play_first_card(&game, players[2]).judging_started);
        assert_eq!(game.state(), GameState::CzarJudging);
        assert_eq!(game.submitted_plays().unwrap().len(), 2);

        assert!(matches!(
            game.czar_select_winner(players[1], players[2]),
            Err(GameError::NotCzar)
        ));
        assert!(matches!(
            game.czar_select_winner(czar, czar),
            Err(GameError::NoPlaySubmitted(_))
        ));

        let winner = game.czar_select_winner(czar, players[2]).unwrap();
        assert_eq!(winner.points, 1);
        assert_eq!(winner.cards.len(), 1);
        assert_eq!(game.state(), GameState::DisplayingWinner);

        match game.next_round().unwrap() {
            RoundOutcome::Started { round, czar_id } => {
                assert_eq!(round, 2);
                assert_eq!(czar_id, players[1]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let round = game.round_info().unwrap();
        for player in &players {
            assert_eq!(round.hands[player].len(), HAND_SIZE);
        }
        assert!(game.state_info().players.iter().all(|p| !p.has_played));
    }

    #[test]
    fn test_game_over_after_max_rounds() {
        let catalog = catalog_with(200, 20);
        let mut one_round = settings(&catalog);
        one_round.max_rounds = 1;
        let game = Game::with_rng(catalog, one_round, "Dave", seeded(5)).unwrap();
        let owner = game.owner();
        let bob = game.add_player("Bob").unwrap();
        let eve = game.add_player("Eve").unwrap();
        game.start_game().unwrap();

        play_first_card(&game, bob);
        play_first_card(&game, eve);
        game.czar_select_winner(owner, bob).unwrap();

        let outcome = game.next_round().unwrap();
        assert_eq!(
            outcome,
            RoundOutcome::GameOver(GameOver {
                reason: GameOverReason::MaxRounds,
                winners: vec![bob],
            })
        );
        assert_eq!(game.state(), GameState::InLobby);
        assert!(game.hand_of(bob).unwrap().is_empty());

        // The lobby can start a fresh game
        game.start_game().unwrap();
        assert_eq!(game.round_info().unwrap().round, 1);
    }

    #[test]
    fn test_remove_player_reassigns_owner() {
        let catalog = catalog_with(50, 5);
        let game = Game::with_rng(catalog.clone(), settings(&catalog), "Dave", seeded(3)).unwrap();
        let owner = game.owner();
        let bob = game.add_player("Bob").unwrap();

        let removal = game.remove_player(owner).unwrap();
        assert_eq!(removal.players_left, 1);
        assert_eq!(removal.new_owner, Some(bob));
        assert_eq!(game.owner(), bob);

        assert!(matches!(
            game.remove_player(owner),
            Err(GameError::PlayerNotFound(_))
        ));
        assert_eq!(game.remove_player(bob).unwrap().players_left, 0);
    }

    #[test]
    fn test_czar_leaving_voids_round() {
        let catalog = catalog_with(200, 20);
        let game = Game::with_rng(catalog.clone(), settings(&catalog), "Dave", seeded(2)).unwrap();
        let czar = game.owner();
        let bob = game.add_player("Bob").unwrap();
        let eve = game.add_player("Eve").unwrap();
        let zed = game.add_player("Zed").unwrap();
        game.start_game().unwrap();

        play_first_card(&game, bob);
        let removal = game.remove_player(czar).unwrap();
        assert!(removal.round_voided);
        assert!(removal.game_over.is_none());

        let round = game.round_info().unwrap();
        assert_eq!(round.czar_id, bob);
        assert_eq!(round.hands[&bob].len(), HAND_SIZE);
        assert_eq!(round.hands[&eve].len(), HAND_SIZE);
        assert_eq!(round.hands[&zed].len(), HAND_SIZE);
    }

    /// Judges round 1 of a five-player game and returns its players in join order.
    fn judged_game() -> (Game, Vec<PlayerId>) {
        let catalog = catalog_with(200, 20);
        let game = Game::with_rng(catalog.clone(), settings(&catalog), "Alice", seeded(6)).unwrap();
        let alice = game.owner();
        let others: Vec<PlayerId> = ["Bobby", "Carol", "Dylan", "Ethan"]
            .iter()
            .map(|name| game.add_player(name).unwrap())
            .collect();
        game.start_game().unwrap();

        for &player in &others {
            play_first_card(&game, player);
        }
        game.czar_select_winner(alice, others[1]).unwrap();

        let mut players = vec![alice];
        players.extend(others);
        (game, players)
    }

    #[test]
    fn test_czar_leaving_winner_screen_keeps_rotation() {
        let (game, players) = judged_game();

        let removal = game.remove_player(players[0]).unwrap();
        assert!(!removal.round_voided);
        assert_eq!(game.state(), GameState::DisplayingWinner);
        assert_eq!(game.state_info().czar_id, None);

        match game.next_round().unwrap() {
            RoundOutcome::Started { czar_id, .. } => assert_eq!(czar_id, players[1]),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_departures_after_czar_left_move_rotation_on() {
        let (game, players) = judged_game();
        game.remove_player(players[0]).unwrap();
        game.remove_player(players[1]).unwrap();

        match game.next_round().unwrap() {
            RoundOutcome::Started { czar_id, .. } => assert_eq!(czar_id, players[2]),
            other => panic!("unexpected outcome {other:?}"),
        }

        // The seat before the departed czar leaving as well
        let (game, players) = judged_game();
        game.remove_player(players[0]).unwrap();
        game.remove_player(players[4]).unwrap();

        match game.next_round().unwrap() {
            RoundOutcome::Started { czar_id, .. } => assert_eq!(czar_id, players[1]),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_judging_outcome_carries_plays() {
        let (game, players) = started_game();

        let first = play_first_card(&game, players[1]);
        assert!(first.plays.is_empty());

        let last = play_first_card(&game, players[2]);
        assert!(last.judging_started);
        let authors: Vec<PlayerId> = last.plays.iter().map(|play| play.player_id).collect();
        assert_eq!(authors, vec![players[1], players[2]]);
        assert_eq!(last.plays, game.submitted_plays().unwrap());
    }

    #[test]
    fn test_phase_clock_restarts_on_start_and_game_over() {
        let catalog = catalog_with(200, 20);
        let mut one_round = settings(&catalog);
        one_round.max_rounds = 1;
        let game = Game::with_rng(catalog, one_round, "Dave", seeded(7)).unwrap();
        let owner = game.owner();
        let bob = game.add_player("Bob").unwrap();
        let eve = game.add_player("Eve").unwrap();
        assert_eq!(game.lifecycle().phase_since, game.created_at());

        game.start_game().unwrap();
        let started = game.lifecycle().phase_since;
        assert!(started >= game.created_at());

        play_first_card(&game, bob);
        play_first_card(&game, eve);
        game.czar_select_winner(owner, eve).unwrap();
        assert!(matches!(game.next_round().unwrap(), RoundOutcome::GameOver(_)));

        let lifecycle = game.lifecycle();
        assert_eq!(lifecycle.state, GameState::InLobby);
        assert!(lifecycle.phase_since >= started);
    }

    #[test]
    fn test_leaving_below_minimum_ends_game() {
        let (game, players) = started_game();
        let removal = game.remove_player(players[2]).unwrap();
        let over = removal.game_over.unwrap();
        assert_eq!(over.reason, GameOverReason::NotEnoughPlayers);
        assert_eq!(game.state(), GameState::InLobby);
    }

    #[test]
    fn test_last_outstanding_player_leaving_starts_judging() {
        let catalog = catalog_with(200, 20);
        let game = Game::with_rng(catalog.clone(), settings(&catalog), "Dave", seeded(4)).unwrap();
        game.add_player("Bob").unwrap();
        let eve = game.add_player("Eve").unwrap();
        let zed = game.add_player("Zed").unwrap();
        game.start_game().unwrap();

        let bob = game.state_info().players[1].id;
        play_first_card(&game, bob);
        play_first_card(&game, eve);

        let removal = game.remove_player(zed).unwrap();
        assert!(removal.judging_started);
        assert_eq!(game.state(), GameState::CzarJudging);
    }

    #[test]
    fn test_late_joiner_gets_a_hand() {
        let (game, _) = started_game();
        let late = game.add_player("Late").unwrap();
        assert_eq!(game.hand_of(late).unwrap().len(), HAND_SIZE);
    }

    #[test]
    fn test_connectivity_tracking() {
        let catalog = catalog_with(50, 5);
        let game = Game::new(catalog.clone(), settings(&catalog), "Dave").unwrap();
        let owner = game.owner();

        assert!(game.lifecycle().empty_since.is_some());
        assert_eq!(game.metrics().connected_players, 0);

        game.set_player_connected(owner, true).unwrap();
        assert!(game.lifecycle().empty_since.is_none());
        assert_eq!(
            game.metrics(),
            GameMetrics {
                players: 1,
                connected_players: 1
            }
        );

        game.set_player_connected(owner, false).unwrap();
        assert!(game.lifecycle().empty_since.is_some());
    }

    #[test]
    fn test_info_projection() {
        let catalog = catalog_with(50, 5);
        let mut with_password = settings(&catalog);
        with_password.password = "pw".to_string();
        let game = Game::new(catalog, with_password, "Dave").unwrap();

        let info = game.info();
        assert_eq!(info.player_count, 1);
        assert_eq!(info.max_players, 10);
        assert!(info.has_password);
        assert_eq!(info.state, GameState::InLobby);
    }
}
