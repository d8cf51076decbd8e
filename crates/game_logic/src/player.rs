//! Per-participant hand and play state.
//!
//! A `Player` is only ever mutated through its owning [`Game`](crate::Game),
//! which holds the game lock for the duration of every call.

use crate::error::PlayerError;
use crate::types::{CardId, PlayerId, WhiteCard};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

pub const MIN_PLAYER_NAME_LENGTH: usize = 3;
pub const MAX_PLAYER_NAME_LENGTH: usize = 20;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    hand: HashMap<CardId, Arc<WhiteCard>>,
    current_play: Option<Vec<Arc<WhiteCard>>>,
    pub connected: bool,
    pub points: u32,
}

impl Player {
    /// Creates a disconnected player with an empty hand.
    pub fn new(name: impl Into<String>) -> Result<Self, PlayerError> {
        let name = name.into();
        let length = name.chars().count();
        if !(MIN_PLAYER_NAME_LENGTH..=MAX_PLAYER_NAME_LENGTH).contains(&length) {
            return Err(PlayerError::InvalidName {
                min: MIN_PLAYER_NAME_LENGTH,
                max: MAX_PLAYER_NAME_LENGTH,
            });
        }

        Ok(Self {
            id: PlayerId::new(),
            name,
            hand: HashMap::new(),
            current_play: None,
            connected: false,
            points: 0,
        })
    }

    pub fn has_card(&self, id: CardId) -> bool {
        self.hand.contains_key(&id)
    }

    /// Withdraws `cards` from the hand and records them as this round's play.
    ///
    /// Nothing changes unless every check passes.
    pub fn play_card(&mut self, cards: &[Arc<WhiteCard>]) -> Result<(), PlayerError> {
        if cards.is_empty() {
            return Err(PlayerError::EmptyPlay);
        }

        if self.current_play.is_some() {
            return Err(PlayerError::AlreadyPlayed);
        }

        let mut seen = HashSet::with_capacity(cards.len());
        for card in cards {
            if !seen.insert(card.id) {
                return Err(PlayerError::DuplicateInPlay(card.id));
            }
            if !self.has_card(card.id) {
                return Err(PlayerError::CardNotInHand(card.id));
            }
        }

        let play: Vec<Arc<WhiteCard>> = cards
            .iter()
            .filter_map(|card| self.hand.remove(&card.id))
            .collect();
        self.current_play = Some(play);
        Ok(())
    }

    pub fn add_card_to_hand(&mut self, card: Arc<WhiteCard>) -> Result<(), PlayerError> {
        if self.has_card(card.id) {
            warn!("Player {} already holds card {}", self.id, card.id);
            return Err(PlayerError::DuplicateCard(card.id));
        }

        self.hand.insert(card.id, card);
        Ok(())
    }

    /// Clears the current play. Idempotent.
    pub fn finalise_round(&mut self) {
        self.current_play = None;
    }

    /// Puts a voided play back into the hand.
    pub fn return_play(&mut self) {
        if let Some(play) = self.current_play.take() {
            for card in play {
                self.hand.insert(card.id, card);
            }
        }
    }

    /// Replaces the whole hand with a freshly dealt one.
    pub(crate) fn deal_hand(&mut self, cards: Vec<Arc<WhiteCard>>) {
        self.current_play = None;
        self.hand = cards.into_iter().map(|card| (card.id, card)).collect();
    }

    pub fn clear_hand(&mut self) {
        self.hand.clear();
        self.current_play = None;
    }

    pub fn current_play(&self) -> Option<&[Arc<WhiteCard>]> {
        self.current_play.as_deref()
    }

    pub fn has_played(&self) -> bool {
        self.current_play.is_some()
    }

    pub fn cards_in_hand(&self) -> usize {
        self.hand.len()
    }

    /// The hand sorted by card id.
    pub fn hand(&self) -> Vec<Arc<WhiteCard>> {
        let mut cards: Vec<_> = self.hand.values().cloned().collect();
        cards.sort_by_key(|card| card.id);
        cards
    }
}
