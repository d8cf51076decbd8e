//! Per-game draw state
//!
//! A [`Deck`] merges the card pools of the selected packs and hands out cards
//! without repetition. Drawn cards never return to the pool for the lifetime
//! of the deck, so two draws can never yield the same card.

use crate::catalog::{CardPack, Catalog};
use crate::error::DeckError;
use crate::types::{BlackCard, CardId, WhiteCard};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Shuffled draw pools for one game.
#[derive(Debug)]
pub struct Deck {
    white: Vec<Arc<WhiteCard>>,
    black: Vec<Arc<BlackCard>>,
    rng: StdRng,
}

impl Deck {
    /// Merges the pools of `packs`.
    ///
    /// Packs may overlap; every card index ends up in a pool at most once.
    pub fn build(catalog: &Catalog, packs: &[Arc<CardPack>], rng: StdRng) -> Result<Self, DeckError> {
        if packs.is_empty() {
            return Err(DeckError::EmptySelection);
        }

        let white = merge_pool(packs.iter().map(|pack| pack.white.as_slice()), |id| {
            catalog.white_card(id).ok()
        });
        let black = merge_pool(packs.iter().map(|pack| pack.black.as_slice()), |id| {
            catalog.black_card(id).ok()
        });

        debug!(
            "Built deck from {} pack(s): {} white, {} black",
            packs.len(),
            white.len(),
            black.len()
        );

        Ok(Self { white, black, rng })
    }

    /// Removes and returns one black card chosen uniformly at random.
    pub fn draw_black(&mut self) -> Result<Arc<BlackCard>, DeckError> {
        if self.black.is_empty() {
            return Err(DeckError::Exhausted {
                colour: "black",
                requested: 1,
                remaining: 0,
            });
        }

        let index = self.rng.gen_range(0..self.black.len());
        Ok(self.black.swap_remove(index))
    }

    /// Removes and returns `n` distinct white cards.
    ///
    /// All-or-nothing: if fewer than `n` remain nothing is drawn.
    pub fn draw_white(&mut self, n: usize) -> Result<Vec<Arc<WhiteCard>>, DeckError> {
        if self.white.len() < n {
            return Err(DeckError::Exhausted {
                colour: "white",
                requested: n,
                remaining: self.white.len(),
            });
        }

        let mut drawn = Vec::with_capacity(n);
        for _ in 0..n {
            let index = self.rng.gen_range(0..self.white.len());
            drawn.push(self.white.swap_remove(index));
        }
        Ok(drawn)
    }

    pub fn remaining_white(&self) -> usize {
        self.white.len()
    }

    pub fn remaining_black(&self) -> usize {
        self.black.len()
    }
}

fn merge_pool<'a, T>(
    sources: impl Iterator<Item = &'a [CardId]>,
    lookup: impl Fn(CardId) -> Option<Arc<T>>,
) -> Vec<Arc<T>> {
    let mut seen = HashSet::new();
    sources
        .flatten()
        .copied()
        .filter(|&id| seen.insert(id))
        .filter_map(lookup)
        .collect()
}
