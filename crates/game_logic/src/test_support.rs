//! Fixtures shared by the unit tests of this crate.

use crate::catalog::{Catalog, CatalogSource, SourceBlackCard, SourcePack};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// A catalog with one pack holding every card and a second pack holding the
/// first half of them.
pub fn catalog_with(white: usize, black: usize) -> Arc<Catalog> {
    let source = CatalogSource {
        white: (0..white).map(|i| format!("white card {i}")).collect(),
        black: (0..black)
            .map(|i| SourceBlackCard {
                text: format!("black card {i} _"),
                pick: 1,
            })
            .collect(),
        packs: vec![
            SourcePack {
                name: "Full".to_string(),
                white: (0..white).collect(),
                black: (0..black).collect(),
            },
            SourcePack {
                name: "Half".to_string(),
                white: (0..white / 2).collect(),
                black: (0..black / 2).collect(),
            },
        ],
    };
    Arc::new(Catalog::from_source(source).expect("fixture catalog is valid"))
}

pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
