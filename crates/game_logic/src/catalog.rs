//! Card catalog
//!
//! The catalog is built once at startup from the compact pack format and then
//! shared read-only (`Arc<Catalog>`) by every game. Cards are never copied or
//! mutated after load; games only hold `Arc` references into it.
//!
//! ## Source format
//!
//! ```json
//! {
//!   "white": ["card text", "..."],
//!   "black": [{ "text": "prompt _", "pick": 1 }],
//!   "packs": [{ "name": "Base", "white": [0, 1], "black": [0] }]
//! }
//! ```

use crate::error::{CatalogError, CatalogResult};
use crate::types::{BlackCard, CardId, PackId, WhiteCard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// Source format
// ============================================================================

/// A black card as it appears in the pack file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBlackCard {
    pub text: String,
    pub pick: u32,
}

/// A named pack as it appears in the pack file: indices into the flat card lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePack {
    pub name: String,
    #[serde(default)]
    pub white: Vec<usize>,
    #[serde(default)]
    pub black: Vec<usize>,
}

/// Raw catalog data yielded by the pack loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSource {
    pub white: Vec<String>,
    pub black: Vec<SourceBlackCard>,
    pub packs: Vec<SourcePack>,
}

// ============================================================================
// Catalog
// ============================================================================

/// A selectable bundle of cards.
///
/// The index lists are the pack's deck template: the pool of cards it
/// contributes when selected for a game.
#[derive(Debug, Clone, Serialize)]
pub struct CardPack {
    pub id: PackId,
    pub name: String,
    #[serde(rename = "whiteCards")]
    pub white_count: usize,
    #[serde(rename = "blackCards")]
    pub black_count: usize,
    #[serde(skip)]
    pub white: Vec<CardId>,
    #[serde(skip)]
    pub black: Vec<CardId>,
}

/// Immutable, process-wide card data.
#[derive(Debug, Default)]
pub struct Catalog {
    white: Vec<Arc<WhiteCard>>,
    black: Vec<Arc<BlackCard>>,
    packs: Vec<Arc<CardPack>>,
    pack_index: HashMap<PackId, usize>,
}

impl Catalog {
    /// Builds the catalog from raw source data, validating every pack index.
    pub fn from_source(source: CatalogSource) -> CatalogResult<Self> {
        let white: Vec<Arc<WhiteCard>> = source
            .white
            .into_iter()
            .enumerate()
            .map(|(id, text)| Arc::new(WhiteCard::new(id, text)))
            .collect();

        let black: Vec<Arc<BlackCard>> = source
            .black
            .into_iter()
            .enumerate()
            .map(|(id, card)| Arc::new(BlackCard::new(id, card.text, card.pick.max(1))))
            .collect();

        info!(
            "🃏 Found {} white cards and {} black cards",
            white.len(),
            black.len()
        );

        let mut packs = Vec::with_capacity(source.packs.len());
        let mut pack_index = HashMap::with_capacity(source.packs.len());

        for pack in source.packs {
            check_indices(&pack.name, "white", &pack.white, white.len())?;
            check_indices(&pack.name, "black", &pack.black, black.len())?;

            let id = PackId::new();
            pack_index.insert(id, packs.len());
            packs.push(Arc::new(CardPack {
                id,
                white_count: pack.white.len(),
                black_count: pack.black.len(),
                name: pack.name,
                white: pack.white,
                black: pack.black,
            }));
        }

        info!("📦 Created {} packs of cards", packs.len());

        Ok(Self {
            white,
            black,
            packs,
            pack_index,
        })
    }

    /// Reads and parses a pack file, then builds the catalog from it.
    pub fn load_from_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        info!("📖 Reading card pack file {}", path.display());

        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::FileRead(path.to_path_buf(), e))?;
        let source: CatalogSource = serde_json::from_str(&contents)?;
        Self::from_source(source)
    }

    pub fn white_card(&self, id: CardId) -> CatalogResult<Arc<WhiteCard>> {
        self.white
            .get(id)
            .cloned()
            .ok_or(CatalogError::CardNotFound {
                colour: "white",
                id,
            })
    }

    pub fn black_card(&self, id: CardId) -> CatalogResult<Arc<BlackCard>> {
        self.black
            .get(id)
            .cloned()
            .ok_or(CatalogError::CardNotFound {
                colour: "black",
                id,
            })
    }

    pub fn pack(&self, id: PackId) -> CatalogResult<Arc<CardPack>> {
        self.pack_index
            .get(&id)
            .map(|&index| self.packs[index].clone())
            .ok_or(CatalogError::PackNotFound(id))
    }

    /// Resolves a list of pack ids, failing on the first unknown one.
    pub fn packs_by_ids(&self, ids: &[PackId]) -> CatalogResult<Vec<Arc<CardPack>>> {
        ids.iter().map(|&id| self.pack(id)).collect()
    }

    pub fn contains_pack(&self, id: PackId) -> bool {
        self.pack_index.contains_key(&id)
    }

    /// All packs in file order.
    pub fn packs(&self) -> &[Arc<CardPack>] {
        &self.packs
    }

    /// The pack used by default game settings.
    ///
    /// Picks the first pack with more than 5 black and more than 50 white
    /// cards, falling back to the pack with the most white cards.
    pub fn default_pack(&self) -> CatalogResult<Arc<CardPack>> {
        if let Some(pack) = self
            .packs
            .iter()
            .find(|pack| pack.black_count > 5 && pack.white_count > 50)
        {
            return Ok(pack.clone());
        }

        warn!("No pack is large enough for the default settings, using the largest pack");
        self.packs
            .iter()
            .max_by_key(|pack| (pack.white_count, pack.black_count))
            .cloned()
            .ok_or(CatalogError::NoPacks)
    }

    pub fn white_len(&self) -> usize {
        self.white.len()
    }

    pub fn black_len(&self) -> usize {
        self.black.len()
    }
}

fn check_indices(
    pack: &str,
    colour: &'static str,
    indices: &[usize],
    available: usize,
) -> CatalogResult<()> {
    match indices.iter().find(|&&index| index >= available) {
        Some(&index) => Err(CatalogError::IndexOutOfRange {
            pack: pack.to_string(),
            colour,
            index,
            available,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn small_source() -> CatalogSource {
        CatalogSource {
            white: (0..60).map(|i| format!("white {i}")).collect(),
            black: (0..8)
                .map(|i| SourceBlackCard {
                    text: format!("black {i} _"),
                    pick: 1,
                })
                .collect(),
            packs: vec![
                SourcePack {
                    name: "Tiny".to_string(),
                    white: vec![0, 1, 2],
                    black: vec![0],
                },
                SourcePack {
                    name: "Base".to_string(),
                    white: (0..60).collect(),
                    black: (0..8).collect(),
                },
            ],
        }
    }

    #[test]
    fn test_build_catalog() {
        let catalog = Catalog::from_source(small_source()).unwrap();
        assert_eq!(catalog.white_len(), 60);
        assert_eq!(catalog.black_len(), 8);
        assert_eq!(catalog.packs().len(), 2);
        assert_eq!(catalog.packs()[0].white_count, 3);
        assert_eq!(catalog.white_card(5).unwrap().text, "white 5");
    }

    #[test]
    fn test_default_pack_is_first_large_pack() {
        let catalog = Catalog::from_source(small_source()).unwrap();
        assert_eq!(catalog.default_pack().unwrap().name, "Base");
    }

    #[test]
    fn test_out_of_range_pack_index_is_rejected() {
        let mut source = small_source();
        source.packs[0].white.push(999);
        let err = Catalog::from_source(source).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::IndexOutOfRange { index: 999, .. }
        ));
    }

    #[test]
    fn test_unknown_lookups() {
        let catalog = Catalog::from_source(small_source()).unwrap();
        assert!(catalog.white_card(1000).is_err());
        assert!(catalog.black_card(8).is_err());
        assert!(matches!(
            catalog.packs_by_ids(&[PackId::new()]),
            Err(CatalogError::PackNotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        let json = r#"{
            "white": ["a", "b", "c"],
            "black": [{"text": "_ and _", "pick": 2}],
            "packs": [{"name": "Mini", "white": [0, 1, 2], "black": [0]}]
        }"#;
        file.write_all(json.as_bytes()).unwrap();

        let catalog = Catalog::load_from_file(file.path()).unwrap();
        assert_eq!(catalog.black_card(0).unwrap().pick, 2);
        assert_eq!(catalog.packs()[0].name, "Mini");
    }

    #[test]
    fn test_missing_file_fails() {
        let err = Catalog::load_from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CatalogError::FileRead(_, _)));
    }
}
