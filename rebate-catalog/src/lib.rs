//! rebate-catalog: catalog loading boundary (loose JSON to strict card types) and
//! merchant/category registries.

pub mod normalize;
pub mod registry;
pub mod types;

use std::path::Path;

use anyhow::{Context, Result};

use rebate_core::CatalogSnapshot;

pub use normalize::{DateParser, NormalizeWarning, normalize_cards};
pub use registry::{Category, Merchant, Registry};
pub use types::{RawCard, RawCatalog, RawCatalogFile, RawRule};

/// A normalized catalog ready for the engine.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub snapshot: CatalogSnapshot,
    pub registry: Registry,
    pub warnings: Vec<NormalizeWarning>,
}

/// Parse catalog JSON. `source` is kept as the snapshot's provenance tag.
pub fn load_catalog_str(json: &str, source: &str) -> Result<LoadedCatalog> {
    let file: RawCatalogFile = serde_json::from_str(json)
        .with_context(|| format!("failed to parse catalog JSON from {source}"))?;
    let raw = RawCatalog::from(file);

    let (cards, warnings) = normalize_cards(raw.cards)?;
    tracing::debug!(
        source,
        cards = cards.len(),
        merchants = raw.merchants.len(),
        warnings = warnings.len(),
        "catalog loaded"
    );

    Ok(LoadedCatalog {
        snapshot: CatalogSnapshot::new(cards, source),
        registry: Registry::new(raw.merchants, raw.categories),
        warnings,
    })
}

pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<LoadedCatalog> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    load_catalog_str(&json, &path.display().to_string())
}
