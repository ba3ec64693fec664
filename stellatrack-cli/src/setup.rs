//! Builds the repository from command-line options.
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use stellatrack_core::{Catalog, RunRepository, RunStore, TrackerConfig};

use crate::store::FileStore;

/// Load the tracker config from `path`, or defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<TrackerConfig> {
    let Some(path) = path else {
        return Ok(TrackerConfig::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    TrackerConfig::from_json(&json).with_context(|| format!("invalid config {}", path.display()))
}

/// Load a catalog document, or generate the standard roster.
pub fn load_catalog(path: Option<&Path>, cfg: &TrackerConfig) -> Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::generate(cfg));
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    Catalog::from_json(&json, cfg).with_context(|| format!("invalid catalog {}", path.display()))
}

pub fn open_repository(
    data_dir: &Path,
    config: Option<&Path>,
    catalog: Option<&Path>,
) -> Result<RunRepository<FileStore>> {
    let cfg = load_config(config)?;
    let catalog = load_catalog(catalog, &cfg)?;
    log::debug!(
        "opening runs in {} ({} characters, {} potentials)",
        data_dir.display(),
        catalog.characters.len(),
        catalog.potentials.len()
    );
    Ok(RunRepository::open(
        RunStore::new(FileStore::new(data_dir)),
        catalog,
        cfg,
    ))
}
