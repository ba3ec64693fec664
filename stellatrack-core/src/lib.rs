//! Stellatrack Core
//!
//! Platform-agnostic run-tracking logic for planning character potentials.
//! This crate provides the catalog, capacity rules, stat aggregation,
//! persistence and import/export without UI or platform-specific dependencies.

pub mod capacity;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod repository;
pub mod run;
pub mod stats;
pub mod storage;
pub mod transfer;

// Re-export commonly used types
pub use capacity::{CapacitySnapshot, compute_capacity};
pub use catalog::{
    Catalog, CatalogError, Character, Element, LevelEffect, LevelStat, LevelTable, Potential,
    Rarity, potential_key,
};
pub use config::{ConfigError, TrackerConfig};
pub use error::{ErrorKind, TrackerError};
pub use ids::RunIdGenerator;
pub use repository::{ExportedRun, LevelChange, LevelOutcome, RunEvent, RunRepository};
pub use run::{Role, Run, Target};
pub use stats::{RunStats, aggregate_run_stats};
pub use storage::{KeyValueStore, MemoryStore, RunStore, StorageError};
pub use transfer::{
    PortableRun, PortableTarget, TransferError, export_file_name, from_portable, parse_portable,
    to_portable,
};

/// Open a repository over `store` with the generated catalog for `config`.
pub fn open_with_generated_catalog<K: KeyValueStore>(
    store: K,
    config: TrackerConfig,
) -> RunRepository<K> {
    let catalog = Catalog::generate(&config);
    RunRepository::open(RunStore::new(store), catalog, config)
}
