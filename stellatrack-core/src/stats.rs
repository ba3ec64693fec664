//! Aggregate stat bonuses of a run at the targets' current levels.
use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::run::Run;

/// Summed bonus per stat type, ordered by stat name.
pub type RunStats = BTreeMap<String, u32>;

/// Sum every target's stat contribution at its current level.
///
/// Targets whose potential or level entry is missing from the catalog are
/// skipped.
#[must_use]
pub fn aggregate_run_stats(run: &Run, catalog: &Catalog) -> RunStats {
    let mut totals = RunStats::new();
    for target in &run.targets {
        let Some(stat) = catalog
            .potential(&target.potential_id)
            .and_then(|p| p.stat_at(target.level))
        else {
            continue;
        };
        let total = totals.entry(stat.stat.clone()).or_default();
        *total = total.saturating_add(stat.value);
    }
    totals
}
