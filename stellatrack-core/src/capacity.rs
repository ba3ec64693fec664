//! Slot capacity for one character of a run.
//!
//! Capacity grows by one for every target of the character sitting at the
//! level ceiling, so it is recomputed from the targets on every query.
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::run::{Role, Run};

/// Point-in-time capacity figures for a character/role pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub used_slots: u32,
    pub capacity: u32,
    pub is_full: bool,
    /// Sum of levels across the character's targets; informational only.
    pub total_level_cost: u32,
}

/// Compute slot usage and ceiling for `char_id` in `role`.
#[must_use]
pub fn compute_capacity(
    run: &Run,
    char_id: &str,
    role: Role,
    cfg: &TrackerConfig,
) -> CapacitySnapshot {
    let mut used_slots = 0_u32;
    let mut maxed = 0_u32;
    let mut total_level_cost = 0_u32;
    for target in run.targets_for(char_id) {
        used_slots += 1;
        total_level_cost = total_level_cost.saturating_add(u32::from(target.level));
        if target.is_maxed(cfg.max_level) {
            maxed += 1;
        }
    }
    let capacity = cfg.base_capacity(role).saturating_add(maxed);
    CapacitySnapshot {
        used_slots,
        capacity,
        is_full: used_slots >= capacity,
        total_level_cost,
    }
}
