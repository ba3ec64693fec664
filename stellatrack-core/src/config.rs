//! Tracker configuration: level ceiling, capacity bases and asset locations.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{BASE_CAPACITY_MAIN, BASE_CAPACITY_SUPPORT, DEFAULT_ASSET_BASE_URL, MAX_LEVEL};
use crate::run::Role;

/// Errors raised when tracker configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u32,
        value: u32,
    },
    #[error("config JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime configuration consumed by the catalog and capacity rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Level ceiling for targets, and the "maxed" threshold granting bonus capacity.
    #[serde(default = "TrackerConfig::default_max_level")]
    pub max_level: u8,
    #[serde(default = "TrackerConfig::default_base_capacity_main")]
    pub base_capacity_main: u32,
    #[serde(default = "TrackerConfig::default_base_capacity_support")]
    pub base_capacity_support: u32,
    #[serde(default = "TrackerConfig::default_asset_base_url")]
    pub asset_base_url: String,
    /// Per-potential image URLs keyed by potential id, e.g. `c1_main_1`.
    #[serde(default)]
    pub image_overrides: BTreeMap<String, String>,
}

impl TrackerConfig {
    const fn default_max_level() -> u8 {
        MAX_LEVEL
    }

    const fn default_base_capacity_main() -> u32 {
        BASE_CAPACITY_MAIN
    }

    const fn default_base_capacity_support() -> u32 {
        BASE_CAPACITY_SUPPORT
    }

    fn default_asset_base_url() -> String {
        DEFAULT_ASSET_BASE_URL.to_string()
    }

    /// Parse and validate a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value violates its bounds.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_min("max_level", u32::from(self.max_level), 1)?;
        ensure_min("base_capacity_main", self.base_capacity_main, 1)?;
        ensure_min("base_capacity_support", self.base_capacity_support, 1)?;
        Ok(())
    }

    /// Starting capacity for a role before any maxed bonus.
    #[must_use]
    pub const fn base_capacity(&self, role: Role) -> u32 {
        match role {
            Role::Main => self.base_capacity_main,
            Role::Support => self.base_capacity_support,
        }
    }

    /// Clamp an arbitrary level into `1..=max_level`.
    ///
    /// An unvalidated `max_level` of 0 is treated as 1.
    #[must_use]
    pub fn clamp_level(&self, level: i64) -> u8 {
        let ceiling = self.max_level.max(1);
        let clamped = level.clamp(1, i64::from(ceiling));
        u8::try_from(clamped).unwrap_or(ceiling)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_level: Self::default_max_level(),
            base_capacity_main: Self::default_base_capacity_main(),
            base_capacity_support: Self::default_base_capacity_support(),
            asset_base_url: Self::default_asset_base_url(),
            image_overrides: BTreeMap::new(),
        }
    }
}

fn ensure_min(field: &'static str, value: u32, min: u32) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::MinViolation { field, min, value });
    }
    Ok(())
}
