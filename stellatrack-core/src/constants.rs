//! Centralized tuning constants for Stellatrack run logic.
//!
//! These values mirror the in-game potential rules. They seed the defaults of
//! [`crate::config::TrackerConfig`]; runtime overrides go through the config
//! rather than editing these directly.

// Capacity rules -----------------------------------------------------------
pub const MAX_LEVEL: u8 = 6;
pub const BASE_CAPACITY_MAIN: u32 = 6;
pub const BASE_CAPACITY_SUPPORT: u32 = 5;

// Catalog generation -------------------------------------------------------
pub const POTENTIALS_PER_ROLE: u32 = 19;
pub const RARE_DISPLAY_NUMBERS: [u32; 6] = [3, 6, 9, 12, 15, 18];
pub const SUPER_DISPLAY_NUMBER: u32 = 19;
pub const HASTE_THRESHOLD: u32 = 15;
pub const DEFAULT_ASSET_BASE_URL: &str = "https://your-storage-service.com/stella-sora/assets/";
pub const NO_DESCRIPTION: &str = "No description.";

// Stat labels --------------------------------------------------------------
pub const STAT_ATK_BONUS: &str = "ATK Bonus";
pub const STAT_CRIT_DMG: &str = "Crit Dmg";
pub const STAT_SHIELD: &str = "Shield";
pub const STAT_HEAL: &str = "Heal";
pub const STAT_SKILL_HASTE: &str = "Skill Haste";

// Persistence and transfer -------------------------------------------------
pub const STORAGE_KEY: &str = "stella_trackers";
/// Appended to the storage key when a malformed document is set aside.
pub const BACKUP_KEY_SUFFIX: &str = ".bak";
pub const IMPORT_ID_PREFIX: &str = "imp_";
pub const IMPORT_NAME_SUFFIX: &str = " (Imp)";
pub const EXPORT_FILE_PREFIX: &str = "stella_run_";
pub const EXPORT_FILE_EXTENSION: &str = "json";
pub const UNTITLED_RUN_NAME: &str = "Untitled";
