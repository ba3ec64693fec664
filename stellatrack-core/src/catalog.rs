//! Read-only reference data: characters and their potentials.
//!
//! The default roster is generated deterministically from a [`TrackerConfig`];
//! an external catalog document can be loaded with [`Catalog::from_json`],
//! which validates the shape once so the rest of the crate can rely on it.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::config::TrackerConfig;
use crate::constants::{
    HASTE_THRESHOLD, NO_DESCRIPTION, POTENTIALS_PER_ROLE, RARE_DISPLAY_NUMBERS, STAT_ATK_BONUS,
    STAT_CRIT_DMG, STAT_HEAL, STAT_SHIELD, STAT_SKILL_HASTE, SUPER_DISPLAY_NUMBER,
};
use crate::run::Role;

/// Per-level table; one entry per level, index 0 is level 1.
pub type LevelTable<T> = SmallVec<[T; 6]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Aqua,
    Terra,
    Ventus,
    Ignis,
    Lux,
    Umbra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub element: Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Super,
}

impl Rarity {
    #[must_use]
    pub fn for_display_number(display_number: u32) -> Self {
        if display_number == SUPER_DISPLAY_NUMBER {
            Self::Super
        } else if RARE_DISPLAY_NUMBERS.contains(&display_number) {
            Self::Rare
        } else {
            Self::Common
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Super => "super",
        };
        f.write_str(label)
    }
}

/// The two numeric effect values substituted into a description at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEffect(pub u32, pub u32);

/// Stat contribution of a potential at one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStat {
    #[serde(rename = "type")]
    pub stat: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Potential {
    pub id: String,
    pub char_id: String,
    pub role: Role,
    pub name: String,
    pub display_number: u32,
    pub description_template: String,
    pub values: LevelTable<LevelEffect>,
    pub stat_data: LevelTable<LevelStat>,
    pub rarity: Rarity,
    pub image_ref: String,
}

/// Deterministic potential id for a character, role and display number.
#[must_use]
pub fn potential_key(char_id: &str, role: Role, display_number: u32) -> String {
    format!("{char_id}_{role}_{display_number}")
}

impl Potential {
    /// Effect values at a 1-indexed level.
    #[must_use]
    pub fn effect_at(&self, level: u8) -> Option<LevelEffect> {
        let index = usize::from(level).checked_sub(1)?;
        self.values.get(index).copied()
    }

    /// Stat contribution at a 1-indexed level.
    #[must_use]
    pub fn stat_at(&self, level: u8) -> Option<&LevelStat> {
        let index = usize::from(level).checked_sub(1)?;
        self.stat_data.get(index)
    }

    /// Render the description template with the values of `level`.
    #[must_use]
    pub fn describe(&self, level: u8) -> String {
        if self.description_template.is_empty() || self.values.is_empty() {
            return NO_DESCRIPTION.to_string();
        }
        let mut text = self.description_template.clone();
        if let Some(LevelEffect(first, second)) = self.effect_at(level) {
            text = text
                .replacen("{0}", &first.to_string(), 1)
                .replacen("{1}", &second.to_string(), 1);
        }
        text
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog JSON parsing error: {0}")]
    Json(String),
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("potential {potential_id} references unknown character {char_id}")]
    UnknownCharacter {
        potential_id: String,
        char_id: String,
    },
    #[error("potential {potential_id} should be keyed {expected}")]
    IdMismatch {
        potential_id: String,
        expected: String,
    },
    #[error("potential {potential_id} has {got} {table} entries, expected {expected}")]
    LevelCount {
        potential_id: String,
        table: &'static str,
        got: usize,
        expected: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub characters: Vec<Character>,
    pub potentials: Vec<Potential>,
}

fn base_characters() -> Vec<Character> {
    [
        ("c1", "Chitose", Element::Aqua),
        ("c2", "Gerie", Element::Terra),
        ("c3", "Nazuna", Element::Ventus),
        ("c4", "Stella", Element::Ignis),
    ]
    .into_iter()
    .map(|(id, name, element)| Character {
        id: id.to_string(),
        name: name.to_string(),
        element,
    })
    .collect()
}

fn stat_for(role: Role, display_number: u32) -> &'static str {
    if display_number > HASTE_THRESHOLD {
        return STAT_SKILL_HASTE;
    }
    let even = display_number % 2 == 0;
    match (role, even) {
        (Role::Main, true) => STAT_CRIT_DMG,
        (Role::Main, false) => STAT_ATK_BONUS,
        (Role::Support, true) => STAT_SHIELD,
        (Role::Support, false) => STAT_HEAL,
    }
}

fn generate_potential(
    cfg: &TrackerConfig,
    character: &Character,
    role: Role,
    display_number: u32,
) -> Potential {
    let id = potential_key(&character.id, role, display_number);
    let stat = stat_for(role, display_number);
    let base_value = display_number * 2;

    let mut values = LevelTable::new();
    let mut stat_data = LevelTable::new();
    for level in 1..=u32::from(cfg.max_level) {
        let primary = base_value + level * 2;
        values.push(LevelEffect(primary, level + 2));
        stat_data.push(LevelStat {
            stat: stat.to_string(),
            value: primary,
        });
    }

    let (label, description_template) = match role {
        Role::Main => ("Skill", format!("Increases {stat} by {{0}}% for {{1}}s.")),
        Role::Support => ("Buff", format!("Grant {stat} equal to {{0}}% of HP for {{1}}s.")),
    };
    let image_ref = cfg
        .image_overrides
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("{}{id}.png", cfg.asset_base_url));

    Potential {
        name: format!("{} {label} {display_number}", character.name),
        char_id: character.id.clone(),
        role,
        display_number,
        description_template,
        values,
        stat_data,
        rarity: Rarity::for_display_number(display_number),
        image_ref,
        id,
    }
}

impl Catalog {
    /// Build the standard roster and its potentials.
    #[must_use]
    pub fn generate(cfg: &TrackerConfig) -> Self {
        let characters = base_characters();
        let mut potentials = Vec::new();
        for character in &characters {
            for role in [Role::Main, Role::Support] {
                for display_number in 1..=POTENTIALS_PER_ROLE {
                    potentials.push(generate_potential(cfg, character, role, display_number));
                }
            }
        }
        Self {
            characters,
            potentials,
        }
    }

    /// Load a catalog document and validate it against `cfg.max_level`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the catalog shape is inconsistent.
    pub fn from_json(json: &str, cfg: &TrackerConfig) -> Result<Self, CatalogError> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|e| CatalogError::Json(e.to_string()))?;
        catalog.validate(cfg)?;
        Ok(catalog)
    }

    /// Check ids, ownership and per-level table lengths.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self, cfg: &TrackerConfig) -> Result<(), CatalogError> {
        let mut char_ids = HashSet::new();
        for character in &self.characters {
            if !char_ids.insert(character.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "character",
                    id: character.id.clone(),
                });
            }
        }

        let expected = usize::from(cfg.max_level);
        let mut potential_ids = HashSet::new();
        for potential in &self.potentials {
            if !potential_ids.insert(potential.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    kind: "potential",
                    id: potential.id.clone(),
                });
            }
            if !char_ids.contains(potential.char_id.as_str()) {
                return Err(CatalogError::UnknownCharacter {
                    potential_id: potential.id.clone(),
                    char_id: potential.char_id.clone(),
                });
            }
            let key = potential_key(&potential.char_id, potential.role, potential.display_number);
            if key != potential.id {
                return Err(CatalogError::IdMismatch {
                    potential_id: potential.id.clone(),
                    expected: key,
                });
            }
            for (table, got) in [
                ("values", potential.values.len()),
                ("statData", potential.stat_data.len()),
            ] {
                if got != expected {
                    return Err(CatalogError::LevelCount {
                        potential_id: potential.id.clone(),
                        table,
                        got,
                        expected,
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn potential(&self, id: &str) -> Option<&Potential> {
        self.potentials.iter().find(|p| p.id == id)
    }

    /// Potentials available to a character in a role, ordered by display number.
    #[must_use]
    pub fn potentials_for(&self, char_id: &str, role: Role) -> Vec<&Potential> {
        let mut pool: Vec<&Potential> = self
            .potentials
            .iter()
            .filter(|p| p.char_id == char_id && p.role == role)
            .collect();
        pool.sort_by_key(|p| p.display_number);
        pool
    }
}
