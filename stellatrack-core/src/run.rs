//! Runs, their character slots, and the targets assigned to them.
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Which slot of a run a potential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Main,
    Support,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Support => "support",
        }
    }

    /// Parse a role label, case-insensitively.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "main" => Some(Self::Main),
            "support" | "supp" | "sup" => Some(Self::Support),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A potential assigned to a run at a given level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub potential_id: String,
    /// Owner of the potential, kept alongside so no catalog lookup is needed.
    pub char_id: String,
    #[serde(deserialize_with = "saturating_level")]
    pub level: u8,
}

/// Accepts any integer level and saturates it into `u8`; the repository clamps
/// it into `1..=max_level` when opening the store.
fn saturating_level<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(u8::try_from(raw.clamp(0, i64::from(u8::MAX))).unwrap_or(u8::MAX))
}

impl Target {
    #[must_use]
    pub fn new(potential_id: impl Into<String>, char_id: impl Into<String>, level: u8) -> Self {
        Self {
            potential_id: potential_id.into(),
            char_id: char_id.into(),
            level,
        }
    }

    #[must_use]
    pub const fn is_maxed(&self, max_level: u8) -> bool {
        self.level == max_level
    }
}

/// One in-progress build: a main character, two supports and their targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub name: String,
    #[serde(rename = "main")]
    pub main_char_id: String,
    #[serde(rename = "sup1")]
    pub support_char_id_1: String,
    #[serde(rename = "sup2")]
    pub support_char_id_2: String,
    #[serde(default)]
    pub targets: Vec<Target>,
}

impl Run {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        main_char_id: impl Into<String>,
        support_char_id_1: impl Into<String>,
        support_char_id_2: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            main_char_id: main_char_id.into(),
            support_char_id_1: support_char_id_1.into(),
            support_char_id_2: support_char_id_2.into(),
            targets: Vec::new(),
        }
    }

    /// The three character slots in display order, paired with their role.
    #[must_use]
    pub fn slots(&self) -> [(&str, Role); 3] {
        [
            (self.main_char_id.as_str(), Role::Main),
            (self.support_char_id_1.as_str(), Role::Support),
            (self.support_char_id_2.as_str(), Role::Support),
        ]
    }

    /// Whether `char_id` occupies a slot of the given role.
    #[must_use]
    pub fn holds(&self, char_id: &str, role: Role) -> bool {
        self.slots()
            .iter()
            .any(|(slot, slot_role)| *slot == char_id && *slot_role == role)
    }

    /// Role used for a character when its potential is unknown: main wins over support.
    #[must_use]
    pub fn role_of(&self, char_id: &str) -> Option<Role> {
        self.slots()
            .iter()
            .find(|(slot, _)| *slot == char_id)
            .map(|(_, role)| *role)
    }

    #[must_use]
    pub fn find_target(&self, potential_id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.potential_id == potential_id)
    }

    /// Targets owned by one character, in insertion order.
    pub fn targets_for<'a>(&'a self, char_id: &'a str) -> impl Iterator<Item = &'a Target> + 'a {
        self.targets.iter().filter(move |t| t.char_id == char_id)
    }
}
