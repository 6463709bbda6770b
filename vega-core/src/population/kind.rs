//! Item kinds and the name prefixes that select them
//!
//! Capabilities (skills) are addressed by their bare name, personas with an
//! `@` prefix and profiles with a `+` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three kinds of content distributed by a population source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Atomic capability bundle
    Skill,
    /// Agent personality / system prompt definition
    Persona,
    /// Composite of one persona and a list of skills
    Profile,
}

impl ItemKind {
    /// All kinds, in the order they are searched, refreshed and listed
    pub const ALL: [ItemKind; 3] = [ItemKind::Skill, ItemKind::Persona, ItemKind::Profile];

    /// Singular name
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Skill => "skill",
            ItemKind::Persona => "persona",
            ItemKind::Profile => "profile",
        }
    }

    /// Plural form used as the path segment on the source and on disk
    pub fn plural(&self) -> &'static str {
        match self {
            ItemKind::Skill => "skills",
            ItemKind::Persona => "personas",
            ItemKind::Profile => "profiles",
        }
    }

    /// Display prefix for names of this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            ItemKind::Skill => "",
            ItemKind::Persona => "@",
            ItemKind::Profile => "+",
        }
    }

    /// Cache key under which this kind's index is stored
    pub fn index_cache_key(&self) -> String {
        format!("{}-index.yaml", self.plural())
    }

    /// Path of this kind's index relative to the source root
    pub fn index_path(&self) -> String {
        format!("{}/index.yaml", self.plural())
    }

    /// Path of an item's manifest relative to the source root
    pub fn manifest_path(&self, name: &str) -> String {
        format!("{}/{}/{}", self.plural(), name, super::MANIFEST_FILE)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skill" | "skills" => Ok(ItemKind::Skill),
            "persona" | "personas" => Ok(ItemKind::Persona),
            "profile" | "profiles" => Ok(ItemKind::Profile),
            other => Err(format!(
                "Unknown item kind '{other}'. Expected one of: skill, persona, profile"
            )),
        }
    }
}

/// Split a possibly-prefixed name into its kind and bare name
///
/// `@name` is a persona, `+name` is a profile, anything else is a skill.
pub fn parse_item_name(input: &str) -> (ItemKind, &str) {
    if let Some(name) = input.strip_prefix('@') {
        (ItemKind::Persona, name)
    } else if let Some(name) = input.strip_prefix('+') {
        (ItemKind::Profile, name)
    } else {
        (ItemKind::Skill, input)
    }
}

/// Check that a bare item name is a single path component
///
/// Names are joined into repository and install paths, so they must be
/// non-empty and free of separators and `.`/`..`.
pub fn validate_item_name(kind: ItemKind, name: &str) -> super::Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(super::PopulationError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Render a name with the prefix of its kind
pub fn format_item_name(kind: ItemKind, name: &str) -> String {
    format!("{}{}", kind.prefix(), name)
}
