//! Index parsing (`<kind>/index.yaml`)
//!
//! Each kind has one index mapping item names to summary metadata. Skills and
//! personas share an entry shape; profiles reference a persona and a list of
//! skills instead of carrying tags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ItemKind, PopulationError, Result};

/// An entry in the skills or personas index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Tool names provided (skills only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

/// An entry in the profiles index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileIndexEntry {
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    /// Persona this profile is built on (may be empty)
    #[serde(default)]
    pub persona: String,

    /// Skills this profile bundles, in install order
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SkillsIndex {
    #[serde(default)]
    skills: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct PersonasIndex {
    #[serde(default)]
    personas: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct ProfilesIndex {
    #[serde(default)]
    profiles: BTreeMap<String, ProfileIndexEntry>,
}

/// A parsed index of one kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    /// Skills or personas
    Entries {
        kind: ItemKind,
        entries: BTreeMap<String, IndexEntry>,
    },
    Profiles(BTreeMap<String, ProfileIndexEntry>),
}

impl Index {
    /// Parse index bytes, selecting the expected shape by kind
    pub fn parse(kind: ItemKind, content: &[u8]) -> Result<Self> {
        let what = format!("{} index", kind.plural());

        match kind {
            ItemKind::Skill => {
                let idx: SkillsIndex = serde_yaml_ng::from_slice(content)
                    .map_err(|e| PopulationError::parse(what, e))?;
                Ok(Index::Entries {
                    kind,
                    entries: idx.skills,
                })
            }
            ItemKind::Persona => {
                let idx: PersonasIndex = serde_yaml_ng::from_slice(content)
                    .map_err(|e| PopulationError::parse(what, e))?;
                Ok(Index::Entries {
                    kind,
                    entries: idx.personas,
                })
            }
            ItemKind::Profile => {
                let idx: ProfilesIndex = serde_yaml_ng::from_slice(content)
                    .map_err(|e| PopulationError::parse(what, e))?;
                Ok(Index::Profiles(idx.profiles))
            }
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Index::Entries { kind, .. } => *kind,
            Index::Profiles(_) => ItemKind::Profile,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Index::Entries { entries, .. } => entries.len(),
            Index::Profiles(profiles) => profiles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            Index::Entries { entries, .. } => entries.contains_key(name),
            Index::Profiles(profiles) => profiles.contains_key(name),
        }
    }

    /// Look up a skill or persona entry
    pub fn entry(&self, name: &str) -> Option<&IndexEntry> {
        match self {
            Index::Entries { entries, .. } => entries.get(name),
            Index::Profiles(_) => None,
        }
    }

    /// Look up a profile entry
    pub fn profile(&self, name: &str) -> Option<&ProfileIndexEntry> {
        match self {
            Index::Profiles(profiles) => profiles.get(name),
            Index::Entries { .. } => None,
        }
    }
}
