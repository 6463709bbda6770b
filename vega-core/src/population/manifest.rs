//! Item manifest parsing (`vega.yaml`)
//!
//! The manifest is the authoritative per-item record. It is fetched on
//! demand and written verbatim into the install directory.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ItemKind, PopulationError, Result};

/// A `vega.yaml` manifest
///
/// `kind` is kept as written; it is not checked against the directory the
/// manifest was fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Persona reference (profiles)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub persona: String,

    /// Skill list (profiles)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,

    /// Suggested skills (personas)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommended_skills: Vec<String>,

    /// System prompt (personas)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_prompt: String,
}

impl Manifest {
    /// Parse manifest from YAML bytes
    pub fn from_slice(content: &[u8]) -> Result<Self> {
        serde_yaml_ng::from_slice(content).map_err(|e| PopulationError::parse("manifest", e))
    }

    /// Parse manifest from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::from_slice(content.as_bytes())
    }

    /// Load manifest from a file path
    ///
    /// Read failures are reported as local fetch failures.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read(path).map_err(|source| super::FetchError::LocalRead {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml_ng::from_slice(&content)
            .map_err(|e| PopulationError::parse(format!("manifest {}", path.display()), e))
    }

    /// The declared kind, if it is one we recognise
    pub fn item_kind(&self) -> Option<ItemKind> {
        self.kind.parse().ok()
    }
}
