//! Vega Population - skills, personas and profiles
//!
//! This module provides functionality for discovering, installing,
//! and listing agent content published in a population repository.
//!
//! # Overview
//!
//! A population repository distributes three kinds of item:
//! - Skills (`name`): tool and command bundles an agent can invoke
//! - Personas (`@name`): agent personalities defined by a system prompt
//! - Profiles (`+name`): one persona plus a list of skills
//!
//! Each kind has an index listing every item, and each item has a
//! `vega.yaml` manifest. Installing copies the manifest into the install
//! directory; installing a profile installs its persona and skills first.
//!
//! # Architecture
//!
//! ```text
//! Repository (local dir or https://...)
//!     │
//!     ├── skills/index.yaml            ← Index per kind
//!     ├── skills/<name>/vega.yaml      ← Manifest per item
//!     ├── personas/...
//!     └── profiles/...
//!            │
//!            ▼
//!     Source ──── Cache (~/.vega/cache/population/<kind>s-index.yaml)
//!            │
//!            ▼
//!     Client (search / install / list / info / update)
//!            │
//!            ▼
//!     ~/.vega/<kind>s/<name>/vega.yaml ← Installed items
//! ```

mod cache;
mod client;
mod config;
mod diagnostics;
mod error;
mod index;
mod installer;
mod kind;
mod manifest;
mod search;
mod source;

/// File name of an item manifest, both in the repository and when installed
pub const MANIFEST_FILE: &str = "vega.yaml";

pub use cache::Cache;
pub use client::Client;
pub use config::{
    ConfigFile, PopulationConfig, CONFIG_FILE, DEFAULT_CACHE_DIR, DEFAULT_CACHE_TTL,
    DEFAULT_SOURCE, VEGA_HOME_DIR,
};
pub use diagnostics::{Diagnostic, DiagnosticSink, SharedSink, TracingSink};
pub use error::{
    CacheWriteError, ErrorKind, FetchError, FetchErrorKind, PopulationError, Result,
};
pub use index::{Index, IndexEntry, ProfileIndexEntry};
pub use installer::{
    install_path, list_installed, InstallAction, InstallOptions, InstallReport, InstallStep,
    InstalledItem, Installer,
};
pub use kind::{format_item_name, parse_item_name, ItemKind};
pub use manifest::Manifest;
pub use search::{rank, score_entry, score_profile, search_index, SearchOptions, SearchResult};
pub use source::{ItemInfo, Source};

#[cfg(test)]
mod tests;
