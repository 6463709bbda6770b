//! Installing items into the local install directory
//!
//! An installed item is exactly one file, `<install_dir>/<kind>s/<name>/vega.yaml`,
//! holding the manifest bytes as fetched. Installing a profile first installs
//! the persona and skills it references.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::diagnostics::Diagnostic;
use super::kind::validate_item_name;
use super::{ItemKind, Manifest, PopulationError, Result, Source, MANIFEST_FILE};

/// How to treat existing installations and dependencies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Overwrite existing installations
    pub force: bool,
    /// Skip profile dependencies (persona and skills)
    pub no_deps: bool,
    /// Resolve and fetch, but write nothing
    pub dry_run: bool,
}

/// What happened to one item during an install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallAction {
    /// Manifest written
    Installed,
    /// Dry run: manifest would have been written
    WouldInstall,
    /// Dependency already present and left as is
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallStep {
    pub kind: ItemKind,
    pub name: String,
    /// Directory holding the item's manifest
    pub path: PathBuf,
    pub action: InstallAction,
}

/// Every item touched by one install call, in the order they were handled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub steps: Vec<InstallStep>,
}

impl InstallReport {
    /// The item that was asked for (always the last step)
    pub fn target(&self) -> Option<&InstallStep> {
        self.steps.last()
    }

    /// Dependencies handled before the target
    pub fn dependencies(&self) -> &[InstallStep] {
        match self.steps.split_last() {
            Some((_, deps)) => deps,
            None => &[],
        }
    }
}

/// An item found in the install directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledItem {
    pub kind: ItemKind,
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// Installs items from a [`Source`] into an install directory
pub struct Installer<'a> {
    source: &'a Source,
    install_dir: PathBuf,
}

impl<'a> Installer<'a> {
    pub fn new(source: &'a Source, install_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            install_dir: install_dir.into(),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Directory an item is installed into
    pub fn install_path(&self, kind: ItemKind, name: &str) -> PathBuf {
        install_path(&self.install_dir, kind, name)
    }

    /// Path of an item's installed manifest
    pub fn manifest_path(&self, kind: ItemKind, name: &str) -> PathBuf {
        self.install_path(kind, name).join(MANIFEST_FILE)
    }

    /// Check whether an item's manifest file exists
    pub fn is_installed(&self, kind: ItemKind, name: &str) -> bool {
        self.manifest_path(kind, name).exists()
    }

    /// Install an item, and for profiles its persona and skills first
    ///
    /// Dependencies installed before a later failure are left in place.
    pub async fn install(
        &self,
        kind: ItemKind,
        name: &str,
        options: InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstallReport> {
        self.ensure_installable(kind, name, options)?;

        let mut report = InstallReport::default();

        if kind == ItemKind::Profile && !options.no_deps {
            self.install_dependencies(name, options, cancel, &mut report)
                .await?;
        }

        let step = self.write_manifest(kind, name, options, cancel).await?;
        report.steps.push(step);

        Ok(report)
    }

    fn ensure_installable(
        &self,
        kind: ItemKind,
        name: &str,
        options: InstallOptions,
    ) -> Result<()> {
        validate_item_name(kind, name)?;

        if !options.force && self.is_installed(kind, name) {
            return Err(PopulationError::AlreadyInstalled {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Install a single item with no dependency handling
    async fn install_leaf(
        &self,
        kind: ItemKind,
        name: &str,
        options: InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstallStep> {
        self.ensure_installable(kind, name, options)?;
        self.write_manifest(kind, name, options, cancel).await
    }

    /// Fetch the manifest and, unless dry-running, write it in place
    async fn write_manifest(
        &self,
        kind: ItemKind,
        name: &str,
        options: InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstallStep> {
        let content = self.source.get_manifest_raw(kind, name, cancel).await?;
        Manifest::from_slice(&content)?;

        let dest_dir = self.install_path(kind, name);

        if options.dry_run {
            debug!("Would install {} '{}' to {}", kind, name, dest_dir.display());
            return Ok(InstallStep {
                kind,
                name: name.to_string(),
                path: dest_dir,
                action: InstallAction::WouldInstall,
            });
        }

        std::fs::create_dir_all(&dest_dir).map_err(|source| PopulationError::Write {
            path: dest_dir.clone(),
            source,
        })?;

        let dest_path = dest_dir.join(MANIFEST_FILE);
        std::fs::write(&dest_path, &content).map_err(|source| PopulationError::Write {
            path: dest_path.clone(),
            source,
        })?;

        info!("Installed {} '{}' to {}", kind, name, dest_dir.display());

        Ok(InstallStep {
            kind,
            name: name.to_string(),
            path: dest_dir,
            action: InstallAction::Installed,
        })
    }

    /// Install a profile's persona, then its skills in listed order
    async fn install_dependencies(
        &self,
        profile: &str,
        options: InstallOptions,
        cancel: &CancellationToken,
        report: &mut InstallReport,
    ) -> Result<()> {
        let index = self.source.get_index(ItemKind::Profile, cancel).await?;
        let entry = index
            .profile(profile)
            .ok_or_else(|| PopulationError::NotFound {
                kind: ItemKind::Profile,
                name: profile.to_string(),
            })?;

        let persona = (!entry.persona.is_empty()).then_some((ItemKind::Persona, &entry.persona));
        let skills = entry.skills.iter().map(|s| (ItemKind::Skill, s));

        // Reject unusable names before anything is written
        for (kind, name) in persona.clone().into_iter().chain(skills.clone()) {
            validate_item_name(kind, name).map_err(|e| PopulationError::Dependency {
                profile: profile.to_string(),
                kind,
                name: name.clone(),
                source: Box::new(e),
            })?;
        }

        let dep_options = InstallOptions {
            no_deps: true,
            ..options
        };

        for (kind, name) in persona.into_iter().chain(skills) {
            debug!("Installing {} '{}' for profile '{}'", kind, name, profile);

            match self.install_leaf(kind, name, dep_options, cancel).await {
                Ok(step) => report.steps.push(step),
                Err(e) if e.is_already_installed() && !options.force => {
                    self.source
                        .sink()
                        .emit(&Diagnostic::DependencyAlreadyInstalled {
                            profile: profile.to_string(),
                            kind,
                            name: name.clone(),
                        });
                    report.steps.push(InstallStep {
                        kind,
                        name: name.clone(),
                        path: self.install_path(kind, name),
                        action: InstallAction::AlreadyPresent,
                    });
                }
                Err(e) => {
                    return Err(PopulationError::Dependency {
                        profile: profile.to_string(),
                        kind,
                        name: name.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Directory an item is installed into under `install_dir`
pub fn install_path(install_dir: &Path, kind: ItemKind, name: &str) -> PathBuf {
    install_dir.join(kind.plural()).join(name)
}

/// Scan the install directory for installed items
///
/// Directories without a readable, parseable manifest are skipped. Results
/// are ordered by kind, then name.
pub fn list_installed(install_dir: &Path, kinds: &[ItemKind]) -> Result<Vec<InstalledItem>> {
    let mut items = Vec::new();

    for &kind in kinds {
        let dir = install_dir.join(kind.plural());

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => return Err(PopulationError::ReadDir { path: dir, source }),
        };

        let mut found = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            match Manifest::from_file(&path.join(MANIFEST_FILE)) {
                Ok(manifest) => found.push(InstalledItem {
                    kind,
                    name,
                    version: manifest.version,
                    path,
                }),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }

        found.sort_by(|a, b| a.name.cmp(&b.name));
        items.extend(found);
    }

    Ok(items)
}
