//! Client facade over source, cache and installer

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::diagnostics::{default_sink, SharedSink};
use super::installer::{list_installed, InstallOptions, InstallReport, InstalledItem, Installer};
use super::search::{SearchOptions, SearchResult};
use super::source::{ItemInfo, Source};
use super::{parse_item_name, Cache, ItemKind, Manifest, PopulationConfig, Result};

/// Entry point for population operations
///
/// Holds the resolved configuration and the index cache. Every operation
/// builds a fresh [`Source`] from the configuration.
pub struct Client {
    config: PopulationConfig,
    cache: Cache,
    sink: SharedSink,
}

impl Client {
    pub fn new(config: PopulationConfig) -> Self {
        let cache =
            Cache::new(&config.cache_dir, config.cache_disabled).with_ttl(config.cache_ttl);

        Self {
            config,
            cache,
            sink: default_sink(),
        }
    }

    /// Route non-fatal diagnostics to a custom sink
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    fn source(&self) -> Result<Source> {
        debug!("Using source {}", self.config.source);
        Ok(Source::new(&self.config.source, self.cache.clone())?.with_sink(self.sink.clone()))
    }

    /// Search the selected indexes
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        self.source()?.search(query, options, cancel).await
    }

    /// Install an item by prefixed name (`name`, `@persona`, `+profile`)
    pub async fn install(
        &self,
        name: &str,
        options: InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstallReport> {
        let (kind, name) = parse_item_name(name);
        self.install_kind(kind, name, options, cancel).await
    }

    /// Install an item of an explicit kind
    pub async fn install_kind(
        &self,
        kind: ItemKind,
        name: &str,
        options: InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstallReport> {
        let source = self.source()?;
        Installer::new(&source, &self.config.install_dir)
            .install(kind, name, options, cancel)
            .await
    }

    /// List installed items, optionally of one kind
    ///
    /// Entries without a readable manifest are skipped.
    pub fn list(&self, kind: Option<ItemKind>) -> Result<Vec<InstalledItem>> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => ItemKind::ALL.to_vec(),
        };
        list_installed(&self.config.install_dir, &kinds)
    }

    /// Describe an item by prefixed name
    pub async fn info(&self, name: &str, cancel: &CancellationToken) -> Result<ItemInfo> {
        let (kind, name) = parse_item_name(name);
        self.source()?
            .info(kind, name, &self.config.install_dir, cancel)
            .await
    }

    /// Fetch and parse an item's manifest by prefixed name
    pub async fn manifest(&self, name: &str, cancel: &CancellationToken) -> Result<Manifest> {
        let (kind, name) = parse_item_name(name);
        self.source()?.get_manifest(kind, name, cancel).await
    }

    /// Drop the index cache and fetch every index again
    pub async fn update_cache(&self, cancel: &CancellationToken) -> Result<()> {
        self.source()?.update_cache(cancel).await
    }
}
