//! Fetching indexes and manifests from a repository
//!
//! A source is either a local directory or an http(s) endpoint. Index files
//! go through the [`Cache`]; manifests are always fetched fresh.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::diagnostics::{default_sink, Diagnostic, SharedSink};
use super::kind::validate_item_name;
use super::search::{rank, search_index, SearchOptions, SearchResult};
use super::{
    Cache, FetchError, Index, ItemKind, Manifest, PopulationError, Result, MANIFEST_FILE,
};

/// Everything known about an item, plus whether it is installed
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ItemInfo {
    pub kind: ItemKind,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub tags: Vec<String>,
    /// Skills and personas: tool names from the index
    pub tools: Vec<String>,
    /// Profiles: referenced persona
    pub persona: Option<String>,
    /// Profiles: referenced skills
    pub skills: Vec<String>,
    /// Install directory of the item, when its manifest file exists
    pub installed_path: Option<PathBuf>,
}

impl ItemInfo {
    pub fn is_installed(&self) -> bool {
        self.installed_path.is_some()
    }
}

enum Location {
    Local(PathBuf),
    Remote {
        base_url: String,
        client: reqwest::Client,
    },
}

/// A repository of skills, personas and profiles
pub struct Source {
    base: String,
    location: Location,
    cache: Cache,
    sink: SharedSink,
}

impl Source {
    /// Create a source for a base location
    ///
    /// Anything not starting with `http://` or `https://` is a local path.
    pub fn new(base: &str, cache: Cache) -> Result<Self> {
        let mut base = base.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let is_remote = base.starts_with("http://") || base.starts_with("https://");

        let location = if is_remote {
            let client = reqwest::Client::builder()
                .user_agent(concat!("vega/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(PopulationError::HttpClient)?;
            Location::Remote {
                base_url: base.clone(),
                client,
            }
        } else {
            match base.trim_end_matches('/') {
                "" => Location::Local(PathBuf::from("/")),
                root => Location::Local(PathBuf::from(root)),
            }
        };

        Ok(Self {
            base,
            location,
            cache,
            sink: default_sink(),
        })
    }

    /// Route diagnostics to a custom sink
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// The normalized base location (always ends with `/`)
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_local(&self) -> bool {
        matches!(self.location, Location::Local(_))
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub(crate) fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Fetch raw bytes for a path relative to the base
    pub async fn fetch(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        match &self.location {
            Location::Local(root) => {
                let full_path = root.join(path);
                if cancel.is_cancelled() {
                    return Err(FetchError::Cancelled {
                        url: full_path.display().to_string(),
                    });
                }
                debug!("Reading {}", full_path.display());
                std::fs::read(&full_path).map_err(|source| FetchError::LocalRead {
                    path: full_path,
                    source,
                })
            }
            Location::Remote { base_url, client } => {
                let url = format!("{base_url}{path}");
                debug!("Fetching {}", url);

                let sent = tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled { url: url.clone() }),
                    sent = client.get(&url).send() => sent,
                };
                let response = sent.map_err(|source| FetchError::RemoteTransport {
                    url: url.clone(),
                    source,
                })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::RemoteStatus {
                        url,
                        status: status.as_u16(),
                    });
                }

                let read = tokio::select! {
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled { url: url.clone() }),
                    read = response.bytes() => read,
                };
                let body = read.map_err(|source| FetchError::RemoteBody { url, source })?;

                Ok(body.to_vec())
            }
        }
    }

    /// Fetch and parse the index of one kind, consulting the cache first
    pub async fn get_index(&self, kind: ItemKind, cancel: &CancellationToken) -> Result<Index> {
        let cache_key = kind.index_cache_key();

        if let Some(content) = self.cache.get(&cache_key) {
            return Index::parse(kind, &content);
        }

        let content = self.fetch(&kind.index_path(), cancel).await?;

        // Caching is best effort
        if let Err(e) = self.cache.set(&cache_key, &content) {
            self.sink.emit(&Diagnostic::CacheWriteFailed {
                key: cache_key,
                path: e.path.clone(),
                message: format!("{e}: {}", e.source),
            });
        }

        Index::parse(kind, &content)
    }

    /// Fetch the raw bytes of an item's manifest (never cached)
    pub async fn get_manifest_raw(
        &self,
        kind: ItemKind,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        validate_item_name(kind, name)?;
        Ok(self.fetch(&kind.manifest_path(name), cancel).await?)
    }

    /// Fetch and parse an item's manifest
    pub async fn get_manifest(
        &self,
        kind: ItemKind,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Manifest> {
        let content = self.get_manifest_raw(kind, name, cancel).await?;
        Manifest::from_slice(&content)
    }

    /// Search indexes of the selected kinds and rank the matches
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();

        for kind in options.kinds() {
            let index = self.get_index(kind, cancel).await?;
            results.extend(search_index(&index, query, options));
        }

        Ok(rank(results, options.limit))
    }

    /// Describe an item from its index entry and check whether it is installed
    pub async fn info(
        &self,
        kind: ItemKind,
        name: &str,
        install_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<ItemInfo> {
        validate_item_name(kind, name)?;
        let index = self.get_index(kind, cancel).await?;
        let not_found = || PopulationError::NotFound {
            kind,
            name: name.to_string(),
        };

        let mut info = if kind == ItemKind::Profile {
            let entry = index.profile(name).ok_or_else(not_found)?;
            ItemInfo {
                kind,
                name: name.to_string(),
                version: entry.version.clone(),
                description: entry.description.clone(),
                author: entry.author.clone(),
                tags: Vec::new(),
                tools: Vec::new(),
                persona: (!entry.persona.is_empty()).then(|| entry.persona.clone()),
                skills: entry.skills.clone(),
                installed_path: None,
            }
        } else {
            let entry = index.entry(name).ok_or_else(not_found)?;
            ItemInfo {
                kind,
                name: name.to_string(),
                version: entry.version.clone(),
                description: entry.description.clone(),
                author: entry.author.clone(),
                tags: entry.tags.clone(),
                tools: entry.tools.clone(),
                persona: None,
                skills: Vec::new(),
                installed_path: None,
            }
        };

        let item_dir = install_dir.join(kind.plural()).join(name);
        if item_dir.join(MANIFEST_FILE).exists() {
            info.installed_path = Some(item_dir);
        }

        Ok(info)
    }

    /// Drop every cached index, then fetch all three again
    ///
    /// Stops at the first failure; indexes fetched before it stay cached.
    pub async fn update_cache(&self, cancel: &CancellationToken) -> Result<()> {
        self.cache.invalidate_all()?;

        for kind in ItemKind::ALL {
            self.get_index(kind, cancel)
                .await
                .map_err(|e| PopulationError::IndexRefresh {
                    kind,
                    source: Box::new(e),
                })?;
        }

        Ok(())
    }
}
