//! Population client configuration
//!
//! The configuration is an explicit value. The entry point resolves the home
//! directory once (see [`PopulationConfig::discover`]), optionally layers a
//! config file and command line overrides on top, and hands the result to
//! [`Client::new`](super::Client::new). Nothing below the entry point reads
//! the process environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{PopulationError, Result};

/// Default repository the client installs from
pub const DEFAULT_SOURCE: &str = "https://raw.githubusercontent.com/martellcode/vega-population/main/";

/// Vega home directory, relative to the user's home
pub const VEGA_HOME_DIR: &str = ".vega";

/// Index cache directory, relative to the vega home
pub const DEFAULT_CACHE_DIR: &str = "cache/population";

/// Optional configuration file, relative to the vega home
pub const CONFIG_FILE: &str = "population.yaml";

/// Default cache TTL (1 hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationConfig {
    /// Local directory or http(s) URL of the repository
    pub source: String,

    /// Where index files are cached
    pub cache_dir: PathBuf,

    /// Where items are installed
    pub install_dir: PathBuf,

    /// Bypass the index cache entirely
    pub cache_disabled: bool,

    /// How long a cached index stays fresh
    pub cache_ttl: Duration,
}

/// On-disk overrides (`~/.vega/population.yaml`)
///
/// Every key is optional; absent keys leave the current value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    #[serde(default)]
    pub no_cache: Option<bool>,

    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

impl PopulationConfig {
    /// Defaults rooted at the given home directory
    pub fn for_home(home: &Path) -> Self {
        let vega_home = home.join(VEGA_HOME_DIR);

        Self {
            source: DEFAULT_SOURCE.to_string(),
            cache_dir: vega_home.join(DEFAULT_CACHE_DIR),
            install_dir: vega_home,
            cache_disabled: false,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Defaults rooted at the current user's home directory
    pub fn discover() -> Result<Self> {
        Ok(Self::for_home(&home_dir()?))
    }

    /// Defaults for the current user with a config file layered on top
    ///
    /// Without an explicit path the default `~/.vega/population.yaml` is used
    /// when it exists. An explicit path must exist.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let home = home_dir()?;
        let defaults = Self::for_home(&home);

        match config_file {
            Some(path) => {
                let file = ConfigFile::load(path)?.ok_or_else(|| PopulationError::ConfigRead {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })?;
                Ok(defaults.apply(file))
            }
            None => defaults.with_config_file(&Self::default_config_path(&home)),
        }
    }

    /// Default location of the optional config file for a home directory
    pub fn default_config_path(home: &Path) -> PathBuf {
        home.join(VEGA_HOME_DIR).join(CONFIG_FILE)
    }

    /// Layer a config file over this configuration
    ///
    /// A missing file leaves the configuration unchanged.
    pub fn with_config_file(self, path: &Path) -> Result<Self> {
        match ConfigFile::load(path)? {
            Some(file) => Ok(self.apply(file)),
            None => Ok(self),
        }
    }

    /// Apply the keys present in a config file
    pub fn apply(mut self, file: ConfigFile) -> Self {
        if let Some(source) = file.source {
            self.source = source;
        }
        if let Some(cache_dir) = file.cache_dir {
            self.cache_dir = cache_dir;
        }
        if let Some(install_dir) = file.install_dir {
            self.install_dir = install_dir;
        }
        if let Some(no_cache) = file.no_cache {
            self.cache_disabled = no_cache;
        }
        if let Some(secs) = file.cache_ttl_secs {
            self.cache_ttl = Duration::from_secs(secs);
        }
        self
    }

    /// Use a custom source URL or local path
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Use a custom cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Use a custom installation directory
    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = dir.into();
        self
    }

    /// Disable caching of index files
    pub fn without_cache(mut self) -> Self {
        self.cache_disabled = true;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(PopulationError::NoHomeDirectory)
}

impl ConfigFile {
    /// Load a config file, returning `None` if it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("No population config at {}", path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|source| {
            PopulationError::ConfigRead {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let file = serde_yaml_ng::from_str(&content).map_err(|source| {
            PopulationError::ConfigParse {
                path: path.to_path_buf(),
                source,
            }
        })?;

        debug!("Loaded population config from {}", path.display());
        Ok(Some(file))
    }
}
