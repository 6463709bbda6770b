//! Population error types
//!
//! Every failure the core can report is a typed variant. Callers that need to
//! react to a specific condition (the installer tolerating an already
//! installed dependency, for example) match on [`ErrorKind`] rather than on
//! message text.

use std::path::PathBuf;
use thiserror::Error;

use super::ItemKind;

/// Result alias for population operations
pub type Result<T> = std::result::Result<T, PopulationError>;

/// Which leg of a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    LocalRead,
    RemoteTransport,
    RemoteStatus,
    RemoteBody,
    Cancelled,
}

/// Failure to retrieve bytes from a source
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to read local file {path}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {url}")]
    RemoteTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch {url}: HTTP {status}")]
    RemoteStatus { url: String, status: u16 },

    #[error("Failed to read response body from {url}")]
    RemoteBody {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetch of {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::LocalRead { .. } => FetchErrorKind::LocalRead,
            FetchError::RemoteTransport { .. } => FetchErrorKind::RemoteTransport,
            FetchError::RemoteStatus { .. } => FetchErrorKind::RemoteStatus,
            FetchError::RemoteBody { .. } => FetchErrorKind::RemoteBody,
            FetchError::Cancelled { .. } => FetchErrorKind::Cancelled,
        }
    }
}

/// Failure to store an entry in the index cache
#[derive(Error, Debug)]
#[error("Failed to write cache entry {path}")]
pub struct CacheWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Coarse classification of a [`PopulationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fetch,
    Parse,
    NotFound,
    InvalidName,
    AlreadyInstalled,
    CacheWrite,
    Io,
    Dependency,
    Config,
}

#[derive(Error, Debug)]
pub enum PopulationError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to parse {what}")]
    Parse {
        what: String,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: ItemKind, name: String },

    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: ItemKind,
        name: String,
        reason: &'static str,
    },

    #[error("{kind} '{name}' is already installed (use --force to overwrite)")]
    AlreadyInstalled { kind: ItemKind, name: String },

    #[error(transparent)]
    CacheWrite(#[from] CacheWriteError),

    #[error("Failed to clear cache at {path}")]
    CacheClear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read install directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Installing {kind} '{name}' (dependency of profile '{profile}')")]
    Dependency {
        profile: String,
        kind: ItemKind,
        name: String,
        #[source]
        source: Box<PopulationError>,
    },

    #[error("Fetching {} index", .kind.plural())]
    IndexRefresh {
        kind: ItemKind,
        #[source]
        source: Box<PopulationError>,
    },

    #[error("Failed to create HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("Failed to read configuration file {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Could not determine home directory")]
    NoHomeDirectory,
}

impl PopulationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PopulationError::Fetch(_) | PopulationError::HttpClient(_) => ErrorKind::Fetch,
            PopulationError::Parse { .. } => ErrorKind::Parse,
            PopulationError::NotFound { .. } => ErrorKind::NotFound,
            PopulationError::InvalidName { .. } => ErrorKind::InvalidName,
            PopulationError::AlreadyInstalled { .. } => ErrorKind::AlreadyInstalled,
            PopulationError::CacheWrite(_) => ErrorKind::CacheWrite,
            PopulationError::CacheClear { .. }
            | PopulationError::Write { .. }
            | PopulationError::ReadDir { .. } => ErrorKind::Io,
            PopulationError::Dependency { .. } => ErrorKind::Dependency,
            // A failed refresh is whatever failed underneath it
            PopulationError::IndexRefresh { source, .. } => source.kind(),
            PopulationError::ConfigRead { .. }
            | PopulationError::ConfigParse { .. }
            | PopulationError::NoHomeDirectory => ErrorKind::Config,
        }
    }

    pub fn is_already_installed(&self) -> bool {
        self.kind() == ErrorKind::AlreadyInstalled
    }

    /// The fetch failure behind this error, if any
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            PopulationError::Fetch(e) => Some(e),
            PopulationError::Dependency { source, .. }
            | PopulationError::IndexRefresh { source, .. } => source.fetch_error(),
            _ => None,
        }
    }

    pub(crate) fn parse(what: impl Into<String>, source: serde_yaml_ng::Error) -> Self {
        PopulationError::Parse {
            what: what.into(),
            source,
        }
    }
}
