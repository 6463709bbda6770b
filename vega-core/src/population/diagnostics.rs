//! Non-fatal diagnostic events
//!
//! Some failures are tolerated rather than propagated: a cache write that
//! fails, or a profile dependency that is already installed. They are
//! reported through a [`DiagnosticSink`] so the core never writes to an
//! output stream itself.

use std::path::PathBuf;
use std::sync::Arc;

use super::ItemKind;

/// A tolerated condition worth telling someone about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// An index could not be written to the cache; the fetch still succeeded
    CacheWriteFailed {
        key: String,
        path: PathBuf,
        message: String,
    },

    /// A profile dependency was already present and left untouched
    DependencyAlreadyInstalled {
        profile: String,
        kind: ItemKind,
        name: String,
    },
}

/// Receiver for [`Diagnostic`] events
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Default sink: forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::CacheWriteFailed { key, path, message } => {
                tracing::warn!(
                    key = %key,
                    path = %path.display(),
                    "Failed to cache index: {}",
                    message
                );
            }
            Diagnostic::DependencyAlreadyInstalled {
                profile,
                kind,
                name,
            } => {
                tracing::info!(
                    profile = %profile,
                    "{} '{}' already installed",
                    kind,
                    name
                );
            }
        }
    }
}

/// Shared handle to a sink
pub type SharedSink = Arc<dyn DiagnosticSink>;

pub(crate) fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}
