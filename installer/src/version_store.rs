//! Persisted release tag for a content root.
//!
//! The tag lives in a plain-text marker beside the content root. Reads never
//! fail: a missing, unreadable, or blank file simply means "no cached
//! version". Writes go through a temporary sibling and a rename so that a
//! crash leaves either the old or the new tag on disk.

use camino::{Utf8Path, Utf8PathBuf};

use crate::atomic_write::write_atomically;

/// Errors that prevent the cached tag from being persisted.
#[derive(Debug, thiserror::Error)]
#[error("failed to write version marker {path}: {source}")]
pub struct VersionStoreError {
    /// Marker file that could not be written.
    pub path: Utf8PathBuf,
    /// Underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

/// Reads and writes the cached release tag.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: Utf8PathBuf,
}

impl VersionStore {
    /// Create a store backed by the marker file at `path`.
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }

    /// Path of the marker file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Return the cached tag, or `None` when nothing usable is stored.
    #[must_use]
    pub fn read_cached_version(&self) -> Option<String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) => {
                log::debug!("no cached version at {}: {error}", self.path);
                return None;
            }
        };
        let tag = content.trim();
        if tag.is_empty() {
            return None;
        }
        Some(tag.to_owned())
    }

    /// Replace the cached tag with `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionStoreError`] when the marker cannot be written.
    pub fn write_cached_version(&self, tag: &str) -> Result<(), VersionStoreError> {
        write_atomically(&self.path, tag.as_bytes()).map_err(|source| VersionStoreError {
            path: self.path.clone(),
            source,
        })?;
        log::debug!("cached version {tag} written to {}", self.path);
        Ok(())
    }
}
