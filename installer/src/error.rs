//! Error types for the sitesync installer.
//!
//! Component errors are folded into [`SyncError`], which names the stage that
//! failed, and the binary wraps everything in [`SiteError`] so each failure
//! prints as one line.

use thiserror::Error;

use crate::content::fetch::FetchError;
use crate::content::install::InstallError;
use crate::release::locator::LocateError;
use crate::serve::ServeError;
use crate::sync::SyncState;
use crate::version_store::VersionStoreError;

/// An unrecoverable synchronization failure.
///
/// Displays as `<stage> failed: <cause>`.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct SyncError {
    /// The state the orchestrator was in when the failure occurred.
    pub stage: SyncState,
    /// The component error.
    #[source]
    pub source: SyncFailure,
}

impl SyncError {
    /// Attribute `source` to `stage`.
    pub fn new(stage: SyncState, source: impl Into<SyncFailure>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// The component error behind a [`SyncError`].
#[derive(Debug, Error)]
pub enum SyncFailure {
    /// The release index query failed or had no matching asset.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// The version marker could not be written.
    #[error(transparent)]
    VersionStore(#[from] VersionStoreError),

    /// The asset download failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The archive could not be installed.
    #[error(transparent)]
    Install(#[from] InstallError),
}

/// Top-level errors reported by the `sitesync` binary.
#[derive(Debug, Error)]
pub enum SiteError {
    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] sitesync::ConfigError),

    /// The current directory could not be determined.
    #[error("cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    /// A path supplied or discovered is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },

    /// Synchronization failed; the server was not started.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The static server could not be started.
    #[error(transparent)]
    Serve(#[from] ServeError),

    /// Waiting for the operator's stop signal failed.
    #[error("failed to read from standard input: {0}")]
    Stdin(#[source] std::io::Error),
}

/// Result type alias using [`SiteError`].
pub type Result<T> = std::result::Result<T, SiteError>;
