//! Synchronization of the content root with the latest upstream release.
//!
//! The orchestrator decides between three paths: reuse the installed content
//! without asking the network, confirm it is current, or download and
//! install the latest release. The plugin overlay is applied afterwards on a
//! best-effort basis. Collaborators are passed in explicitly so tests can
//! substitute mocks; [`synchronize`] wires the production implementations.
//!
//! ```text
//! Absent -> CheckingVersion -> UpToDate ------------------+
//!                   |                                     v
//!                   +-> Downloading -> Installing -> [Overlaying] -> Ready
//! (skip check + marker present) ------------------------^
//! ```

use camino::Utf8Path;
use sitesync::ReleaseConfig;
use std::fmt;
use std::io::Write;

use crate::content::fetch::{ContentFetcher, HttpFetcher};
use crate::content::install::{ContentInstaller, ZipInstaller};
use crate::content::progress::DownloadProgress;
use crate::error::{SyncError, SyncFailure};
use crate::layout::SiteLayout;
use crate::output::{installed_message, overlay_message, write_stderr_line};
use crate::overlay::{Manifest, apply_overlay, remove_stale_manifest};
use crate::release::asset::ReleaseAsset;
use crate::release::locator::{HttpReleaseLocator, ReleaseLocator};
use crate::version_store::VersionStore;

/// States of one synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// The content root does not exist yet.
    Absent,
    /// Querying the release index and comparing tags.
    CheckingVersion,
    /// The installed content matches the latest release.
    UpToDate,
    /// Streaming the release asset to disk.
    Downloading,
    /// Extracting the asset into the content root.
    Installing,
    /// Copying plugin bundles and writing the manifest.
    Overlaying,
    /// The content root is ready to serve.
    Ready,
    /// The run was aborted.
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Absent => "absent",
            Self::CheckingVersion => "checking version",
            Self::UpToDate => "up to date",
            Self::Downloading => "downloading",
            Self::Installing => "installing",
            Self::Overlaying => "overlaying",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Options for one synchronization run.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig<'a> {
    /// Paths of the content root and its markers.
    pub layout: &'a SiteLayout,
    /// Reuse an installed content root without querying the release index.
    pub skip_remote_check: bool,
    /// Plugin search root; `None` removes any stale manifest instead.
    pub mods_path: Option<&'a Utf8Path>,
    /// Suppress progress lines on the stderr writer.
    pub quiet: bool,
}

/// Collaborators used by the orchestrator.
#[derive(Clone, Copy)]
pub struct SyncServices<'a> {
    /// Finds the latest release asset.
    pub locator: &'a dyn ReleaseLocator,
    /// Downloads the asset.
    pub fetcher: &'a dyn ContentFetcher,
    /// Extracts the asset into the content root.
    pub installer: &'a dyn ContentInstaller,
}

/// How the base content was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentStatus {
    /// The installed content already matched the latest release.
    UpToDate {
        /// The current release tag.
        tag: String,
    },
    /// The installed content was reused without a remote check.
    ReusedOffline,
    /// A release was downloaded and installed during this run.
    Installed {
        /// The installed release tag.
        tag: String,
        /// Number of files extracted.
        files: usize,
    },
}

/// Result of the best-effort overlay step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayStatus {
    /// No plugin search root was supplied.
    NotRequested {
        /// A manifest from an earlier run was deleted.
        removed_stale_manifest: bool,
    },
    /// Bundles were copied and the manifest written.
    Applied(Manifest),
    /// The overlay failed; the base content is still usable.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

/// Successful result of a synchronization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// How the base content was obtained.
    pub content: ContentStatus,
    /// What happened to the plugin overlay.
    pub overlay: OverlayStatus,
    /// Every state entered, in order, ending with [`SyncState::Ready`].
    pub transitions: Vec<SyncState>,
}

/// Synchronize using the HTTP locator, HTTP fetcher and zip installer.
///
/// # Errors
///
/// See [`synchronize_with`].
pub fn synchronize(
    config: &SyncConfig<'_>,
    release: &ReleaseConfig,
    progress: Box<dyn DownloadProgress>,
    stderr: &mut dyn Write,
) -> Result<SyncOutcome, SyncError> {
    let locator = HttpReleaseLocator::from_config(release);
    let fetcher = HttpFetcher::from_config(release, progress);
    let services = SyncServices {
        locator: &locator,
        fetcher: &fetcher,
        installer: &ZipInstaller,
    };
    synchronize_with(config, &services, stderr)
}

/// Bring the content root up to date, then apply the overlay.
///
/// The production entry point [`synchronize`] delegates here with real
/// implementations; tests inject mocks.
///
/// # Errors
///
/// Returns [`SyncError`] naming the failed stage when the version check,
/// download or installation fails. Overlay failures are reported through
/// [`OverlayStatus::Failed`] instead.
pub fn synchronize_with(
    config: &SyncConfig<'_>,
    services: &SyncServices<'_>,
    stderr: &mut dyn Write,
) -> Result<SyncOutcome, SyncError> {
    let mut run = Run::new(config, stderr);
    let content = run.acquire_content(services)?;
    let overlay = run.finish_overlay();
    run.enter(SyncState::Ready);
    Ok(SyncOutcome {
        content,
        overlay,
        transitions: run.transitions,
    })
}

/// State shared by the steps of one run.
struct Run<'a, 'w> {
    config: &'a SyncConfig<'a>,
    stderr: &'w mut dyn Write,
    transitions: Vec<SyncState>,
}

impl<'a, 'w> Run<'a, 'w> {
    fn new(config: &'a SyncConfig<'a>, stderr: &'w mut dyn Write) -> Self {
        Self {
            config,
            stderr,
            transitions: Vec::new(),
        }
    }

    fn enter(&mut self, state: SyncState) {
        match self.transitions.last() {
            Some(previous) => log::debug!("sync state: {previous} -> {state}"),
            None => log::debug!("sync state: {state}"),
        }
        self.transitions.push(state);
    }

    fn fail(&mut self, stage: SyncState, source: impl Into<SyncFailure>) -> SyncError {
        self.enter(SyncState::Failed);
        SyncError::new(stage, source)
    }

    fn say(&mut self, message: impl fmt::Display) {
        if !self.config.quiet {
            write_stderr_line(self.stderr, message);
        }
    }

    fn acquire_content(
        &mut self,
        services: &SyncServices<'_>,
    ) -> Result<ContentStatus, SyncError> {
        let layout = self.config.layout;
        if self.config.skip_remote_check {
            if layout.is_installed() {
                self.say("Reusing installed content without checking for updates.");
                return Ok(ContentStatus::ReusedOffline);
            }
            log::warn!(
                "skip-check requested but {} is missing; checking for a release",
                layout.install_marker()
            );
        }

        if !layout.content_root().exists() {
            self.enter(SyncState::Absent);
        }
        self.enter(SyncState::CheckingVersion);
        self.say("Checking for the latest release...");
        let asset = services
            .locator
            .fetch_latest()
            .map_err(|error| self.fail(SyncState::CheckingVersion, error))?;

        let store = VersionStore::new(layout.version_file());
        let cached = store.read_cached_version();
        log::debug!(
            "latest release {}, cached {}",
            asset.tag,
            cached.as_deref().unwrap_or("<none>")
        );
        if cached.as_deref() == Some(asset.tag.as_str()) && layout.is_installed() {
            self.enter(SyncState::UpToDate);
            self.say(format!("Release {} is already installed.", asset.tag));
            return Ok(ContentStatus::UpToDate { tag: asset.tag });
        }

        self.install_release(services, &store, asset)
    }

    fn install_release(
        &mut self,
        services: &SyncServices<'_>,
        store: &VersionStore,
        asset: ReleaseAsset,
    ) -> Result<ContentStatus, SyncError> {
        let layout = self.config.layout;
        self.enter(SyncState::Downloading);
        self.say(format!("Downloading {} ({})...", asset.asset_name, asset.tag));
        store
            .write_cached_version(&asset.tag)
            .map_err(|error| self.fail(SyncState::Downloading, error))?;
        let archive = services
            .fetcher
            .download(&asset.download_url, layout.staging_dir())
            .map_err(|error| self.fail(SyncState::Downloading, error))?;

        self.enter(SyncState::Installing);
        let content_root = layout.content_root();
        let report = services
            .installer
            .install(archive, &content_root)
            .map_err(|error| self.fail(SyncState::Installing, error))?;
        self.say(installed_message(&asset.tag, report.file_count(), &content_root));
        Ok(ContentStatus::Installed {
            tag: asset.tag,
            files: report.file_count(),
        })
    }

    fn finish_overlay(&mut self) -> OverlayStatus {
        let layout = self.config.layout;
        let Some(search_root) = self.config.mods_path else {
            if !layout.content_root().exists() {
                return OverlayStatus::NotRequested {
                    removed_stale_manifest: false,
                };
            }
            return match remove_stale_manifest(layout) {
                Ok(removed) => OverlayStatus::NotRequested {
                    removed_stale_manifest: removed,
                },
                Err(error) => self.overlay_failed(&error),
            };
        };

        self.enter(SyncState::Overlaying);
        match apply_overlay(search_root, layout) {
            Ok(manifest) => {
                self.say(overlay_message(manifest.len()));
                OverlayStatus::Applied(manifest)
            }
            Err(error) => self.overlay_failed(&error),
        }
    }

    fn overlay_failed(&mut self, error: &dyn std::error::Error) -> OverlayStatus {
        let reason = error.to_string();
        log::warn!("plugin overlay failed: {reason}");
        self.say(format!("Warning: plugin overlay failed: {reason}"));
        OverlayStatus::Failed { reason }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
