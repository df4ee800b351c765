//! Plugin bundle overlay and manifest generation.
//!
//! Bundles are discovered recursively under a user-supplied search root,
//! copied flat into the content root's overlay directory, and listed in a
//! JSON manifest the served site reads at start-up. The manifest is
//! rewritten in full on every run that supplies a search root.

use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;

use crate::atomic_write::write_atomically;
use crate::layout::SiteLayout;

/// Errors arising while applying the overlay.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// The search root is missing or is not a directory.
    #[error("plugin search root {path} does not exist or is not a directory")]
    SearchRoot {
        /// The configured search root.
        path: Utf8PathBuf,
    },

    /// The discovery pattern could not be compiled.
    #[error("invalid plugin search pattern {pattern}: {source}")]
    Pattern {
        /// The rendered glob pattern.
        pattern: String,
        /// Underlying glob error.
        #[source]
        source: glob::PatternError,
    },

    /// A directory could not be read during discovery.
    #[error("failed to search for plugin bundles: {0}")]
    Walk(#[from] glob::GlobError),

    /// A bundle could not be copied into the overlay directory.
    #[error("failed to copy plugin bundle {from} to {to}: {source}")]
    Copy {
        /// Source bundle.
        from: Utf8PathBuf,
        /// Destination inside the overlay directory.
        to: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The overlay directory or manifest could not be written or removed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Root-relative paths of the overlaid bundles, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<String>,
}

impl Manifest {
    /// Create a manifest from root-relative entries.
    #[must_use]
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// The manifest entries.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true when no bundle was overlaid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the manifest as a JSON array indented by four spaces.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use sitesync_installer::overlay::Manifest;
    ///
    /// let manifest = Manifest::new(vec!["mods/a.mod.zip".to_owned()]);
    /// let json = manifest.to_pretty_json().expect("serializable");
    /// assert_eq!(json, "[\n    \"mods/a.mod.zip\"\n]");
    /// ```
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Copy every bundle under `search_root` into the overlay directory and
/// write the manifest.
///
/// Two bundles sharing a basename land on the same file; the later one in
/// discovery order wins and both appear in the manifest.
///
/// # Errors
///
/// Returns [`OverlayError::SearchRoot`] when `search_root` is not a
/// directory, and the remaining variants on discovery, copy or write
/// failures.
pub fn apply_overlay(
    search_root: &Utf8Path,
    layout: &SiteLayout,
) -> Result<Manifest, OverlayError> {
    let bundles = discover_bundles(search_root, layout.plugin_suffix())?;
    let overlay_dir = layout.overlay_dir();
    fs::create_dir_all(&overlay_dir).map_err(|source| OverlayError::Io {
        path: overlay_dir.clone(),
        source,
    })?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(bundles.len());
    for bundle in &bundles {
        let Some(name) = bundle.file_name() else {
            continue;
        };
        if !seen.insert(name.to_owned()) {
            log::warn!(
                "plugin bundle {name} found more than once; {bundle} replaces the earlier copy"
            );
        }
        let target = overlay_dir.join(name);
        copy_bundle(bundle, &target)?;
        entries.push(format!("{}/{name}", layout.overlay_dir_name()));
    }

    let manifest = Manifest::new(entries);
    write_manifest(&manifest, &layout.manifest_file())?;
    log::debug!("overlay manifest lists {} bundle(s)", manifest.len());
    Ok(manifest)
}

/// Find regular files under `search_root` whose names end with `suffix`.
///
/// Results follow the order `glob` yields them in: directory by directory,
/// alphabetically within each.
///
/// # Errors
///
/// See [`apply_overlay`].
pub fn discover_bundles(
    search_root: &Utf8Path,
    suffix: &str,
) -> Result<Vec<Utf8PathBuf>, OverlayError> {
    if !search_root.is_dir() {
        return Err(OverlayError::SearchRoot {
            path: search_root.to_owned(),
        });
    }
    let pattern = format!(
        "{}/**/*{}",
        Pattern::escape(search_root.as_str()),
        Pattern::escape(suffix)
    );
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    let paths = glob::glob_with(&pattern, options).map_err(|source| OverlayError::Pattern {
        pattern: pattern.clone(),
        source,
    })?;

    let mut bundles = Vec::new();
    for entry in paths {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        match Utf8PathBuf::try_from(path) {
            Ok(utf8) => bundles.push(utf8),
            Err(error) => log::warn!(
                "skipping plugin bundle with non-UTF-8 path {}",
                error.as_path().display()
            ),
        }
    }
    Ok(bundles)
}

/// Delete the manifest left by an earlier run, if any.
///
/// Returns `true` when a file was removed.
///
/// # Errors
///
/// Returns [`OverlayError::Io`] when the manifest exists but cannot be
/// removed.
pub fn remove_stale_manifest(layout: &SiteLayout) -> Result<bool, OverlayError> {
    let path = layout.manifest_file();
    match fs::remove_file(&path) {
        Ok(()) => {
            log::debug!("removed stale manifest {path}");
            Ok(true)
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(OverlayError::Io { path, source }),
    }
}

fn copy_bundle(source: &Utf8Path, target: &Utf8Path) -> Result<(), OverlayError> {
    if is_same_file(source, target) {
        log::debug!("plugin bundle {source} is already in the overlay directory");
        return Ok(());
    }
    fs::copy(source, target)
        .map(|_| ())
        .map_err(|error| OverlayError::Copy {
            from: source.to_owned(),
            to: target.to_owned(),
            source: error,
        })
}

/// A search root may contain the overlay directory itself; copying a file
/// onto itself would truncate it.
fn is_same_file(a: &Utf8Path, b: &Utf8Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

fn write_manifest(manifest: &Manifest, path: &Utf8Path) -> Result<(), OverlayError> {
    let json = manifest
        .to_pretty_json()
        .map_err(|error| OverlayError::Io {
            path: path.to_owned(),
            source: io::Error::other(error),
        })?;
    write_atomically(path, json.as_bytes()).map_err(|source| OverlayError::Io {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
#[path = "overlay_tests.rs"]
mod tests;
