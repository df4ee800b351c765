//! Zip extraction into the content root with all-or-nothing replacement.
//!
//! Every entry name is checked before a single byte is written. Extraction
//! then happens in a staging directory beside the content root, and the
//! finished tree is swapped in with two renames. On any failure the content
//! root is left exactly as it was.

use camino::Utf8Path;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

use super::fetch::DownloadedArchive;

/// Trait for installing downloaded archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ContentInstaller {
    /// Replace `dest_root` with the contents of `archive`.
    ///
    /// The archive is consumed; its temporary file is removed whether or
    /// not installation succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::UnsafeEntry`] if any entry would land outside
    /// `dest_root`, [`InstallError::EmptyArchive`] if it holds no files, and
    /// [`InstallError::Archive`] or [`InstallError::Io`] on read or write
    /// failures. `dest_root` is unchanged on every error.
    fn install(
        &self,
        archive: DownloadedArchive,
        dest_root: &Utf8Path,
    ) -> Result<InstallReport, InstallError>;
}

/// Errors arising from archive installation.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// An entry name is absolute or climbs out of the destination.
    #[error("unsafe archive entry rejected: {path}")]
    UnsafeEntry {
        /// The entry name as stored in the archive.
        path: String,
    },

    /// The archive contains directories only, or nothing at all.
    #[error("archive contains no files")]
    EmptyArchive,

    /// The archive could not be read as a zip file.
    #[error("invalid archive: {0}")]
    Archive(#[from] ZipError),

    /// Filesystem failure while staging or swapping.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Outcome of a successful installation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Root-relative paths of the files written, `/`-separated, in archive
    /// order.
    pub files: Vec<String>,
}

impl InstallReport {
    /// Number of files written.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Default installer backed by the `zip` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipInstaller;

impl ContentInstaller for ZipInstaller {
    fn install(
        &self,
        archive: DownloadedArchive,
        dest_root: &Utf8Path,
    ) -> Result<InstallReport, InstallError> {
        let file = File::open(archive.path()).map_err(InstallError::io(archive.path()))?;
        let mut zip = ZipArchive::new(file)?;
        let entries = validate_entries(&mut zip)?;

        let parent = staging_parent(dest_root);
        fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
        let staging = tempfile::Builder::new()
            .prefix(".sitesync-staging-")
            .tempdir_in(parent)
            .map_err(InstallError::io(parent))?;
        let staged_root = staging.path().join("content");

        let files = extract_entries(&mut zip, &entries, &staged_root)?;
        swap_into_place(&staged_root, dest_root.as_std_path(), parent.as_std_path())?;
        drop(zip);
        log::debug!("installed {} file(s) into {dest_root}", files.len());

        let archive_path = archive.path().to_path_buf();
        if let Err(error) = archive.remove() {
            log::warn!(
                "could not remove downloaded archive {}: {error}",
                archive_path.display()
            );
        }
        Ok(InstallReport { files })
    }
}

/// One archive entry that passed validation.
struct CheckedEntry {
    index: usize,
    relative: PathBuf,
    is_dir: bool,
}

fn validate_entries(zip: &mut ZipArchive<File>) -> Result<Vec<CheckedEntry>, InstallError> {
    let mut entries = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip.by_index(index)?;
        let relative = validate_entry_path(entry.name(), entry.enclosed_name())?;
        entries.push(CheckedEntry {
            index,
            relative,
            is_dir: entry.is_dir(),
        });
    }
    if entries.iter().all(|entry| entry.is_dir) {
        return Err(InstallError::EmptyArchive);
    }
    Ok(entries)
}

/// Validate that a zip entry name stays inside the destination.
///
/// `enclosed` is the zip crate's own sanitised view of the name; when it
/// cannot produce one the entry is rejected as well.
fn validate_entry_path(name: &str, enclosed: Option<PathBuf>) -> Result<PathBuf, InstallError> {
    let unsafe_entry = || InstallError::UnsafeEntry {
        path: name.to_owned(),
    };
    let raw = Path::new(name);
    if raw.is_absolute() || name.starts_with('/') || name.starts_with('\\') {
        return Err(unsafe_entry());
    }
    let escapes = raw.components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || name.split(['/', '\\']).any(|part| part == "..") {
        return Err(unsafe_entry());
    }
    enclosed.ok_or_else(unsafe_entry)
}

fn staging_parent(dest_root: &Utf8Path) -> &Utf8Path {
    match dest_root.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}

fn extract_entries(
    zip: &mut ZipArchive<File>,
    entries: &[CheckedEntry],
    staged_root: &Path,
) -> Result<Vec<String>, InstallError> {
    fs::create_dir_all(staged_root).map_err(InstallError::io(staged_root))?;
    let mut files = Vec::new();
    for checked in entries {
        let target = staged_root.join(&checked.relative);
        if checked.is_dir {
            fs::create_dir_all(&target).map_err(InstallError::io(&target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
        }
        let mut entry = zip.by_index(checked.index)?;
        let mut out = File::create(&target).map_err(InstallError::io(&target))?;
        io::copy(&mut entry, &mut out).map_err(InstallError::io(&target))?;
        apply_mode(&target, entry.unix_mode())?;
        files.push(relative_name(&checked.relative));
    }
    Ok(files)
}

#[cfg(unix)]
fn apply_mode(target: &Path, mode: Option<u32>) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(bits) = mode.map(|mode| mode & 0o777).filter(|bits| *bits != 0) {
        fs::set_permissions(target, fs::Permissions::from_mode(bits))
            .map_err(InstallError::io(target))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_target: &Path, _mode: Option<u32>) -> Result<(), InstallError> {
    Ok(())
}

fn relative_name(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Move `staged` to `dest`, setting any existing `dest` aside first.
///
/// The previous tree is restored if the final rename fails, and deleted
/// once the new tree is in place.
fn swap_into_place(staged: &Path, dest: &Path, parent: &Path) -> Result<(), InstallError> {
    let backup = tempfile::Builder::new()
        .prefix(".sitesync-previous-")
        .tempdir_in(parent)
        .map_err(InstallError::io(parent))?;
    let previous = backup.path().join("previous");

    let had_previous = dest.exists();
    if had_previous {
        fs::rename(dest, &previous).map_err(InstallError::io(dest))?;
    }
    if let Err(source) = fs::rename(staged, dest) {
        if had_previous && let Err(restore) = fs::rename(&previous, dest) {
            log::error!(
                "could not restore previous content to {}: {restore}",
                dest.display()
            );
        }
        return Err(InstallError::Io {
            path: dest.to_path_buf(),
            source,
        });
    }
    if let Err(error) = backup.close() {
        log::warn!("could not delete previous content: {error}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
