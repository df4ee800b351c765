//! Crash-safe file replacement.

use camino::Utf8Path;
use std::io::{self, Write};

/// Replace `path` with `contents` via a temporary sibling and a rename.
///
/// Readers observe either the previous file or the complete new one. The
/// parent directory is created when missing.
pub(crate) fn write_atomically(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(())
}
