//! Shared test utilities for the installer crate.
//!
//! Builders for in-memory zip archives, downloaded-archive guards and
//! release index documents. Gated behind the `test-support` feature.

use crate::content::fetch::DownloadedArchive;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Files of a minimal but complete site release, including the default
/// installation marker.
pub const SITE_FILES: &[(&str, &[u8])] = &[
    ("index.html", b"<!doctype html><title>site</title>"),
    ("style.css", b"body { margin: 0; }"),
    ("img/logo.png", b"\x89PNG fake"),
];

/// Build a zip archive in memory.
///
/// Entry names ending in `/` become directory entries; every other name is
/// written verbatim, so traversal names such as `../evil` can be produced.
///
/// # Panics
///
/// Panics if the in-memory writer fails.
#[must_use]
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, options)
                .expect("add directory entry");
        } else {
            writer.start_file(*name, options).expect("start zip entry");
            writer.write_all(contents).expect("write zip entry");
        }
    }
    writer.finish().expect("finish zip archive").into_inner()
}

/// Write `bytes` to a temporary file in `dir` and wrap it as a download.
///
/// # Panics
///
/// Panics if the temporary file cannot be written.
#[must_use]
pub fn downloaded_archive(dir: &Path, bytes: &[u8]) -> DownloadedArchive {
    let mut file = tempfile::Builder::new()
        .prefix(".sitesync-download-")
        .suffix(".part")
        .tempfile_in(dir)
        .expect("create temp archive");
    file.write_all(bytes).expect("write temp archive");
    let size = u64::try_from(bytes.len()).expect("archive size fits in u64");
    DownloadedArchive::from_temp_file(file, size)
}

/// Render a release index document with `tag` and `(name, url)` assets.
#[must_use]
pub fn release_index_json(tag: &str, assets: &[(&str, &str)]) -> String {
    let assets: Vec<_> = assets
        .iter()
        .map(|(name, url)| serde_json::json!({ "name": name, "browser_download_url": url }))
        .collect();
    serde_json::json!({ "tag_name": tag, "assets": assets }).to_string()
}
