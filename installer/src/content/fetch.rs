//! Streamed asset download into a scoped temporary file.
//!
//! The response body is copied block by block into a temporary file next
//! to the content root. The file is owned by a [`DownloadedArchive`] guard,
//! so every early return (transport error, short body, write failure)
//! deletes it and the content root is never touched.

use camino::{Utf8Path, Utf8PathBuf};
use sitesync::ReleaseConfig;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};
use ureq::http::HeaderMap;
use ureq::http::header::{CONTENT_ENCODING, CONTENT_LENGTH};

use super::progress::DownloadProgress;
use crate::http::{HttpClient, OCTET_STREAM, describe_ureq_error};

/// Bytes copied per read; progress is reported at this granularity.
const BLOCK_SIZE: usize = 8 * 1024;

/// Trait for downloading release assets, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ContentFetcher {
    /// Download `url` into a temporary file inside `staging_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] on transport failures,
    /// [`FetchError::IncompleteDownload`] when the body is shorter or longer
    /// than declared, and [`FetchError::Io`] when the file cannot be written.
    fn download(&self, url: &str, staging_dir: &Utf8Path) -> Result<DownloadedArchive, FetchError>;
}

/// Errors arising from asset downloads.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request or body transfer failed.
    #[error("download failed for {url}: {reason}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// Bytes received differ from the declared content length.
    #[error("incomplete download from {url}: expected {expected} bytes, received {actual}")]
    IncompleteDownload {
        /// The URL that was requested.
        url: String,
        /// Declared content length.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// The temporary file could not be created or written.
    #[error("I/O error writing download to {path}: {source}")]
    Io {
        /// File or directory involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A fully downloaded archive awaiting installation.
///
/// Dropping the value deletes the file.
#[derive(Debug)]
pub struct DownloadedArchive {
    path: TempPath,
    size: u64,
}

impl DownloadedArchive {
    /// Take ownership of a completed temporary file.
    #[must_use]
    pub fn from_temp_file(file: NamedTempFile, size: u64) -> Self {
        Self {
            path: file.into_temp_path(),
            size,
        }
    }

    /// Location of the archive on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes downloaded.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Delete the archive now, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while deleting the file.
    pub fn remove(self) -> std::io::Result<()> {
        self.path.close()
    }
}

/// HTTP-based fetcher using `ureq`.
pub struct HttpFetcher {
    client: HttpClient,
    progress: Box<dyn DownloadProgress>,
}

impl HttpFetcher {
    /// Create a fetcher reporting to `progress`.
    #[must_use]
    pub fn new(client: HttpClient, progress: Box<dyn DownloadProgress>) -> Self {
        Self { client, progress }
    }

    /// Create a fetcher from release configuration.
    #[must_use]
    pub fn from_config(config: &ReleaseConfig, progress: Box<dyn DownloadProgress>) -> Self {
        Self::new(HttpClient::for_downloads(config), progress)
    }
}

impl ContentFetcher for HttpFetcher {
    fn download(&self, url: &str, staging_dir: &Utf8Path) -> Result<DownloadedArchive, FetchError> {
        log::debug!("downloading {url}");
        let response = self
            .client
            .get(url, OCTET_STREAM)
            .map_err(|e| FetchError::Network {
                url: url.to_owned(),
                reason: describe_ureq_error(&e),
            })?;
        let expected = declared_length(response.headers());
        let mut reader = response.into_body().into_reader();
        write_body(url, &mut reader, expected, staging_dir, self.progress.as_ref())
    }
}

/// Return the content length the server committed to, if it is usable.
///
/// Encoded bodies are decoded transparently, so their declared length does
/// not describe the bytes written and is ignored.
#[must_use]
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    if headers.contains_key(CONTENT_ENCODING) {
        return None;
    }
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Stream `reader` into a new temporary file in `staging_dir`.
///
/// `url` is used for error messages only.
///
/// # Errors
///
/// See [`ContentFetcher::download`]. No file remains on error.
pub fn write_body(
    url: &str,
    reader: &mut dyn Read,
    expected: Option<u64>,
    staging_dir: &Utf8Path,
    progress: &dyn DownloadProgress,
) -> Result<DownloadedArchive, FetchError> {
    let io_error = |source| FetchError::Io {
        path: staging_dir.to_owned(),
        source,
    };
    std::fs::create_dir_all(staging_dir).map_err(io_error)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".sitesync-download-")
        .suffix(".part")
        .tempfile_in(staging_dir)
        .map_err(io_error)?;

    progress.started(expected);
    let copied = copy_blocks(url, reader, expected, temp.as_file_mut(), progress);
    progress.finished();
    let written = copied.map_err(|failure| failure.into_fetch_error(staging_dir))?;

    if let Some(expected_bytes) = expected
        && written != expected_bytes
    {
        return Err(FetchError::IncompleteDownload {
            url: url.to_owned(),
            expected: expected_bytes,
            actual: written,
        });
    }

    temp.as_file().sync_all().map_err(io_error)?;
    log::debug!("downloaded {written} bytes from {url}");
    Ok(DownloadedArchive::from_temp_file(temp, written))
}

/// Failure inside the copy loop, before the destination path is attached.
enum CopyFailure {
    Fetch(FetchError),
    Write(std::io::Error),
}

impl CopyFailure {
    fn into_fetch_error(self, staging_dir: &Utf8Path) -> FetchError {
        match self {
            Self::Fetch(error) => error,
            Self::Write(source) => FetchError::Io {
                path: staging_dir.to_owned(),
                source,
            },
        }
    }
}

fn copy_blocks(
    url: &str,
    reader: &mut dyn Read,
    expected: Option<u64>,
    file: &mut std::fs::File,
    progress: &dyn DownloadProgress,
) -> Result<u64, CopyFailure> {
    let mut buffer = vec![0u8; BLOCK_SIZE];
    let mut written: u64 = 0;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => {
                return Err(CopyFailure::Fetch(classify_read_error(
                    url, &error, expected, written,
                )));
            }
        };
        let block = buffer.get(..read).unwrap_or_default();
        file.write_all(block).map_err(CopyFailure::Write)?;
        let block_len = u64::try_from(read).unwrap_or(u64::MAX);
        written = written.saturating_add(block_len);
        progress.advanced(block_len);
    }
    Ok(written)
}

/// A connection dropped before the declared length is a short body, not a
/// generic transport failure.
fn classify_read_error(
    url: &str,
    error: &std::io::Error,
    expected: Option<u64>,
    written: u64,
) -> FetchError {
    match expected {
        Some(expected_bytes)
            if error.kind() == ErrorKind::UnexpectedEof && written < expected_bytes =>
        {
            FetchError::IncompleteDownload {
                url: url.to_owned(),
                expected: expected_bytes,
                actual: written,
            }
        }
        _ => FetchError::Network {
            url: url.to_owned(),
            reason: error.to_string(),
        },
    }
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
