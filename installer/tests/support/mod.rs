//! Test support utilities for installer integration tests.
//!
//! Provides a temporary base directory with a UTF-8 path, release
//! configuration tuned for loopback servers, and the canned HTTP server in
//! [`http_server`].

pub mod http_server;

use camino::Utf8PathBuf;
use sitesync::{LayoutConfig, ReleaseConfig};
use sitesync_installer::layout::SiteLayout;
use tempfile::TempDir;

/// A temporary base directory and the layout rooted inside it.
pub struct TempSite {
    /// Keeps the directory alive for the duration of the test.
    pub temp: TempDir,
    /// Paths of the content root and markers under `temp`.
    pub layout: SiteLayout,
}

impl TempSite {
    /// Create an empty base directory with the default layout.
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp path");
        let layout = SiteLayout::new(base, LayoutConfig::default());
        Self { temp, layout }
    }

    /// Names of the entries directly under the base directory, sorted.
    pub fn base_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.temp.path())
            .expect("read base dir")
            .map(|entry| {
                entry
                    .expect("dir entry")
                    .file_name()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }
}

/// Release configuration pointing at `index_url` with short timeouts.
pub fn release_config(index_url: String) -> ReleaseConfig {
    ReleaseConfig {
        url: index_url,
        timeout_secs: 5,
        user_agent: "sitesync-tests/1.0".to_owned(),
        ..ReleaseConfig::default()
    }
}
