//! On-disk layout of a synchronised site.
//!
//! All paths derive from a base directory and the [`LayoutConfig`]:
//!
//! ```text
//! {base}/VERSION                  cached release tag
//! {base}/site/                    content root
//! {base}/site/style.css           installation marker
//! {base}/site/mods/               plugin bundle copies
//! {base}/site/modlist.json        plugin manifest
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use sitesync::LayoutConfig;

/// Resolved paths for one content root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    base_dir: Utf8PathBuf,
    config: LayoutConfig,
}

impl SiteLayout {
    /// Create a layout rooted at `base_dir`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use sitesync::LayoutConfig;
    /// use sitesync_installer::layout::SiteLayout;
    ///
    /// let layout = SiteLayout::new(Utf8PathBuf::from("/srv"), LayoutConfig::default());
    /// assert_eq!(layout.content_root(), "/srv/site");
    /// assert_eq!(layout.version_file(), "/srv/VERSION");
    /// ```
    #[must_use]
    pub fn new(base_dir: Utf8PathBuf, config: LayoutConfig) -> Self {
        Self { base_dir, config }
    }

    /// Directory that holds the content root and the version marker.
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// The directory served to clients.
    #[must_use]
    pub fn content_root(&self) -> Utf8PathBuf {
        self.base_dir.join(&self.config.content_dir)
    }

    /// Plain-text file holding the cached release tag.
    #[must_use]
    pub fn version_file(&self) -> Utf8PathBuf {
        self.base_dir.join(&self.config.version_file)
    }

    /// Sentinel file proving that a previous extraction completed.
    #[must_use]
    pub fn install_marker(&self) -> Utf8PathBuf {
        self.content_root().join(&self.config.install_marker)
    }

    /// Directory receiving copies of plugin bundles.
    #[must_use]
    pub fn overlay_dir(&self) -> Utf8PathBuf {
        self.content_root().join(&self.config.overlay_dir)
    }

    /// Name of the overlay directory relative to the content root.
    #[must_use]
    pub fn overlay_dir_name(&self) -> &str {
        &self.config.overlay_dir
    }

    /// JSON manifest listing the overlaid plugin bundles.
    #[must_use]
    pub fn manifest_file(&self) -> Utf8PathBuf {
        self.content_root().join(&self.config.manifest_file)
    }

    /// File name suffix identifying plugin bundles.
    #[must_use]
    pub fn plugin_suffix(&self) -> &str {
        &self.config.plugin_suffix
    }

    /// Directory for temporary downloads and extraction staging.
    ///
    /// Staging happens next to the content root so the final move is a
    /// same-filesystem rename.
    #[must_use]
    pub fn staging_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// Return true when the installation marker exists.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.install_marker().is_file()
    }
}
