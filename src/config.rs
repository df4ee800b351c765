//! Site configuration loader backed by `sitesync.toml`.
//!
//! Every key is optional. Omitted tables and fields fall back to the defaults
//! below, which track the upstream `DoLModLoaderBuild` release layout, so an
//! empty or absent file yields a working configuration.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

/// File name looked up in the base directory when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "sitesync.toml";

/// Errors raised while reading or parsing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Path of the unreadable file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`SiteConfig`].
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// Path of the malformed file.
        path: Utf8PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration for a synchronised site.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Where releases are looked up and how assets are selected.
    pub release: ReleaseConfig,
    /// Names of the directories and marker files on disk.
    pub layout: LayoutConfig,
    /// Local HTTP server settings.
    pub server: ServerConfig,
}

impl SiteConfig {
    /// Loads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid configuration TOML.
    pub fn load_from(path: &Utf8Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(path, &source)
    }

    /// Loads configuration from `path`, returning defaults when the file does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Propagates read and parse failures for files that do exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use sitesync::SiteConfig;
    ///
    /// let config = SiteConfig::load_or_default(Utf8Path::new("/nonexistent/sitesync.toml"))
    ///     .expect("missing files fall back to defaults");
    /// assert_eq!(config.server.port, 8080);
    /// ```
    pub fn load_or_default(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Parses configuration text; `path` is used for error messages only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when `source` is not valid
    /// configuration TOML.
    pub fn parse(path: &Utf8Path, source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|error| ConfigError::Parse {
            path: path.to_owned(),
            source: error,
        })
    }
}

/// Release index and asset selection settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// URL of the "latest release" query endpoint.
    pub url: String,
    /// Required prefix of the asset file name.
    pub asset_prefix: String,
    /// Required suffix of the asset file name.
    pub asset_extension: String,
    /// Timeout for the index query, in seconds. Downloads apply it to
    /// connecting and to receiving response headers, never to the body.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            url: "https://api.github.com/repos/Lyoko-Jeremie/DoLModLoaderBuild/releases/latest"
                .to_owned(),
            asset_prefix: "DoL".to_owned(),
            asset_extension: ".zip".to_owned(),
            timeout_secs: 30,
            user_agent: concat!("sitesync/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// On-disk naming of the synchronised content.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Directory holding the served site, relative to the base directory.
    pub content_dir: String,
    /// Version marker file, stored next to the content directory.
    pub version_file: String,
    /// File inside the content directory whose presence proves a complete
    /// installation.
    pub install_marker: String,
    /// Subdirectory of the content directory receiving plugin bundles.
    pub overlay_dir: String,
    /// Manifest file inside the content directory listing plugin bundles.
    pub manifest_file: String,
    /// File name suffix identifying plugin bundles.
    pub plugin_suffix: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            content_dir: "site".to_owned(),
            version_file: "VERSION".to_owned(),
            install_marker: "style.css".to_owned(),
            overlay_dir: "mods".to_owned(),
            manifest_file: "modlist.json".to_owned(),
            plugin_suffix: ".mod.zip".to_owned(),
        }
    }
}

/// Local HTTP server settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Port bound on `127.0.0.1` when no `--port` flag is given.
    pub port: u16,
}

impl ServerConfig {
    const fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: Self::default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_match_the_upstream_layout() {
        let config = SiteConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.release.asset_prefix, "DoL");
        assert_eq!(config.release.asset_extension, ".zip");
        assert_eq!(config.layout.content_dir, "site");
        assert_eq!(config.layout.install_marker, "style.css");
        assert_eq!(config.layout.manifest_file, "modlist.json");
        assert_eq!(config.layout.plugin_suffix, ".mod.zip");
    }

    #[rstest]
    fn partial_tables_keep_remaining_defaults() {
        let source = "[server]\nport = 9000\n\n[layout]\noverlay_dir = \"plugins\"\n";

        let config = SiteConfig::parse(Utf8Path::new("sitesync.toml"), source)
            .expect("expected configuration to parse successfully");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.layout.overlay_dir, "plugins");
        assert_eq!(config.layout.manifest_file, "modlist.json");
        assert_eq!(config.release, ReleaseConfig::default());
    }

    #[rstest]
    #[case::unknown_key("colour = \"blue\"\n")]
    #[case::unknown_nested_key("[server]\nhost = \"0.0.0.0\"\n")]
    #[case::wrong_type("[server]\nport = \"eighty\"\n")]
    fn rejects_invalid_configuration(#[case] source: &str) {
        let result = SiteConfig::parse(Utf8Path::new("bad.toml"), source);

        match result {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, "bad.toml"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
