//! Latest-release lookup against a GitHub-style release index.
//!
//! A single GET returns `{tag_name, assets: [...]}`; the first asset passing
//! the [`AssetPattern`] becomes the [`ReleaseAsset`]. There are no retries:
//! any transport or status failure surfaces immediately.

use serde::Deserialize;
use sitesync::ReleaseConfig;

use super::asset::{AssetPattern, IndexAsset, ReleaseAsset};
use crate::http::{GITHUB_JSON, HttpClient, describe_ureq_error};

/// Trait for querying the latest release, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseLocator {
    /// Return the latest tag and its matching asset.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Network`] when the index cannot be fetched or
    /// parsed, and [`LocateError::AssetNotFound`] when no asset matches.
    fn fetch_latest(&self) -> Result<ReleaseAsset, LocateError>;
}

/// Errors arising from the release index query.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    /// Transport failure, non-success status, or unreadable response.
    #[error("release index query failed for {url}: {reason}")]
    Network {
        /// The index URL.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The release exists but carries no asset matching the pattern.
    #[error("release {tag} has no asset matching {pattern}")]
    AssetNotFound {
        /// Tag of the inspected release.
        tag: String,
        /// The naming pattern, rendered as `prefix*extension`.
        pattern: String,
    },
}

/// The subset of the release index response that is consumed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseIndex {
    /// Tag of the latest release.
    pub tag_name: String,
    /// Downloadable files attached to the release.
    #[serde(default)]
    pub assets: Vec<IndexAsset>,
}

/// Parse a release index JSON document.
///
/// # Errors
///
/// Returns the `serde_json` error when the document is malformed or lacks
/// `tag_name`.
///
/// # Examples
///
/// ```
/// use sitesync_installer::release::locator::parse_release_index;
///
/// let json = r#"{"tag_name":"v1.0","assets":[{"name":"DoL.zip","browser_download_url":"https://x/DoL.zip"}]}"#;
/// let index = parse_release_index(json).expect("valid index");
/// assert_eq!(index.tag_name, "v1.0");
/// assert_eq!(index.assets.len(), 1);
/// ```
pub fn parse_release_index(json: &str) -> Result<ReleaseIndex, serde_json::Error> {
    serde_json::from_str(json)
}

/// Pick the asset for `index` using `pattern`.
///
/// # Errors
///
/// Returns [`LocateError::AssetNotFound`] when no asset matches.
pub fn locate_asset(
    index: &ReleaseIndex,
    pattern: &AssetPattern,
) -> Result<ReleaseAsset, LocateError> {
    let asset = pattern
        .select(&index.assets)
        .ok_or_else(|| LocateError::AssetNotFound {
            tag: index.tag_name.clone(),
            pattern: pattern.to_string(),
        })?;
    Ok(ReleaseAsset {
        tag: index.tag_name.clone(),
        asset_name: asset.name.clone(),
        download_url: asset.browser_download_url.clone(),
        size: asset.size,
    })
}

/// HTTP-based locator using `ureq`.
#[derive(Debug, Clone)]
pub struct HttpReleaseLocator {
    client: HttpClient,
    url: String,
    pattern: AssetPattern,
}

impl HttpReleaseLocator {
    /// Create a locator for an explicit index URL.
    #[must_use]
    pub fn new(client: HttpClient, url: impl Into<String>, pattern: AssetPattern) -> Self {
        Self {
            client,
            url: url.into(),
            pattern,
        }
    }

    /// Create a locator from release configuration.
    #[must_use]
    pub fn from_config(config: &ReleaseConfig) -> Self {
        Self::new(
            HttpClient::for_queries(config),
            config.url.as_str(),
            AssetPattern::from_config(config),
        )
    }

    fn network_error(&self, reason: String) -> LocateError {
        LocateError::Network {
            url: self.url.clone(),
            reason,
        }
    }
}

impl ReleaseLocator for HttpReleaseLocator {
    fn fetch_latest(&self) -> Result<ReleaseAsset, LocateError> {
        log::debug!("querying release index {}", self.url);
        let response = self
            .client
            .get(&self.url, GITHUB_JSON)
            .map_err(|e| self.network_error(describe_ureq_error(&e)))?;
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| self.network_error(describe_ureq_error(&e)))?;
        let index = parse_release_index(&body)
            .map_err(|e| self.network_error(format!("malformed release index: {e}")))?;
        log::debug!(
            "latest release {} lists {} asset(s)",
            index.tag_name,
            index.assets.len()
        );
        locate_asset(&index, &self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn index(tag: &str, names: &[&str]) -> ReleaseIndex {
        ReleaseIndex {
            tag_name: tag.to_owned(),
            assets: names
                .iter()
                .map(|name| IndexAsset {
                    name: (*name).to_owned(),
                    browser_download_url: format!("https://example.test/{name}"),
                    size: Some(42),
                })
                .collect(),
        }
    }

    #[test]
    fn locate_asset_copies_tag_url_and_size() {
        let pattern = AssetPattern::new("DoL", ".zip");
        let asset = locate_asset(&index("v2.1", &["notes.txt", "DoL-2.1.zip"]), &pattern)
            .expect("asset located");

        assert_eq!(asset.tag, "v2.1");
        assert_eq!(asset.asset_name, "DoL-2.1.zip");
        assert_eq!(asset.download_url, "https://example.test/DoL-2.1.zip");
        assert_eq!(asset.size, Some(42));
    }

    #[test]
    fn locate_asset_reports_tag_and_pattern_when_missing() {
        let pattern = AssetPattern::new("DoL", ".zip");
        let err = locate_asset(&index("v2.1", &["Source.tar.gz"]), &pattern)
            .expect_err("no asset should match");

        let message = err.to_string();
        assert!(message.contains("v2.1"), "message: {message}");
        assert!(message.contains("DoL*.zip"), "message: {message}");
    }

    #[rstest]
    #[case::not_json("<html>rate limited</html>")]
    #[case::missing_tag(r#"{"assets":[]}"#)]
    #[case::wrong_asset_shape(r#"{"tag_name":"v1","assets":[{"name":1}]}"#)]
    fn parse_rejects_malformed_index(#[case] json: &str) {
        assert!(parse_release_index(json).is_err());
    }

    #[test]
    fn parse_tolerates_missing_assets_and_extra_fields() {
        let json = r#"{"tag_name":"v3","name":"Release 3","draft":false}"#;
        let parsed = parse_release_index(json).expect("valid index");
        assert_eq!(parsed.tag_name, "v3");
        assert!(parsed.assets.is_empty());
    }
}
