//! Asset naming predicate and the selected release asset.

use serde::Deserialize;
use sitesync::ReleaseConfig;
use std::fmt;

/// One entry of a release's `assets` array.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IndexAsset {
    /// File name of the asset.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
    /// Size in bytes, when the index reports it.
    #[serde(default)]
    pub size: Option<u64>,
}

/// The asset chosen for download from the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// Release tag; compared for equality only.
    pub tag: String,
    /// File name of the selected asset.
    pub asset_name: String,
    /// Direct download URL of the selected asset.
    pub download_url: String,
    /// Size in bytes reported by the index, if any.
    pub size: Option<u64>,
}

/// Accepts asset names with a fixed prefix and extension.
///
/// # Examples
///
/// ```
/// use sitesync_installer::release::asset::AssetPattern;
///
/// let pattern = AssetPattern::new("DoL", ".zip");
/// assert!(pattern.matches("DoL-ModLoader-2.3.0.zip"));
/// assert!(!pattern.matches("DoL-ModLoader-2.3.0.tar.gz"));
/// assert_eq!(pattern.to_string(), "DoL*.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPattern {
    prefix: String,
    extension: String,
}

impl AssetPattern {
    /// Create a pattern from a prefix and an extension.
    #[must_use]
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Build the pattern from release configuration.
    #[must_use]
    pub fn from_config(config: &ReleaseConfig) -> Self {
        Self::new(config.asset_prefix.as_str(), config.asset_extension.as_str())
    }

    /// Return true when `name` satisfies the pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && name.ends_with(&self.extension)
    }

    /// Return the first matching asset in list order.
    #[must_use]
    pub fn select<'a>(&self, assets: &'a [IndexAsset]) -> Option<&'a IndexAsset> {
        assets.iter().find(|asset| self.matches(&asset.name))
    }
}

impl fmt::Display for AssetPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.prefix, self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn asset(name: &str) -> IndexAsset {
        IndexAsset {
            name: name.to_owned(),
            browser_download_url: format!("https://example.test/{name}"),
            size: None,
        }
    }

    #[rstest]
    #[case::exact("DoL.zip", true)]
    #[case::versioned("DoL-2.0.0-ModLoader.zip", true)]
    #[case::wrong_prefix("dol-2.0.0.zip", false)]
    #[case::wrong_extension("DoL-2.0.0.zip.sha256", false)]
    #[case::source_archive("Source code.zip", false)]
    fn pattern_checks_prefix_and_extension(#[case] name: &str, #[case] expected: bool) {
        let pattern = AssetPattern::new("DoL", ".zip");
        assert_eq!(pattern.matches(name), expected);
    }

    #[test]
    fn first_match_wins_in_list_order() {
        let pattern = AssetPattern::new("DoL", ".zip");
        let assets = vec![
            asset("checksums.txt"),
            asset("DoL-b.zip"),
            asset("DoL-a.zip"),
        ];

        let selected = pattern.select(&assets).expect("a match");
        assert_eq!(selected.name, "DoL-b.zip");
    }

    #[test]
    fn select_returns_none_without_match() {
        let pattern = AssetPattern::new("DoL", ".zip");
        assert!(pattern.select(&[asset("readme.md")]).is_none());
        assert!(pattern.select(&[]).is_none());
    }
}
