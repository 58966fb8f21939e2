//! Response bodies read from the registry API.

use serde::Deserialize;

/// A release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseInfo {
    /// Numeric release id.
    pub id: u64,
    /// Tag the release points at.
    pub tag_name: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Publication time, absent for drafts.
    #[serde(default)]
    pub published_at: Option<String>,
    /// Browser URL of the release.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Templated upload URL (`.../assets{?name,label}`).
    pub upload_url: String,
    /// Attached assets.
    #[serde(default)]
    pub assets: Vec<AssetInfo>,
}

impl ReleaseInfo {
    /// The asset called `name`, if attached.
    #[must_use]
    pub fn asset_named(&self, name: &str) -> Option<&AssetInfo> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

/// An asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetInfo {
    /// Numeric asset id.
    pub id: u64,
    /// File name.
    pub name: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Public download URL.
    pub browser_download_url: String,
    /// Number of downloads so far.
    #[serde(default)]
    pub download_count: u64,
}

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryInfo {
    /// `owner/name`.
    pub full_name: String,
    /// Default branch name.
    pub default_branch: String,
}

/// Result of comparing two commits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComparisonInfo {
    /// `ahead`, `behind`, `identical` or `diverged`.
    pub status: String,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_payloads() {
        let body = r#"{
            "id": 42,
            "tag_name": "v1.0.0",
            "name": null,
            "published_at": "2026-02-15T12:00:00Z",
            "upload_url": "https://uploads.github.com/repos/o/r/releases/42/assets{?name,label}",
            "assets": [
                {"id": 1, "name": "a.tar.gz", "size": 3, "browser_download_url": "https://x/a", "state": "uploaded"}
            ]
        }"#;
        let release: ReleaseInfo = serde_json::from_str(body).expect("parse");
        assert_eq!(release.id, 42);
        assert!(release.name.is_none());
        assert_eq!(release.asset_named("a.tar.gz").map(|a| a.size), Some(3));
        assert!(release.asset_named("b").is_none());
    }
}
