//! Badge, page and release-data rendering.
//!
//! Everything here is pure string building so the published files can be
//! asserted on directly.

use crate::registry::models::{AssetInfo, ReleaseInfo};
use repo_trust::identity::RepositoryIdentity;
use repo_trust::manifest::naming::{MANIFEST_FILENAME, SIGNATURE_SUFFIX, is_protocol_asset};
use serde::Serialize;
use std::fmt;

const BADGE_LABEL: &str = "Repo Trust";
const LABEL_COLOUR: &str = "#555";
const CHAR_WIDTH: usize = 7;
const TEXT_PADDING: usize = 10;

/// Which badge variant to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BadgeStatus {
    /// The release was signed and verified.
    #[default]
    Verified,
    /// No valid signature is available.
    Unverified,
    /// The pipeline could not determine a result.
    Error,
}

impl BadgeStatus {
    /// Text shown on the right side of the badge.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::Unverified => "UNVERIFIED",
            Self::Error => "ERROR",
        }
    }

    /// Fill colour of the status side.
    #[must_use]
    pub fn colour(self) -> &'static str {
        match self {
            Self::Verified => "#2ea44f",
            Self::Unverified => "#d73a49",
            Self::Error => "#6e7681",
        }
    }
}

impl fmt::Display for BadgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn text_width(text: &str) -> usize {
    text.chars().count() * CHAR_WIDTH + TEXT_PADDING
}

/// Escape text for inclusion in XML or HTML.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Render the shields-style badge for `repository`.
///
/// The repository full name is embedded in the title and metadata so a copy
/// republished elsewhere still names the repository it was issued for.
#[must_use]
pub fn render_badge(status: BadgeStatus, repository: &RepositoryIdentity) -> String {
    let label_width = text_width(BADGE_LABEL);
    let status_width = text_width(status.label());
    let total = label_width + status_width;
    let label_x = label_width * 5;
    let status_x = label_width * 10 + status_width * 5;
    let repo = escape(&repository.full_name());
    let title = format!("{BADGE_LABEL}: {} ({repo})", status.label());
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{total}" height="20" role="img" aria-label="{title}" data-repository="{repo}">
  <title>{title}</title>
  <linearGradient id="s" x2="0" y2="100%">
    <stop offset="0" stop-color="#bbb" stop-opacity=".1"/>
    <stop offset="1" stop-opacity=".1"/>
  </linearGradient>
  <clipPath id="r"><rect width="{total}" height="20" rx="3" fill="#fff"/></clipPath>
  <g clip-path="url(#r)">
    <rect width="{label_width}" height="20" fill="{label_colour}"/>
    <rect x="{label_width}" width="{status_width}" height="20" fill="{status_colour}"/>
    <rect width="{total}" height="20" fill="url(#s)"/>
  </g>
  <g fill="#fff" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" text-rendering="geometricPrecision" font-size="110">
    <text x="{label_x}" y="140" transform="scale(.1)">{label}</text>
    <text x="{status_x}" y="140" transform="scale(.1)">{status_text}</text>
  </g>
</svg>
"##,
        label_colour = LABEL_COLOUR,
        status_colour = status.colour(),
        label = BADGE_LABEL,
        status_text = status.label(),
    )
}

/// Human-readable size with one decimal above a kilobyte.
///
/// # Examples
///
/// ```
/// use repo_trust_cli::pages::render::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
/// ```
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut divisor: u64 = 1024;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if bytes < divisor * 1024 {
            break;
        }
        divisor *= 1024;
        unit = next;
    }
    // Tenths, rounded half up.
    let tenths = (u128::from(bytes) * 10 + u128::from(divisor) / 2) / u128::from(divisor);
    format!("{}.{} {unit}", tenths / 10, tenths % 10)
}

/// One downloadable asset on the published page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetEntry {
    /// Asset filename.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Size formatted for display.
    pub size_display: String,
    /// Public download URL.
    pub download_url: String,
    /// Download count reported by the registry.
    pub download_count: u64,
}

impl From<&AssetInfo> for AssetEntry {
    fn from(asset: &AssetInfo) -> Self {
        Self {
            name: asset.name.clone(),
            size: asset.size,
            size_display: format_size(asset.size),
            download_url: asset.browser_download_url.clone(),
            download_count: asset.download_count,
        }
    }
}

/// Release data shown on the page and written as `release-data.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseData {
    /// Release tag.
    pub tag: Option<String>,
    /// Release title, falling back to the tag.
    pub name: Option<String>,
    /// Publication time as reported by the registry.
    pub published_at: Option<String>,
    /// Release page URL.
    pub html_url: Option<String>,
    /// Downloadable assets, excluding the protocol's own files.
    pub assets: Vec<AssetEntry>,
}

impl ReleaseData {
    /// Project a registry release onto the page model.
    #[must_use]
    pub fn from_release(release: &ReleaseInfo) -> Self {
        Self {
            tag: Some(release.tag_name.clone()),
            name: Some(
                release
                    .name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| release.tag_name.clone()),
            ),
            published_at: release.published_at.clone(),
            html_url: release.html_url.clone(),
            assets: release
                .assets
                .iter()
                .filter(|asset| !is_protocol_asset(&asset.name))
                .map(AssetEntry::from)
                .collect(),
        }
    }
}

/// Render the verification page.
#[must_use]
pub fn render_index(
    status: BadgeStatus,
    repository: &RepositoryIdentity,
    release: &ReleaseData,
) -> String {
    let repo = escape(&repository.full_name());
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"utf-8\">\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("  <title>Repo Trust: {repo}</title>\n"));
    html.push_str(&format!(
        "  <meta name=\"repo-trust-repository\" content=\"{repo}\">\n"
    ));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("  <h1>{repo}</h1>\n"));
    html.push_str(&format!(
        "  <div class=\"status\" style=\"border-left: 4px solid {}; padding: 0.5em 1em;\">\n",
        status.colour()
    ));
    html.push_str("    <img src=\"distribution.svg\" alt=\"Repo Trust badge\">\n");
    html.push_str(&format!("    <p>Status: <strong>{}</strong></p>\n", status.label()));
    html.push_str("  </div>\n");
    push_release(&mut html, release);
    html.push_str("  <h2>What does this mean?</h2>\n  <ul>\n");
    html.push_str(&format!(
        "    <li><strong>VERIFIED</strong>: the release files of {repo} are listed in a signed manifest whose signature checks out against the project's trusted keys.</li>\n"
    ));
    html.push_str(
        "    <li><strong>UNVERIFIED</strong>: no valid signature is available. Do not trust downloads from this page until the maintainers publish one.</li>\n",
    );
    html.push_str("  </ul>\n");
    html.push_str("  <h2>How to verify</h2>\n");
    html.push_str(&format!(
        "  <p>Download <code>{MANIFEST_FILENAME}</code> and <code>{MANIFEST_FILENAME}{SIGNATURE_SUFFIX}</code> from the release, then run <code>repo-trust verify</code> with the project's allowed signers file. Compare each file's SHA-256 digest with the manifest entry before use.</p>\n"
    ));
    html.push_str("</body>\n</html>\n");
    html
}

fn push_release(html: &mut String, release: &ReleaseData) {
    let Some(tag) = &release.tag else {
        html.push_str("  <p>No release has been published yet.</p>\n");
        return;
    };
    let title = release.name.as_deref().unwrap_or(tag);
    html.push_str(&format!("  <h2>Release {}</h2>\n", escape(title)));
    if let Some(published) = &release.published_at {
        html.push_str(&format!("  <p>Published {}</p>\n", escape(published)));
    }
    if release.assets.is_empty() {
        html.push_str("  <p>This release has no downloadable files.</p>\n");
        return;
    }
    html.push_str("  <ul class=\"downloads\">\n");
    for asset in &release.assets {
        html.push_str(&format!(
            "    <li><a href=\"{}\">{}</a> ({})</li>\n",
            escape(&asset.download_url),
            escape(&asset.name),
            asset.size_display
        ));
    }
    html.push_str("  </ul>\n");
}
