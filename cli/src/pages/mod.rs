//! The published verification page: rendering and git publishing.

pub mod git;
pub mod render;

pub use git::{GitPublisher, PublishOutcome, PublishTarget};
pub use render::{BadgeStatus, ReleaseData};

use repo_trust::identity::RepositoryIdentity;

/// The three files written under the reserved pages subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagesFiles {
    /// Badge SVG.
    pub badge: String,
    /// Verification page HTML.
    pub index: String,
    /// Release data as pretty-printed JSON.
    pub release_data: String,
}

impl PagesFiles {
    /// Render every file for `repository`.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the release data cannot be encoded.
    pub fn render(
        status: BadgeStatus,
        repository: &RepositoryIdentity,
        release: &ReleaseData,
    ) -> serde_json::Result<Self> {
        let mut release_data = serde_json::to_string_pretty(release)?;
        release_data.push('\n');
        Ok(Self {
            badge: render::render_badge(status, repository),
            index: render::render_index(status, repository, release),
            release_data,
        })
    }
}

/// Public URL of the published badge.
///
/// # Examples
///
/// ```
/// use repo_trust::identity::RepositoryIdentity;
/// use repo_trust_cli::pages::badge_url;
///
/// let repo = RepositoryIdentity::parse("Octo/widgets").unwrap();
/// assert_eq!(
///     badge_url(&repo, "github.io"),
///     "https://octo.github.io/widgets/repo-trust/distribution.svg"
/// );
/// ```
#[must_use]
pub fn badge_url(repository: &RepositoryIdentity, pages_domain: &str) -> String {
    format!(
        "https://{}.{pages_domain}/{}/{}/{}",
        repository.owner().to_ascii_lowercase(),
        repository.name(),
        git::PAGES_DIR,
        git::BADGE_FILE
    )
}
