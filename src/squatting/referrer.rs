//! Referrer inspection.

use crate::git_sha::GitSha;
use crate::identity::RepositoryIdentity;
use thiserror::Error;
use url::Url;

/// Path segments that introduce an object reference in a repository URL.
const REFERENCE_KINDS: &[&str] = &["tree", "blob", "commit", "commits"];

/// Problems with the inputs that describe the expected repository.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferrerError {
    /// The source host base URL could not be parsed or has no host.
    #[error("invalid source host URL {value}: {reason}")]
    InvalidSourceUrl {
        /// The configured value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// The repository a visitor is expected to come from, and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedRepository {
    identity: RepositoryIdentity,
    source_base: Url,
    source_host: String,
    pages_domain: String,
}

impl ExpectedRepository {
    /// Describe `identity` hosted at `source_base` (for example
    /// `https://github.com`) with static pages under `pages_domain` (for
    /// example `github.io`).
    ///
    /// # Errors
    ///
    /// Returns [`ReferrerError::InvalidSourceUrl`] if `source_base` is not an
    /// absolute URL with a host.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_trust::identity::RepositoryIdentity;
    /// use repo_trust::squatting::ExpectedRepository;
    ///
    /// let repo = RepositoryIdentity::parse("octo/widgets").unwrap();
    /// let expected = ExpectedRepository::new(repo, "https://github.com", "github.io").unwrap();
    /// assert_eq!(expected.pages_host(), "octo.github.io");
    /// assert_eq!(expected.canonical_url(), "https://github.com/octo/widgets");
    /// ```
    pub fn new(
        identity: RepositoryIdentity,
        source_base: &str,
        pages_domain: &str,
    ) -> Result<Self, ReferrerError> {
        let reject = |reason: &str| ReferrerError::InvalidSourceUrl {
            value: source_base.to_owned(),
            reason: reason.to_owned(),
        };
        let source_base = Url::parse(source_base).map_err(|err| reject(&err.to_string()))?;
        let source_host = source_base
            .host_str()
            .ok_or_else(|| reject("missing host"))?
            .to_ascii_lowercase();
        Ok(Self {
            identity,
            source_base,
            source_host,
            pages_domain: pages_domain.trim_matches('.').to_ascii_lowercase(),
        })
    }

    /// The repository identity.
    #[must_use]
    pub fn identity(&self) -> &RepositoryIdentity {
        &self.identity
    }

    /// Host name of the source-hosting service.
    #[must_use]
    pub fn source_host(&self) -> &str {
        &self.source_host
    }

    /// Host name of the repository owner's static pages site.
    #[must_use]
    pub fn pages_host(&self) -> String {
        format!(
            "{}.{}",
            self.identity.owner().to_ascii_lowercase(),
            self.pages_domain
        )
    }

    /// Browser URL of the repository on the source host.
    #[must_use]
    pub fn canonical_url(&self) -> String {
        format!(
            "{}/{}",
            self.source_base.as_str().trim_end_matches('/'),
            self.identity.full_name()
        )
    }

    fn is_generic_host(&self, host: &str) -> bool {
        host == self.source_host
            || host.ends_with(&format!(".{}", self.source_host))
            || host == self.pages_domain
            || host.ends_with(&format!(".{}", self.pages_domain))
    }
}

/// Where a referrer points, relative to the expected repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferrerClass {
    /// No referrer was sent.
    Absent,
    /// A page of the expected repository, optionally naming an object.
    ExpectedRepository {
        /// The referrer URL.
        url: Url,
        /// Commit, tree or blob id embedded in the path.
        reference: Option<GitSha>,
    },
    /// The expected repository's static pages site.
    ExpectedPages {
        /// The referrer URL.
        url: Url,
    },
    /// Another repository or pages site on the hosting service.
    OtherRepository {
        /// The referrer URL.
        url: Url,
    },
    /// Any other site, or a value that is not a URL.
    External {
        /// The referrer as received.
        value: String,
    },
}

/// Classify a `Referer` value against `expected`.
///
/// Host and repository names are compared without regard to ASCII case, as
/// the hosting service treats them.
///
/// # Examples
///
/// ```
/// use repo_trust::identity::RepositoryIdentity;
/// use repo_trust::squatting::{ExpectedRepository, ReferrerClass, classify_referrer};
///
/// let repo = RepositoryIdentity::parse("octo/widgets").unwrap();
/// let expected = ExpectedRepository::new(repo, "https://github.com", "github.io").unwrap();
/// assert_eq!(classify_referrer(None, &expected), ReferrerClass::Absent);
/// assert!(matches!(
///     classify_referrer(Some("https://github.com/octo/widgets/tree/abc1234"), &expected),
///     ReferrerClass::ExpectedRepository { reference: Some(_), .. }
/// ));
/// ```
#[must_use]
pub fn classify_referrer(referrer: Option<&str>, expected: &ExpectedRepository) -> ReferrerClass {
    let Some(value) = referrer.map(str::trim).filter(|value| !value.is_empty()) else {
        return ReferrerClass::Absent;
    };
    let external = || ReferrerClass::External {
        value: value.to_owned(),
    };
    let Ok(url) = Url::parse(value) else {
        return external();
    };
    let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
        return external();
    };

    if host == expected.source_host {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        if is_expected_repository(&segments, expected.identity()) {
            let reference = reference_from(&segments);
            return ReferrerClass::ExpectedRepository { url, reference };
        }
        return ReferrerClass::OtherRepository { url };
    }
    if host == expected.pages_host() {
        return ReferrerClass::ExpectedPages { url };
    }
    if expected.is_generic_host(&host) {
        return ReferrerClass::OtherRepository { url };
    }
    external()
}

fn is_expected_repository(segments: &[&str], identity: &RepositoryIdentity) -> bool {
    match segments {
        [owner, name, ..] => {
            owner.eq_ignore_ascii_case(identity.owner())
                && name
                    .trim_end_matches(".git")
                    .eq_ignore_ascii_case(identity.name())
        }
        _ => false,
    }
}

fn reference_from(segments: &[&str]) -> Option<GitSha> {
    match segments {
        [_, _, kind, candidate, ..] if REFERENCE_KINDS.contains(kind) => {
            GitSha::try_from(candidate.to_ascii_lowercase().as_str()).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn expected() -> ExpectedRepository {
        let identity = RepositoryIdentity::parse("octo/widgets").expect("identity");
        ExpectedRepository::new(identity, "https://github.com/", "github.io").expect("expected")
    }

    #[rstest]
    #[case::missing(None)]
    #[case::empty(Some(""))]
    #[case::blank(Some("   "))]
    fn absent_referrers(expected: ExpectedRepository, #[case] referrer: Option<&str>) {
        assert_eq!(classify_referrer(referrer, &expected), ReferrerClass::Absent);
    }

    #[rstest]
    #[case::tree("https://github.com/octo/widgets/tree/0123abcd", Some("0123abcd"))]
    #[case::blob("https://github.com/octo/widgets/blob/ABCDEF0/README.md", Some("abcdef0"))]
    #[case::commit("https://github.com/octo/widgets/commit/0123abcd", Some("0123abcd"))]
    #[case::branch("https://github.com/octo/widgets/tree/main", None)]
    #[case::root("https://github.com/octo/widgets", None)]
    #[case::case_folded("https://GitHub.com/Octo/Widgets/releases", None)]
    fn same_repository(
        expected: ExpectedRepository,
        #[case] referrer: &str,
        #[case] reference: Option<&str>,
    ) {
        match classify_referrer(Some(referrer), &expected) {
            ReferrerClass::ExpectedRepository { reference: found, .. } => {
                assert_eq!(found.as_ref().map(GitSha::as_str), reference);
            }
            other => panic!("unexpected class {other:?}"),
        }
    }

    #[rstest]
    #[case::fork("https://github.com/squatter/widgets/tree/0123abcd")]
    #[case::owner_only("https://github.com/octo")]
    #[case::other_pages("https://squatter.github.io/widgets/")]
    fn other_repositories(expected: ExpectedRepository, #[case] referrer: &str) {
        assert!(matches!(
            classify_referrer(Some(referrer), &expected),
            ReferrerClass::OtherRepository { .. }
        ));
    }

    #[rstest]
    fn own_pages_site(expected: ExpectedRepository) {
        assert!(matches!(
            classify_referrer(Some("https://octo.github.io/widgets/repo-trust/"), &expected),
            ReferrerClass::ExpectedPages { .. }
        ));
    }

    #[rstest]
    #[case::elsewhere("https://example.com/octo/widgets")]
    #[case::lookalike("https://github.com.evil.test/octo/widgets")]
    #[case::not_a_url("octo/widgets")]
    fn external_referrers(expected: ExpectedRepository, #[case] referrer: &str) {
        assert!(matches!(
            classify_referrer(Some(referrer), &expected),
            ReferrerClass::External { .. }
        ));
    }

    #[test]
    fn rejects_source_urls_without_hosts() {
        let identity = RepositoryIdentity::parse("octo/widgets").expect("identity");
        let err = ExpectedRepository::new(identity, "not a url", "github.io").expect_err("bad url");
        assert!(matches!(err, ReferrerError::InvalidSourceUrl { .. }));
    }
}
