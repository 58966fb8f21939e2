//! The provenance classification rules.
//!
//! Rules are applied in order:
//!
//! 1. no referrer: indeterminate;
//! 2. referrer off the expected repository: a warning when it is still on the
//!    hosting service, indeterminate otherwise;
//! 3. referrer naming an object in the expected repository: verified when the
//!    object is in the default branch's history, a warning when it is not,
//!    indeterminate when the comparison cannot be made;
//! 4. any other page of the expected repository: verified.

use super::decision::{ComparisonStatus, DecisionDetail, TrustDecision};
use super::referrer::{ExpectedRepository, ReferrerClass, classify_referrer};
use crate::git_sha::GitSha;
use crate::identity::RepositoryIdentity;
use crate::transfer::TransferError;
use log::{debug, warn};
use url::Url;

/// Answers ancestry questions about a repository.
#[cfg_attr(test, mockall::automock)]
pub trait AncestryOracle {
    /// Name of the repository's default branch.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] when the repository cannot be queried.
    fn default_branch(&self, repository: &RepositoryIdentity) -> Result<String, TransferError>;

    /// Compare `base` with `head` in `repository`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::NotFound`] when either side is unknown to the
    /// repository, or another [`TransferError`] when the query fails.
    fn compare(
        &self,
        repository: &RepositoryIdentity,
        base: &str,
        head: &str,
    ) -> Result<ComparisonStatus, TransferError>;
}

/// Classifies visitors against one expected repository.
pub struct SquattingDetector<'a> {
    expected: &'a ExpectedRepository,
    oracle: &'a dyn AncestryOracle,
}

impl<'a> SquattingDetector<'a> {
    /// Create a detector for `expected` that asks `oracle` about ancestry.
    #[must_use]
    pub fn new(expected: &'a ExpectedRepository, oracle: &'a dyn AncestryOracle) -> Self {
        Self { expected, oracle }
    }

    /// Classify a visitor who sent `referrer`.
    #[must_use]
    pub fn evaluate(&self, referrer: Option<&str>) -> TrustDecision {
        let class = classify_referrer(referrer, self.expected);
        debug!("referrer classified as {class:?}");
        let canonical = self.expected.canonical_url();
        match class {
            ReferrerClass::Absent => TrustDecision::indeterminate(
                "Cannot verify provenance: no referrer was sent. Privacy settings or direct \
                 navigation can hide where you came from.",
                DecisionDetail::default(),
            ),
            ReferrerClass::External { value } => TrustDecision::indeterminate(
                "You arrived from an external site. Verify the repository manually.",
                DecisionDetail {
                    referrer_host: Url::parse(&value)
                        .ok()
                        .and_then(|url| url.host_str().map(str::to_owned)),
                    ..DecisionDetail::default()
                },
            ),
            ReferrerClass::OtherRepository { url } => TrustDecision::warning(
                format!(
                    "You arrived from a different repository than expected. The official \
                     repository is {}.",
                    self.expected.identity()
                ),
                host_detail(&url),
                canonical,
            ),
            ReferrerClass::ExpectedPages { url } => TrustDecision::verified(
                "You arrived from the official project site.",
                host_detail(&url),
                canonical,
            ),
            ReferrerClass::ExpectedRepository {
                url,
                reference: None,
            } => {
                let target = url.to_string();
                TrustDecision::verified(
                    "You arrived from the official repository.",
                    host_detail(&url),
                    target,
                )
            }
            ReferrerClass::ExpectedRepository {
                url,
                reference: Some(reference),
            } => self.check_reference(&url, &reference, canonical),
        }
    }

    fn check_reference(&self, url: &Url, reference: &GitSha, canonical: String) -> TrustDecision {
        let mut detail = host_detail(url);
        detail.reference = Some(reference.as_str().to_owned());
        let repository = self.expected.identity();

        let branch = match self.oracle.default_branch(repository) {
            Ok(branch) => branch,
            Err(err) => {
                warn!("could not look up the default branch of {repository}: {err}");
                return TrustDecision::indeterminate(
                    "Could not look up the repository to check the referenced commit.",
                    detail,
                );
            }
        };
        detail.branch = Some(branch.clone());

        match self.oracle.compare(repository, reference.as_str(), &branch) {
            Ok(status) => {
                detail.comparison = Some(status);
                if status.is_official_history() {
                    TrustDecision::verified(
                        format!(
                            "Commit {reference} is part of the official history of {branch}."
                        ),
                        detail,
                        url.to_string(),
                    )
                } else {
                    TrustDecision::warning(
                        format!(
                            "Commit {reference} has diverged from the official history of \
                             {branch}. This can indicate fork-based impersonation."
                        ),
                        detail,
                        canonical,
                    )
                }
            }
            Err(TransferError::NotFound { .. }) => TrustDecision::warning(
                format!(
                    "Commit {reference} is not part of the official history. This is a strong \
                     indicator of fork-based impersonation."
                ),
                detail,
                canonical,
            ),
            Err(err) => {
                warn!("ancestry comparison for {reference} failed: {err}");
                TrustDecision::indeterminate(
                    "Could not compare the referenced commit with the official history.",
                    detail,
                )
            }
        }
    }
}

fn host_detail(url: &Url) -> DecisionDetail {
    DecisionDetail {
        referrer_host: url.host_str().map(str::to_owned),
        ..DecisionDetail::default()
    }
}
