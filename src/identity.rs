//! Repository identity (`owner/name`).
//!
//! The identity is what a manifest is bound to. Verification compares the
//! identity embedded in a manifest with the identity of the repository the
//! check runs against, so both sides are parsed through this type.

use crate::error::{Result, ValueError};
use std::fmt;

/// A validated `owner/name` repository identity.
///
/// # Examples
///
/// ```
/// use repo_trust::identity::RepositoryIdentity;
///
/// let repo = RepositoryIdentity::parse("octo-org/widget.rs").unwrap();
/// assert_eq!(repo.owner(), "octo-org");
/// assert_eq!(repo.name(), "widget.rs");
/// assert_eq!(repo.full_name(), "octo-org/widget.rs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryIdentity {
    owner: String,
    name: String,
}

impl RepositoryIdentity {
    /// Parse an `owner/name` string.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidRepository`] if the value does not
    /// contain exactly one `/`, or either half is empty or contains
    /// characters outside `[A-Za-z0-9._-]`.
    pub fn parse(value: &str) -> Result<Self> {
        let reject = |reason: &str| ValueError::InvalidRepository {
            value: value.to_owned(),
            reason: reason.to_owned(),
        };
        let (owner, name) = value
            .split_once('/')
            .ok_or_else(|| reject("expected owner/name"))?;
        if name.contains('/') {
            return Err(reject("expected exactly one '/'"));
        }
        validate_segment(owner).map_err(|reason| reject(&format!("owner {reason}")))?;
        validate_segment(name).map_err(|reason| reject(&format!("name {reason}")))?;
        if matches!(name, "." | "..") {
            return Err(reject("name must not be a relative path component"));
        }
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Build an identity from its two halves.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidRepository`] under the same rules as
    /// [`RepositoryIdentity::parse`].
    pub fn new(owner: &str, name: &str) -> Result<Self> {
        Self::parse(&format!("{owner}/{name}"))
    }

    /// The account or organization that owns the repository.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `owner/name` form.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl TryFrom<&str> for RepositoryIdentity {
    type Error = ValueError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn validate_segment(segment: &str) -> std::result::Result<(), &'static str> {
    if segment.is_empty() {
        return Err("must not be empty");
    }
    if segment
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err("contains characters outside [A-Za-z0-9._-]");
    }
    Ok(())
}
