//! Git object id newtype.
//!
//! Accepts lowercase hexadecimal strings of 7 to 40 characters, covering
//! abbreviated and full commit ids as they appear in release metadata and in
//! repository page URLs.

use crate::error::{Result, ValueError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length of an abbreviated git SHA (7 hex characters).
const MIN_LEN: usize = 7;

/// Maximum length of a full git SHA-1 (40 hex characters).
const MAX_LEN: usize = 40;

/// A validated abbreviated or full git commit SHA.
///
/// # Examples
///
/// ```
/// use repo_trust::git_sha::GitSha;
///
/// let sha: GitSha = "abc1234".try_into().unwrap();
/// assert_eq!(sha.as_str(), "abc1234");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GitSha(String);

impl GitSha {
    /// Return the SHA as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` and `other` name the same object, allowing either side
    /// to be abbreviated.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_trust::git_sha::GitSha;
    ///
    /// let short = GitSha::try_from("abc1234").unwrap();
    /// let full = GitSha::try_from("abc1234def5678abc1234def5678abc1234def56").unwrap();
    /// assert!(short.matches(&full));
    /// ```
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0.starts_with(&other.0) || other.0.starts_with(&self.0)
    }
}

impl TryFrom<&str> for GitSha {
    type Error = ValueError;

    fn try_from(value: &str) -> Result<Self> {
        validate_git_sha(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for GitSha {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self> {
        validate_git_sha(&value)?;
        Ok(Self(value))
    }
}

impl From<GitSha> for String {
    fn from(value: GitSha) -> Self {
        value.0
    }
}

impl AsRef<str> for GitSha {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn validate_git_sha(value: &str) -> Result<()> {
    let reject = |reason: String| ValueError::InvalidGitSha {
        value: value.to_owned(),
        reason,
    };
    if value.is_empty() {
        return Err(reject("SHA must not be empty".to_owned()));
    }
    if !(MIN_LEN..=MAX_LEN).contains(&value.len()) {
        return Err(reject(format!(
            "expected {MIN_LEN} to {MAX_LEN} characters, got {}",
            value.len()
        )));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !c.is_ascii_digit() && !('a'..='f').contains(c))
    {
        return Err(reject(format!("non-lowercase-hex character '{bad}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::abbreviated("abc1234")]
    #[case::full("0123456789abcdef0123456789abcdef01234567")]
    fn accepts_valid_shas(#[case] value: &str) {
        assert!(GitSha::try_from(value).is_ok());
    }

    #[rstest]
    #[case::empty("")]
    #[case::too_short("abc12")]
    #[case::too_long("0123456789abcdef0123456789abcdef012345678")]
    #[case::uppercase("ABC1234")]
    #[case::branch_name("main-branch")]
    fn rejects_invalid_shas(#[case] value: &str) {
        assert!(matches!(
            GitSha::try_from(value),
            Err(ValueError::InvalidGitSha { .. })
        ));
    }

    #[test]
    fn abbreviation_matching_is_symmetric() {
        let short = GitSha::try_from("deadbee").expect("short");
        let full = GitSha::try_from("deadbeef00000000000000000000000000000000").expect("full");
        let other = GitSha::try_from("cafebabe").expect("other");
        assert!(short.matches(&full));
        assert!(full.matches(&short));
        assert!(!other.matches(&full));
    }
}
