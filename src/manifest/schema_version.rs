//! Manifest schema version.
//!
//! Versions are dotted numeric strings. Readers accept any well-formed
//! version so that newer manifests stay verifiable, but only versions in
//! [`RECOGNIZED`] are known to carry the fields this build understands.

use crate::error::{Result, ValueError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The version written by this build.
pub const CURRENT: &str = "1.0";

/// Versions whose layout this build fully understands.
pub const RECOGNIZED: &[&str] = &[CURRENT];

/// A well-formed manifest schema version.
///
/// # Examples
///
/// ```
/// use repo_trust::manifest::schema_version::SchemaVersion;
///
/// assert!(SchemaVersion::current().is_recognized());
/// let future = SchemaVersion::try_from("2.1").unwrap();
/// assert!(!future.is_recognized());
/// assert!(SchemaVersion::try_from("v1").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion(String);

impl SchemaVersion {
    /// The version this build writes.
    #[must_use]
    pub fn current() -> Self {
        Self(CURRENT.to_owned())
    }

    /// Whether this build knows the layout of this version.
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        RECOGNIZED.contains(&self.0.as_str())
    }

    /// Return the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for SchemaVersion {
    type Error = ValueError;

    fn try_from(value: &str) -> Result<Self> {
        Self::try_from(value.to_owned())
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self> {
        let well_formed = !value.is_empty()
            && value
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if well_formed {
            Ok(Self(value))
        } else {
            Err(ValueError::InvalidSchemaVersion { value })
        }
    }
}

impl From<SchemaVersion> for String {
    fn from(value: SchemaVersion) -> Self {
        value.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
