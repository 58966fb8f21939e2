//! Manifest schema types.
//!
//! A manifest binds a repository identity and a release to the digest, size,
//! and download location of every artifact attached to that release:
//!
//! ```json
//! {
//!   "schema_version": "1.0",
//!   "repository": {
//!     "owner": "acme",
//!     "name": "rocket",
//!     "full_name": "acme/rocket",
//!     "git_url": "https://github.com/acme/rocket.git"
//!   },
//!   "release": {
//!     "tag": "v1.2.0",
//!     "commit": "4f0c2d1",
//!     "published_at": "2026-02-03T00:00:00Z",
//!     "release_id": 42
//!   },
//!   "artifacts": [
//!     {
//!       "filename": "rocket.tar.gz",
//!       "sha256": "...",
//!       "size_bytes": 1024,
//!       "download_url": "https://github.com/acme/rocket/releases/download/v1.2.0/rocket.tar.gz"
//!     }
//!   ],
//!   "generated_at": "2026-02-03T00:01:00Z",
//!   "generator": { "name": "repo-trust", "version": "1.0.0" }
//! }
//! ```
//!
//! Field order in the structs below is the serialized order. Signatures are
//! computed over [`Manifest::to_canonical_json`] output, so that order and
//! the two-space indentation are part of the format.

use super::naming::is_reserved;
use super::schema_version::SchemaVersion;
use crate::digest::Sha256Digest;
use crate::error::ValueError;
use crate::identity::RepositoryIdentity;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Name recorded in the `generator` block.
pub const GENERATOR_NAME: &str = "repo-trust";

/// Errors arising from manifest construction or structural validation.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The document is not valid JSON or a field has the wrong type.
    #[error("manifest is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is valid JSON but not an object.
    #[error("manifest must be a JSON object")]
    NotAnObject,

    /// Required fields are absent.
    #[error("manifest is missing required fields: {}", fields.join(", "))]
    MissingFields {
        /// Dotted paths of the absent fields.
        fields: Vec<String>,
    },

    /// `repository.full_name` does not equal `owner/name`.
    #[error("repository.full_name \"{full_name}\" does not match \"{owner}/{name}\"")]
    InconsistentRepository {
        /// The recorded owner.
        owner: String,
        /// The recorded name.
        name: String,
        /// The recorded full name.
        full_name: String,
    },

    /// Two artifacts share a filename.
    #[error("duplicate artifact filename \"{filename}\"")]
    DuplicateArtifact {
        /// The repeated filename.
        filename: String,
    },

    /// An artifact uses a name reserved for the manifest or its signature.
    #[error("artifact \"{filename}\" uses a reserved manifest name")]
    ReservedArtifact {
        /// The offending filename.
        filename: String,
    },

    /// A field value failed validation.
    #[error(transparent)]
    InvalidValue(#[from] ValueError),
}

/// Repository identity as recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Owning account or organization.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Clone URL, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,
}

impl RepositoryRecord {
    /// Record `identity`, optionally with its clone URL.
    #[must_use]
    pub fn new(identity: &RepositoryIdentity, git_url: Option<String>) -> Self {
        Self {
            owner: identity.owner().to_owned(),
            name: identity.name().to_owned(),
            full_name: identity.full_name(),
            git_url,
        }
    }
}

/// Release metadata recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Release tag name.
    pub tag: String,
    /// Commit id (or commit-ish) the release was cut from.
    pub commit: String,
    /// Publication time; absent for unpublished drafts.
    pub published_at: Option<Timestamp>,
    /// Registry identifier of the release.
    pub release_id: u64,
}

/// One hashed release asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseArtifact {
    /// Asset filename, unique within a manifest.
    pub filename: String,
    /// SHA-256 of the asset bytes.
    pub sha256: Sha256Digest,
    /// Size of the asset in bytes.
    pub size_bytes: u64,
    /// Where the asset can be downloaded from.
    pub download_url: String,
}

/// The tool that wrote a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorRecord {
    /// Tool name.
    pub name: String,
    /// Tool version.
    pub version: String,
}

impl GeneratorRecord {
    /// Describe this build of the library.
    #[must_use]
    pub fn current() -> Self {
        Self {
            name: GENERATOR_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// A signed statement about the artifacts of one release.
///
/// # Examples
///
/// ```
/// use repo_trust::identity::RepositoryIdentity;
/// use repo_trust::manifest::schema::{Manifest, ReleaseRecord};
/// use repo_trust::timestamp::Timestamp;
///
/// let repo = RepositoryIdentity::parse("acme/rocket").unwrap();
/// let release = ReleaseRecord {
///     tag: "v1.0.0".to_owned(),
///     commit: "4f0c2d1".to_owned(),
///     published_at: None,
///     release_id: 7,
/// };
/// let manifest = Manifest::new(
///     &repo,
///     None,
///     release,
///     Vec::new(),
///     Timestamp::from_epoch_secs(0),
/// )
/// .unwrap();
/// let json = manifest.to_canonical_json().unwrap();
/// assert!(json.starts_with("{\n  \"schema_version\": \"1.0\""));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(alias = "repo_trust_version")]
    schema_version: SchemaVersion,
    repository: RepositoryRecord,
    release: ReleaseRecord,
    artifacts: Vec<ReleaseArtifact>,
    generated_at: Timestamp,
    generator: GeneratorRecord,
}

impl Manifest {
    /// Assemble a current-version manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DuplicateArtifact`] or
    /// [`ManifestError::ReservedArtifact`] if `artifacts` breaks the
    /// filename rules.
    pub fn new(
        repository: &RepositoryIdentity,
        git_url: Option<String>,
        release: ReleaseRecord,
        artifacts: Vec<ReleaseArtifact>,
        generated_at: Timestamp,
    ) -> Result<Self, ManifestError> {
        let manifest = Self {
            schema_version: SchemaVersion::current(),
            repository: RepositoryRecord::new(repository, git_url),
            release,
            artifacts,
            generated_at,
            generator: GeneratorRecord::current(),
        };
        manifest.check_invariants()?;
        Ok(manifest)
    }

    /// Check the invariants every manifest must satisfy, whether built
    /// locally or parsed from elsewhere.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), ManifestError> {
        let repo = &self.repository;
        if repo.full_name != format!("{}/{}", repo.owner, repo.name) {
            return Err(ManifestError::InconsistentRepository {
                owner: repo.owner.clone(),
                name: repo.name.clone(),
                full_name: repo.full_name.clone(),
            });
        }
        let mut seen = HashSet::new();
        for artifact in &self.artifacts {
            if is_reserved(&artifact.filename) {
                return Err(ManifestError::ReservedArtifact {
                    filename: artifact.filename.clone(),
                });
            }
            if !seen.insert(artifact.filename.as_str()) {
                return Err(ManifestError::DuplicateArtifact {
                    filename: artifact.filename.clone(),
                });
            }
        }
        Ok(())
    }

    /// Serialize to the exact bytes that are signed and verified: two-space
    /// indented JSON in field declaration order with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] if serialization fails.
    pub fn to_canonical_json(&self) -> Result<String, ManifestError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Return the schema version.
    #[must_use]
    pub fn schema_version(&self) -> &SchemaVersion {
        &self.schema_version
    }

    /// Return the repository record.
    #[must_use]
    pub fn repository(&self) -> &RepositoryRecord {
        &self.repository
    }

    /// Return the release record.
    #[must_use]
    pub fn release(&self) -> &ReleaseRecord {
        &self.release
    }

    /// Return the artifacts in manifest order.
    #[must_use]
    pub fn artifacts(&self) -> &[ReleaseArtifact] {
        &self.artifacts
    }

    /// Return the generation time.
    #[must_use]
    pub fn generated_at(&self) -> &Timestamp {
        &self.generated_at
    }

    /// Return the generator record.
    #[must_use]
    pub fn generator(&self) -> &GeneratorRecord {
        &self.generator
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
