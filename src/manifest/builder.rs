//! Manifest building from a release's attached assets.
//!
//! Assets are processed one at a time: each is downloaded into a scratch
//! file, hashed, recorded, and the scratch file is removed before the next
//! download starts. Local disk use is therefore bounded by the largest
//! single asset.

use super::naming::is_reserved;
use super::schema::{Manifest, ManifestError, ReleaseArtifact, ReleaseRecord};
use crate::digest::digest_reader;
use crate::identity::RepositoryIdentity;
use crate::retry::RetryPolicy;
use crate::timestamp::Timestamp;
use crate::transfer::TransferError;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fmt;
use std::io::{self, Seek, SeekFrom, Write};
use tempfile::{NamedTempFile, TempDir};
use thiserror::Error;

/// The release a manifest is being built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    /// Repository the release belongs to.
    pub repository: RepositoryIdentity,
    /// Clone URL recorded in the manifest, when known.
    pub git_url: Option<String>,
    /// Release metadata recorded in the manifest.
    pub release: ReleaseRecord,
}

/// An asset attached to a release, as listed by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// Registry identifier of the asset.
    pub id: u64,
    /// Asset filename.
    pub name: String,
    /// Public download URL recorded in the manifest.
    pub download_url: String,
    /// Size reported by the registry, if any.
    pub size: Option<u64>,
}

/// Lists the assets attached to a release.
pub trait AssetLister {
    /// Return every asset attached to `release`, in registry order.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the listing cannot be fetched.
    fn list_assets(&self, release: &ReleaseDescriptor) -> Result<Vec<AssetDescriptor>, TransferError>;
}

/// Streams the bytes of one asset.
pub trait AssetDownloader {
    /// Write the full content of `asset` into `sink`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] if the download fails part-way.
    fn download_asset(&self, asset: &AssetDescriptor, sink: &mut dyn Write) -> Result<(), TransferError>;
}

/// Errors that abort manifest building.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The asset listing could not be fetched.
    #[error("failed to list release assets: {0}")]
    Listing(#[source] TransferError),

    /// An asset could not be downloaded or hashed.
    #[error("failed to hash asset \"{asset}\": {source}")]
    Asset {
        /// The asset being processed.
        asset: String,
        /// The underlying transfer failure.
        #[source]
        source: TransferError,
    },

    /// The registry listed two assets with the same name.
    #[error("release lists asset \"{filename}\" more than once")]
    DuplicateAsset {
        /// The repeated filename.
        filename: String,
    },

    /// The scratch directory could not be prepared.
    #[error("failed to prepare scratch space: {0}")]
    Scratch(#[source] io::Error),

    /// The assembled manifest was rejected.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl BuildError {
    /// The transfer failure behind this error, if any.
    #[must_use]
    pub fn transfer(&self) -> Option<&TransferError> {
        match self {
            Self::Listing(source) | Self::Asset { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A non-fatal observation made while building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// The release has no assets besides reserved ones.
    EmptyRelease {
        /// Release tag.
        tag: String,
    },
    /// A downloaded asset's size differs from what the registry reported.
    SizeMismatch {
        /// Asset filename.
        filename: String,
        /// Size reported by the registry.
        declared: u64,
        /// Size actually downloaded and hashed.
        actual: u64,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRelease { tag } => write!(
                f,
                "release {tag} has no assets; the manifest will list no artifacts"
            ),
            Self::SizeMismatch {
                filename,
                declared,
                actual,
            } => write!(
                f,
                "asset {filename} is {actual} bytes but the registry reported {declared}"
            ),
        }
    }
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The assembled manifest.
    pub manifest: Manifest,
    /// Number of artifacts recorded.
    pub artifact_count: usize,
    /// Non-fatal observations, already logged.
    pub warnings: Vec<BuildWarning>,
}

/// Inputs to [`build_manifest`].
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// The release to describe.
    pub release: ReleaseDescriptor,
    /// Timestamp recorded as `generated_at`.
    pub generated_at: Timestamp,
    /// Retry policy for each asset download.
    pub retry: RetryPolicy,
}

/// Build a manifest for `request.release`.
///
/// Reserved manifest and signature assets are skipped. A release with no
/// other assets yields an empty manifest and a
/// [`BuildWarning::EmptyRelease`].
///
/// # Errors
///
/// Returns a [`BuildError`] if listing, downloading, or hashing fails, or if
/// the registry reports duplicate asset names.
pub fn build_manifest(
    request: &BuildRequest,
    lister: &dyn AssetLister,
    downloader: &dyn AssetDownloader,
) -> Result<BuildOutput, BuildError> {
    let release = &request.release;
    let assets = request
        .retry
        .run("list release assets", || lister.list_assets(release))
        .map_err(BuildError::Listing)?;

    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut artifacts = Vec::new();
    let scratch = tempfile::tempdir().map_err(BuildError::Scratch)?;

    for asset in &assets {
        if is_reserved(&asset.name) {
            debug!("skipping reserved asset {}", asset.name);
            continue;
        }
        if !seen.insert(asset.name.clone()) {
            return Err(BuildError::DuplicateAsset {
                filename: asset.name.clone(),
            });
        }
        let artifact = hash_asset(request.retry, asset, &scratch, downloader)?;
        if let Some(declared) = asset.size.filter(|size| *size != artifact.size_bytes) {
            let warning = BuildWarning::SizeMismatch {
                filename: asset.name.clone(),
                declared,
                actual: artifact.size_bytes,
            };
            warn!("{warning}");
            warnings.push(warning);
        }
        info!("hashed {} ({} bytes)", artifact.filename, artifact.size_bytes);
        artifacts.push(artifact);
    }

    if artifacts.is_empty() {
        let warning = BuildWarning::EmptyRelease {
            tag: release.release.tag.clone(),
        };
        warn!("{warning}");
        warnings.push(warning);
    }

    let artifact_count = artifacts.len();
    let manifest = Manifest::new(
        &release.repository,
        release.git_url.clone(),
        release.release.clone(),
        artifacts,
        request.generated_at,
    )?;
    Ok(BuildOutput {
        manifest,
        artifact_count,
        warnings,
    })
}

/// Download one asset into a scratch file, hash it, and remove the file.
fn hash_asset(
    retry: RetryPolicy,
    asset: &AssetDescriptor,
    scratch: &TempDir,
    downloader: &dyn AssetDownloader,
) -> Result<ReleaseArtifact, BuildError> {
    let to_asset_error = |source: TransferError| BuildError::Asset {
        asset: asset.name.clone(),
        source,
    };
    let mut file = NamedTempFile::new_in(scratch.path()).map_err(BuildError::Scratch)?;

    retry
        .run(&format!("download {}", asset.name), || {
            let handle = file.as_file_mut();
            handle.set_len(0)?;
            handle.seek(SeekFrom::Start(0))?;
            downloader.download_asset(asset, handle)?;
            handle.flush()?;
            Ok(())
        })
        .map_err(to_asset_error)?;

    file.as_file_mut()
        .seek(SeekFrom::Start(0))
        .map_err(|err| to_asset_error(err.into()))?;
    let content = digest_reader(file.as_file_mut()).map_err(to_asset_error)?;
    file.close().map_err(|err| to_asset_error(err.into()))?;

    Ok(ReleaseArtifact {
        filename: asset.name.clone(),
        sha256: content.sha256,
        size_bytes: content.size_bytes,
        download_url: asset.download_url.clone(),
    })
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
