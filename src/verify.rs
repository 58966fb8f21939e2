//! Fail-closed verification of a signed manifest.
//!
//! A manifest is accepted only when its detached signature verifies against a
//! trusted key in the protocol namespace, its structure is valid, and the
//! repository it names is the repository verification runs for. Each failure
//! maps to a distinct [`VerificationError`] variant; there is no partial
//! result.

use crate::identity::RepositoryIdentity;
use crate::manifest::parser::parse_manifest;
use crate::manifest::schema::{Manifest, ManifestError};
use crate::signing::{DetachedSignature, SignatureScheme, SignerMatch, SigningError, TrustedSigners};
use log::{debug, info};
use thiserror::Error;

/// Reasons a manifest is rejected.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The signature bytes could not be decoded.
    #[error("malformed signature: {reason}")]
    MalformedSignature {
        /// Decoder message.
        reason: String,
    },

    /// The signature was made for a different purpose.
    #[error("signature namespace mismatch: expected {expected}, found {found}")]
    WrongNamespace {
        /// Namespace this verifier requires.
        expected: String,
        /// Namespace recorded in the signature.
        found: String,
    },

    /// The signing key is not in the trusted signers list.
    #[error("signer {fingerprint} is not in the trusted signers list")]
    UntrustedSigner {
        /// Fingerprint of the key that produced the signature.
        fingerprint: String,
    },

    /// The signing key is trusted, but not at the time of verification.
    #[error("signer {fingerprint} is outside its valid-after/valid-before window at {at}")]
    SignerOutsideValidity {
        /// Fingerprint of the key that produced the signature.
        fingerprint: String,
        /// The verification time.
        at: String,
    },

    /// The signature does not match the manifest bytes.
    #[error("signature does not match the manifest contents")]
    BadSignature,

    /// The manifest failed structural validation.
    #[error("manifest is invalid: {0}")]
    InvalidManifest(#[from] ManifestError),

    /// The manifest was signed for another repository.
    #[error("manifest belongs to {manifest}, but verification is running for {expected}")]
    IdentityMismatch {
        /// `repository.full_name` recorded in the manifest.
        manifest: String,
        /// Identity of the repository being verified.
        expected: String,
    },

    /// The verifier itself could not run.
    #[error("verifier unavailable: {0}")]
    Verifier(#[from] SigningError),
}

impl VerificationError {
    /// Whether the failure stems from local setup rather than the inputs.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Verifier(err) if err.is_configuration())
    }
}

/// A manifest that passed every check.
#[derive(Debug, Clone)]
pub struct VerifiedManifest {
    /// The parsed manifest.
    pub manifest: Manifest,
    /// Who signed it.
    pub signer: SignerMatch,
    /// Whether the schema version is one this build knows.
    pub schema_recognized: bool,
}

/// Verify `manifest_bytes` and `signature` for `expected`.
///
/// The signature is checked over the exact bytes before they are parsed.
///
/// # Errors
///
/// Returns the first failed check as a [`VerificationError`].
pub fn verify_manifest(
    scheme: &dyn SignatureScheme,
    manifest_bytes: &[u8],
    signature: &DetachedSignature,
    signers: &TrustedSigners,
    expected: &RepositoryIdentity,
) -> Result<VerifiedManifest, VerificationError> {
    let signer = scheme.verify(manifest_bytes, signature, signers)?;
    debug!("signature accepted for principals {:?}", signer.principals);

    let manifest = parse_manifest(manifest_bytes)?;
    let recorded = &manifest.repository().full_name;
    let expected_name = expected.full_name();
    if *recorded != expected_name {
        return Err(VerificationError::IdentityMismatch {
            manifest: recorded.clone(),
            expected: expected_name,
        });
    }

    let schema_recognized = manifest.schema_version().is_recognized();
    info!(
        "verified manifest for {} release {} ({} artifacts)",
        expected_name,
        manifest.release().tag,
        manifest.artifacts().len()
    );
    Ok(VerifiedManifest {
        manifest,
        signer,
        schema_recognized,
    })
}
