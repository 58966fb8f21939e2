//! Detached signatures bound to a namespace.
//!
//! [`SignatureScheme`] is the port the rest of the crate signs and verifies
//! through. Two backends implement it: [`native::NativeScheme`] signs and
//! verifies ed25519 `SSHSIG` signatures in-process, and
//! [`ssh_keygen::SshKeygenScheme`] delegates to `ssh-keygen -Y`. Both read
//! and write the same signature files.

pub mod allowed_signers;
pub mod armor;
pub mod error;
pub mod key_file;
pub mod native;
pub mod openssh_key;
pub mod ssh_keygen;
pub mod sshsig;
pub mod wire;

pub use allowed_signers::{AllowedSigner, TrustListError, TrustedSigners};
pub use error::SigningError;

use crate::error::{Result as ValueResult, ValueError};
use crate::verify::VerificationError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// Namespace that signatures made by this tool are bound to.
pub const PROTOCOL_NAMESPACE: &str = "repo-trust";

/// A signature purpose tag.
///
/// # Examples
///
/// ```
/// use repo_trust::signing::Namespace;
///
/// assert_eq!(Namespace::protocol().as_str(), "repo-trust");
/// assert!(Namespace::try_from("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// The namespace of this protocol.
    #[must_use]
    pub fn protocol() -> Self {
        Self(PROTOCOL_NAMESPACE.to_owned())
    }

    /// Return the namespace as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::protocol()
    }
}

impl TryFrom<&str> for Namespace {
    type Error = ValueError;

    fn try_from(value: &str) -> ValueResult<Self> {
        if value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(ValueError::InvalidNamespace {
                value: value.to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque detached signature bytes, stored next to the signed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedSignature(Vec<u8>);

impl DetachedSignature {
    /// Wrap signature bytes as read from a signature file.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The signature bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the wrapper and return the bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Location of a private signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKeyRef {
    path: Utf8PathBuf,
}

impl SigningKeyRef {
    /// Refer to the key file at `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The key file path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Who produced a signature that verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerMatch {
    /// Principals the trusted key is listed under.
    pub principals: Vec<String>,
    /// Fingerprint of the signing key, when the backend reports one.
    pub fingerprint: Option<String>,
}

/// Produces and checks detached signatures in a fixed namespace.
pub trait SignatureScheme {
    /// The namespace signatures are bound to.
    fn namespace(&self) -> &Namespace;

    /// Sign `message` with the key at `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`SigningError`] distinguishing key problems from signer
    /// failures.
    fn sign(&self, message: &[u8], key: &SigningKeyRef) -> Result<DetachedSignature, SigningError>;

    /// Check that `signature` is a valid signature over `message` in this
    /// scheme's namespace by a key in `signers`.
    ///
    /// # Errors
    ///
    /// Returns a [`VerificationError`] describing why the signature was
    /// rejected.
    fn verify(
        &self,
        message: &[u8],
        signature: &DetachedSignature,
        signers: &TrustedSigners,
    ) -> Result<SignerMatch, VerificationError>;
}
