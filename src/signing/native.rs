//! In-process ed25519 signing and verification.

use super::key_file::read_key_file;
use super::openssh_key::parse_private_key;
use super::sshsig::{SshSignature, sign_ed25519};
use super::{
    DetachedSignature, Namespace, SignatureScheme, SignerMatch, SigningError, SigningKeyRef,
    TrustedSigners,
};
use crate::timestamp::Timestamp;
use crate::verify::VerificationError;
use log::debug;

/// Signs with unencrypted OpenSSH ed25519 keys without spawning tools.
///
/// # Examples
///
/// ```
/// use repo_trust::signing::native::NativeScheme;
/// use repo_trust::signing::{Namespace, SignatureScheme};
///
/// let scheme = NativeScheme::new(Namespace::protocol());
/// assert_eq!(scheme.namespace().as_str(), "repo-trust");
/// ```
#[derive(Debug, Clone, Default)]
pub struct NativeScheme {
    namespace: Namespace,
    verify_time: Option<Timestamp>,
}

impl NativeScheme {
    /// Create a scheme bound to `namespace`.
    #[must_use]
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            verify_time: None,
        }
    }

    /// Check signer validity windows at `at` instead of the current time.
    #[must_use]
    pub fn with_verify_time(mut self, at: Timestamp) -> Self {
        self.verify_time = Some(at);
        self
    }
}

impl SignatureScheme for NativeScheme {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn sign(&self, message: &[u8], key: &SigningKeyRef) -> Result<DetachedSignature, SigningError> {
        let (text, _warnings) = read_key_file(key.path())?;
        let signing_key = parse_private_key(&text, key.path())?;
        let armored = sign_ed25519(&signing_key, self.namespace.as_str(), message).map_err(|err| {
            SigningError::InvalidKeyFormat {
                reason: err.to_string(),
            }
        })?;
        debug!("signed {} bytes in namespace {}", message.len(), self.namespace);
        Ok(DetachedSignature::from_bytes(armored))
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &DetachedSignature,
        signers: &TrustedSigners,
    ) -> Result<SignerMatch, VerificationError> {
        let decoded = SshSignature::decode(signature.as_bytes()).map_err(|err| {
            VerificationError::MalformedSignature {
                reason: err.to_string(),
            }
        })?;
        if decoded.namespace != self.namespace.as_str() {
            return Err(VerificationError::WrongNamespace {
                expected: self.namespace.to_string(),
                found: decoded.namespace,
            });
        }
        let at = self.verify_time.unwrap_or_else(Timestamp::now);
        let namespace = self.namespace.as_str();
        let Some(entry) = signers.find(&decoded.public_key, namespace, &at) else {
            let fingerprint = decoded.public_key.fingerprint();
            if signers.candidates(&decoded.public_key, namespace).next().is_some() {
                return Err(VerificationError::SignerOutsideValidity {
                    fingerprint,
                    at: at.to_string(),
                });
            }
            return Err(VerificationError::UntrustedSigner { fingerprint });
        };
        if !decoded.verifies(message) {
            return Err(VerificationError::BadSignature);
        }
        Ok(SignerMatch {
            principals: entry.principals.clone(),
            fingerprint: Some(decoded.public_key.fingerprint()),
        })
    }
}
