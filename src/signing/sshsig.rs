//! The OpenSSH `SSHSIG` detached signature format.
//!
//! Signatures produced here verify with `ssh-keygen -Y verify` and vice
//! versa. The signed data commits to the namespace, so a signature made for
//! one purpose never verifies under another.

use super::armor::{armor, dearmor};
use super::openssh_key::{ED25519, PublicKey};
use super::wire::{Reader, WireError, Writer};
use ed25519_dalek::{Signature, Signer, SigningKey};
use sha2::{Digest, Sha256, Sha512};

/// Armor label of SSH signatures.
pub const SIGNATURE_LABEL: &str = "SSH SIGNATURE";

/// Leading magic of both the signature blob and the signed data.
const MAGIC: &[u8] = b"SSHSIG";

/// The only defined blob version.
const VERSION: u32 = 1;

/// Message digest applied before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// `sha256`
    Sha256,
    /// `sha512`, the `ssh-keygen` default.
    Sha512,
}

impl HashAlgorithm {
    /// The name recorded in the signature.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(Self::Sha256),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    fn digest(self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(message).to_vec(),
            Self::Sha512 => Sha512::digest(message).to_vec(),
        }
    }
}

/// Failure to decode an `SSHSIG` signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SshSigError {
    /// The armor or base64 is broken.
    #[error("signature armor is invalid: {0}")]
    Armor(String),
    /// The blob does not start with `SSHSIG`.
    #[error("not an SSH signature")]
    BadMagic,
    /// The blob version is not 1.
    #[error("unsupported SSH signature version {0}")]
    UnsupportedVersion(u32),
    /// The hash algorithm is not `sha256` or `sha512`.
    #[error("unsupported signature hash algorithm {0}")]
    UnsupportedHash(String),
    /// The structure is truncated or inconsistent.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// A decoded `SSHSIG` signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSignature {
    /// Key that made the signature.
    pub public_key: PublicKey,
    /// Namespace the signature is bound to.
    pub namespace: String,
    /// Digest applied to the message.
    pub hash: HashAlgorithm,
    /// Signature algorithm, e.g. `ssh-ed25519`.
    pub algorithm: String,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

impl SshSignature {
    /// Decode an armored signature.
    ///
    /// # Errors
    ///
    /// Returns [`SshSigError`] for anything that is not a well-formed
    /// version 1 `SSHSIG` blob.
    pub fn decode(armored: &[u8]) -> Result<Self, SshSigError> {
        let text = String::from_utf8_lossy(armored);
        let blob = dearmor(SIGNATURE_LABEL, &text).map_err(|err| SshSigError::Armor(err.to_string()))?;
        let mut reader = Reader::new(&blob);
        if reader.take(MAGIC.len())? != MAGIC {
            return Err(SshSigError::BadMagic);
        }
        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(SshSigError::UnsupportedVersion(version));
        }
        let key_blob = reader.read_string()?.to_vec();
        let namespace = reader.read_utf8()?.to_owned();
        reader.read_string()?;
        let hash_name = reader.read_utf8()?;
        let hash = HashAlgorithm::from_name(hash_name)
            .ok_or_else(|| SshSigError::UnsupportedHash(hash_name.to_owned()))?;
        let mut inner = Reader::new(reader.read_string()?);
        let algorithm = inner.read_utf8()?.to_owned();
        let signature = inner.read_string()?.to_vec();

        let key_algorithm = Reader::new(&key_blob).read_utf8()?.to_owned();
        let public_key = PublicKey::from_blob(&key_algorithm, key_blob)
            .map_err(|_| SshSigError::Wire(WireError("embedded public key is malformed")))?;
        Ok(Self {
            public_key,
            namespace,
            hash,
            algorithm,
            signature,
        })
    }

    /// Check the signature over `message`.
    ///
    /// Returns `false` for non-ed25519 signatures, which this build cannot
    /// verify natively.
    #[must_use]
    pub fn verifies(&self, message: &[u8]) -> bool {
        if self.algorithm != ED25519 {
            return false;
        }
        let Some(key) = self.public_key.ed25519() else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&self.signature) else {
            return false;
        };
        let Ok(data) = signed_data(&self.namespace, self.hash, message) else {
            return false;
        };
        key.verify_strict(&data, &signature).is_ok()
    }
}

/// The byte string an `SSHSIG` signature actually signs.
fn signed_data(namespace: &str, hash: HashAlgorithm, message: &[u8]) -> Result<Vec<u8>, WireError> {
    let mut writer = Writer::new();
    writer
        .put_raw(MAGIC)
        .put_string(namespace.as_bytes())
        .put_string(b"")
        .put_string(hash.name().as_bytes())
        .put_string(&hash.digest(message));
    writer.finish()
}

/// Sign `message` with an ed25519 key and return the armored signature.
///
/// # Errors
///
/// Returns [`WireError`] only if an encoded field overflows its length
/// prefix.
pub fn sign_ed25519(key: &SigningKey, namespace: &str, message: &[u8]) -> Result<Vec<u8>, WireError> {
    let hash = HashAlgorithm::Sha512;
    let data = signed_data(namespace, hash, message)?;
    let signature = key.sign(&data);

    let mut inner = Writer::new();
    inner
        .put_string(ED25519.as_bytes())
        .put_string(&signature.to_bytes());
    let public = PublicKey::from_ed25519(&key.verifying_key());

    let mut blob = Writer::new();
    blob.put_raw(MAGIC)
        .put_u32(VERSION)
        .put_string(public.blob())
        .put_string(namespace.as_bytes())
        .put_string(b"")
        .put_string(hash.name().as_bytes())
        .put_string(&inner.finish()?);
    Ok(armor(SIGNATURE_LABEL, &blob.finish()?).into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[3_u8; 32])
    }

    #[test]
    fn signatures_verify_over_the_signed_message() {
        let armored = sign_ed25519(&key(), "repo-trust", b"manifest").expect("sign");
        let decoded = SshSignature::decode(&armored).expect("decode");
        assert_eq!(decoded.namespace, "repo-trust");
        assert_eq!(decoded.hash, HashAlgorithm::Sha512);
        assert_eq!(decoded.public_key.ed25519(), Some(key().verifying_key()));
        assert!(decoded.verifies(b"manifest"));
        assert!(!decoded.verifies(b"manifesT"));
    }

    #[test]
    fn namespace_is_part_of_the_signed_data() {
        let armored = sign_ed25519(&key(), "repo-trust", b"manifest").expect("sign");
        let mut decoded = SshSignature::decode(&armored).expect("decode");
        decoded.namespace = "file".to_owned();
        assert!(!decoded.verifies(b"manifest"));
    }

    #[test]
    fn output_is_armored() {
        let armored = sign_ed25519(&key(), "repo-trust", b"x").expect("sign");
        let text = String::from_utf8(armored).expect("ascii");
        assert!(text.starts_with("-----BEGIN SSH SIGNATURE-----\n"));
        assert!(text.ends_with("-----END SSH SIGNATURE-----\n"));
    }

    #[test]
    fn rejects_non_signatures() {
        let bogus = armor(SIGNATURE_LABEL, b"NOTSIG\0\0\0\x01");
        assert_eq!(
            SshSignature::decode(bogus.as_bytes()),
            Err(SshSigError::BadMagic)
        );
        assert!(matches!(
            SshSignature::decode(b"garbage"),
            Err(SshSigError::Armor(_))
        ));
    }
}
