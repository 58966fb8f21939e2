//! Streaming SHA-256 digests for release artifacts.
//!
//! Content is hashed in fixed-size chunks so memory use stays bounded
//! regardless of artifact size. The digest is independent of the chunking.

use crate::error::{Result, ValueError};
use crate::transfer::TransferError;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// Read buffer size used while streaming content into the hasher.
const CHUNK_SIZE: usize = 8192;

/// A validated hex-encoded SHA-256 digest string.
///
/// # Examples
///
/// ```
/// use repo_trust::digest::Sha256Digest;
///
/// let hex = "a".repeat(64);
/// let digest: Sha256Digest = hex.as_str().try_into().unwrap();
/// assert_eq!(digest.as_str().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = ValueError;

    fn try_from(value: &str) -> Result<Self> {
        validate_sha256(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self> {
        validate_sha256(&value)?;
        Ok(Self(value))
    }
}

impl From<Sha256Digest> for String {
    fn from(value: Sha256Digest) -> Self {
        value.0
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that `value` is a well-formed hex-encoded SHA-256 digest.
fn validate_sha256(value: &str) -> Result<()> {
    if value.len() != DIGEST_HEX_LEN {
        return Err(ValueError::InvalidSha256Digest {
            reason: format!(
                "expected {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ),
        });
    }
    if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ValueError::InvalidSha256Digest {
            reason: format!("non-hex character '{bad}'"),
        });
    }
    if value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValueError::InvalidSha256Digest {
            reason: "digest must be lowercase".to_owned(),
        });
    }
    Ok(())
}

/// Digest and byte count of a hashed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    /// SHA-256 of the content.
    pub sha256: Sha256Digest,
    /// Number of bytes consumed.
    pub size_bytes: u64,
}

/// Incremental SHA-256 hasher that also counts bytes.
///
/// Useful when content arrives through a `Write` sink rather than a reader.
///
/// # Examples
///
/// ```
/// use repo_trust::digest::StreamingDigest;
///
/// let mut hasher = StreamingDigest::new();
/// hasher.update(b"a");
/// hasher.update(b"bc");
/// let result = hasher.finish();
/// assert_eq!(result.size_bytes, 3);
/// assert_eq!(
///     result.sha256.as_str(),
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct StreamingDigest {
    hasher: Sha256,
    size_bytes: u64,
}

impl StreamingDigest {
    /// Start a new empty digest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.size_bytes += chunk.len() as u64;
    }

    /// Finalize and return the digest with the total byte count.
    #[must_use]
    pub fn finish(self) -> ContentDigest {
        let hex = format!("{:x}", self.hasher.finalize());
        ContentDigest {
            sha256: Sha256Digest(hex),
            size_bytes: self.size_bytes,
        }
    }
}

impl io::Write for StreamingDigest {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash everything readable from `reader`.
///
/// Read failures surface as [`TransferError::Io`] so callers can treat them
/// like any other interrupted transfer.
///
/// # Errors
///
/// Returns an error if reading from `reader` fails.
pub fn digest_reader<R: Read>(mut reader: R) -> std::result::Result<ContentDigest, TransferError> {
    let mut digest = StreamingDigest::new();
    let mut buffer = [0_u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransferError::Io(err)),
        };
        digest.update(buffer.get(..read).unwrap_or_default());
    }
    Ok(digest.finish())
}

/// Hash the contents of a file on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn digest_file(path: &Utf8Path) -> std::result::Result<ContentDigest, TransferError> {
    let file = File::open(path)?;
    digest_reader(file)
}

/// Hash an in-memory byte slice.
#[must_use]
pub fn digest_bytes(bytes: &[u8]) -> ContentDigest {
    let mut digest = StreamingDigest::new();
    digest.update(bytes);
    digest.finish()
}
