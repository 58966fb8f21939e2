//! Signing failures.
//!
//! Failures caused by the key itself (missing, unreadable, passphrase
//! protected, malformed) are kept apart from tool failures so operators can
//! tell a provisioning mistake from a transient fault.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// Errors that can occur while producing a detached signature.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The key file does not exist.
    #[error("signing key not found at {path}")]
    KeyNotFound {
        /// Path that was checked.
        path: Utf8PathBuf,
    },

    /// The key path exists but is not a regular file.
    #[error("signing key path {path} is not a regular file")]
    NotAFile {
        /// Path that was checked.
        path: Utf8PathBuf,
    },

    /// The key file is empty.
    #[error("signing key file {path} is empty")]
    EmptyKey {
        /// Path that was checked.
        path: Utf8PathBuf,
    },

    /// The key file cannot be read by this process.
    #[error("permission denied reading signing key {path}")]
    PermissionDenied {
        /// Path that was checked.
        path: Utf8PathBuf,
    },

    /// The key is encrypted and would need an interactive passphrase.
    #[error("signing key {path} is passphrase-protected")]
    PassphraseProtected {
        /// Path of the encrypted key.
        path: Utf8PathBuf,
    },

    /// The key is not a well-formed private key.
    #[error("invalid signing key format: {reason}")]
    InvalidKeyFormat {
        /// Description of what is wrong.
        reason: String,
    },

    /// The key uses an algorithm this signer cannot handle.
    #[error("unsupported signing key type {key_type}")]
    UnsupportedKeyType {
        /// The algorithm named in the key.
        key_type: String,
    },

    /// The external signing tool is not installed.
    #[error("{tool} is not installed or not on PATH")]
    ToolNotFound {
        /// Name of the missing tool.
        tool: String,
    },

    /// The external signing tool did not finish in time.
    #[error("{tool} timed out")]
    Timeout {
        /// Name of the tool.
        tool: String,
    },

    /// The external signing tool reported a failure.
    #[error("{tool} failed: {message}")]
    ToolFailed {
        /// Name of the tool.
        tool: String,
        /// The tool's diagnostic output.
        message: String,
    },

    /// Scratch files for the signer could not be written or read.
    #[error("I/O error while signing: {0}")]
    Io(#[from] io::Error),
}

impl SigningError {
    /// Whether the failure stems from key provisioning rather than the act
    /// of signing, and so will not go away by retrying.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound { .. }
                | Self::NotAFile { .. }
                | Self::EmptyKey { .. }
                | Self::PermissionDenied { .. }
                | Self::PassphraseProtected { .. }
                | Self::InvalidKeyFormat { .. }
                | Self::UnsupportedKeyType { .. }
                | Self::ToolNotFound { .. }
        )
    }

    /// An operator-facing suggestion for resolving the failure.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::KeyNotFound { .. } | Self::NotAFile { .. } | Self::EmptyKey { .. } => {
                Some("set REPO_TRUST_KEY_PATH to the private key file written from your secret")
            }
            Self::PermissionDenied { .. } => {
                Some("make the key readable by the current user, e.g. chmod 600")
            }
            Self::PassphraseProtected { .. } => Some(
                "unattended signing needs a key without a passphrase; generate one with \
                 ssh-keygen -t ed25519 -N ''",
            ),
            Self::InvalidKeyFormat { .. } | Self::UnsupportedKeyType { .. } => {
                Some("provide an unencrypted OpenSSH ed25519 private key")
            }
            Self::ToolNotFound { .. } => Some("install OpenSSH or set REPO_TRUST_SIGNER=native"),
            Self::Timeout { .. } | Self::ToolFailed { .. } | Self::Io(_) => None,
        }
    }
}
