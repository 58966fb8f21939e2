//! Error types for the `repo-trust` CLI.
//!
//! Every domain failure is wrapped in [`CliError`], which knows the process
//! exit code it maps to and, where one exists, a hint for the operator.
//! Configuration problems exit with 2; everything else exits with 1.
//! `check-referrer` additionally exits with 3 for an indeterminate result.

use camino::Utf8PathBuf;
use repo_trust::manifest::{BuildError, ManifestError};
use repo_trust::signing::{SigningError, TrustListError};
use repo_trust::squatting::ReferrerError;
use repo_trust::{TransferError, ValueError, VerificationError};
use std::io;
use thiserror::Error;

/// Exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for failures other than configuration errors.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for configuration errors.
pub const EXIT_CONFIGURATION: i32 = 2;

/// Exit code when `check-referrer` cannot determine provenance.
pub const EXIT_INDETERMINATE: i32 = 3;

/// Missing or malformed configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("{variable} environment variable is required")]
    Missing {
        /// Name of the variable.
        variable: &'static str,
        /// What the variable should contain.
        hint: &'static str,
    },

    /// An environment variable holds an unusable value.
    #[error("{variable} is invalid: {reason}")]
    Invalid {
        /// Name of the variable.
        variable: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Failures while publishing the verification page.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A git command failed.
    #[error("git {command} failed: {message}")]
    Git {
        /// The git subcommand, without credentials.
        command: String,
        /// Redacted standard error.
        message: String,
    },

    /// The push was still rejected after rebasing once.
    #[error("push to {branch} was rejected after one rebase and retry; another publisher may be racing")]
    Conflict {
        /// The pages branch.
        branch: String,
    },

    /// The remote refused the push outright.
    #[error("push to {branch} was refused: {message}")]
    Rejected {
        /// The pages branch.
        branch: String,
        /// Redacted reason.
        message: String,
    },

    /// The token may not write to the repository.
    #[error("permission denied pushing to {branch}: {message}")]
    PermissionDenied {
        /// The pages branch.
        branch: String,
        /// Redacted reason.
        message: String,
    },

    /// Local filesystem failure in the working copy.
    #[error("failed to prepare pages working copy: {0}")]
    Io(#[from] io::Error),
}

impl PublishError {
    /// A hint for the operator, if one applies.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Conflict { .. } => Some("re-run the publish step once other publishers finish"),
            Self::Rejected { .. } => {
                Some("check branch protection rules on the pages branch")
            }
            Self::PermissionDenied { .. } => {
                Some("grant the workflow token `contents: write` permission")
            }
            Self::Git { .. } | Self::Io(_) => None,
        }
    }
}

/// Errors reported by a subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A registry request failed.
    #[error("{operation} failed: {source}")]
    Transfer {
        /// What was being attempted.
        operation: &'static str,
        /// The transfer failure.
        #[source]
        source: TransferError,
    },

    /// Building the manifest failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A manifest file is malformed.
    #[error("manifest {path} is invalid: {source}")]
    Manifest {
        /// The manifest file.
        path: Utf8PathBuf,
        /// The structural problem.
        #[source]
        source: ManifestError,
    },

    /// Signing failed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Verification rejected the manifest.
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// The trusted signers list could not be used.
    #[error(transparent)]
    TrustList(#[from] TrustListError),

    /// Publishing the pages branch failed.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// The expected repository description is unusable.
    #[error(transparent)]
    Referrer(#[from] ReferrerError),

    /// A required input file is missing.
    #[error("{what} not found at {path}")]
    MissingFile {
        /// Description of the file.
        what: &'static str,
        /// The path that was checked.
        path: Utf8PathBuf,
        /// What to do about it.
        hint: &'static str,
    },

    /// A local file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The file involved.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Output could not be serialized.
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),

    /// A value read from the registry failed validation.
    #[error("registry returned an invalid value: {0}")]
    Value(#[from] ValueError),
}

impl CliError {
    /// Attach an operation label to a transfer failure.
    #[must_use]
    pub fn transfer(operation: &'static str, source: TransferError) -> Self {
        Self::Transfer { operation, source }
    }

    /// Wrap an I/O failure on `path`.
    pub fn io(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Config(_) | Self::TrustList(_) | Self::Referrer(_) => true,
            Self::Signing(err) => err.is_configuration(),
            Self::Verification(err) => err.is_configuration(),
            _ => false,
        }
    }

    /// The process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_configuration() {
            EXIT_CONFIGURATION
        } else {
            EXIT_FAILURE
        }
    }

    /// A hint for the operator, if one applies.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(ConfigError::Missing { hint, .. }) | Self::MissingFile { hint, .. } => {
                Some(*hint)
            }
            Self::Config(ConfigError::Invalid { .. }) => None,
            Self::Signing(err) | Self::Verification(VerificationError::Verifier(err)) => err.hint(),
            Self::Verification(VerificationError::IdentityMismatch { .. }) => {
                Some("this manifest was generated for a different repository")
            }
            Self::Verification(VerificationError::UntrustedSigner { .. }) => {
                Some("add the signing key to the allowed signers file")
            }
            Self::Verification(VerificationError::SignerOutsideValidity { .. }) => {
                Some("renew the signer's validity window in the allowed signers file")
            }
            Self::TrustList(_) => {
                Some("point REPO_TRUST_ALLOWED_SIGNERS at an OpenSSH allowed_signers file")
            }
            Self::Publish(err) => err.hint(),
            Self::Transfer { source, .. } if source.is_retryable() => {
                Some("the registry may be rate limiting or unavailable; retry later")
            }
            Self::Transfer {
                source: TransferError::Http {
                    status: Some(401 | 403),
                    ..
                },
                ..
            } => Some("check that GITHUB_TOKEN is valid and has access to the repository"),
            _ => None,
        }
    }
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::missing_config(
        CliError::from(ConfigError::Missing { variable: "GITHUB_TOKEN", hint: "token" }),
        EXIT_CONFIGURATION
    )]
    #[case::passphrase(
        CliError::from(SigningError::PassphraseProtected { path: "key".into() }),
        EXIT_CONFIGURATION
    )]
    #[case::permission(
        CliError::from(SigningError::PermissionDenied { path: "key".into() }),
        EXIT_CONFIGURATION
    )]
    #[case::tool_failure(
        CliError::from(SigningError::ToolFailed { tool: "ssh-keygen".into(), message: "boom".into() }),
        EXIT_FAILURE
    )]
    #[case::bad_signature(CliError::from(VerificationError::BadSignature), EXIT_FAILURE)]
    #[case::trust_list(CliError::from(TrustListError::Empty), EXIT_CONFIGURATION)]
    #[case::transfer(
        CliError::transfer("list assets", TransferError::RateLimited { url: "u".into() }),
        EXIT_FAILURE
    )]
    #[case::publish(
        CliError::from(PublishError::Conflict { branch: "gh-pages".into() }),
        EXIT_FAILURE
    )]
    fn maps_exit_codes(#[case] err: CliError, #[case] code: i32) {
        assert_eq!(err.exit_code(), code);
    }

    #[test]
    fn missing_variables_carry_their_hint() {
        let err = CliError::from(ConfigError::Missing {
            variable: "GITHUB_REF_NAME",
            hint: "set it to the release tag",
        });
        assert_eq!(err.to_string(), "GITHUB_REF_NAME environment variable is required");
        assert_eq!(err.hint(), Some("set it to the release tag"));
    }

    #[test]
    fn identity_mismatches_explain_themselves() {
        let err = CliError::from(VerificationError::IdentityMismatch {
            manifest: "a/b".into(),
            expected: "c/d".into(),
        });
        assert!(err.hint().is_some_and(|hint| hint.contains("different repository")));
    }
}
