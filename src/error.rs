//! Error type for validated value newtypes.
//!
//! Each variant names the rejected input and the constraint it violated so
//! that configuration problems can be reported without further context.

use thiserror::Error;

/// Errors arising from invalid domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// A SHA-256 digest is not a 64-character lowercase hex string.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidSha256Digest {
        /// Description of the validation failure.
        reason: String,
    },

    /// A git object id is empty, too long, or contains non-hex characters.
    #[error("invalid git SHA \"{value}\": {reason}")]
    InvalidGitSha {
        /// The rejected SHA string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A repository identity is not of the form `owner/name`.
    #[error("invalid repository identity \"{value}\": {reason}")]
    InvalidRepository {
        /// The rejected identity string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// A timestamp is not an RFC 3339 UTC timestamp.
    #[error("invalid timestamp \"{value}\": expected YYYY-MM-DDTHH:MM:SSZ")]
    InvalidTimestamp {
        /// The rejected timestamp string.
        value: String,
    },

    /// A schema version string is empty or not dotted-numeric.
    #[error("invalid schema version \"{value}\"")]
    InvalidSchemaVersion {
        /// The rejected version string.
        value: String,
    },

    /// A signature namespace is empty or contains whitespace.
    #[error("invalid signature namespace \"{value}\"")]
    InvalidNamespace {
        /// The rejected namespace.
        value: String,
    },
}

/// Result type alias using [`ValueError`].
pub type Result<T> = std::result::Result<T, ValueError>;
