//! Failures moving bytes to or from the release registry.
//!
//! Transfer errors are shared by every port that downloads, uploads, or
//! streams artifact content. They carry enough classification for callers to
//! decide whether a bounded retry is worthwhile.

use std::io;
use thiserror::Error;

/// Errors arising while transferring release data.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The registry answered with a non-success status, or the request
    /// never produced a status at all.
    #[error("request to {url} failed: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// HTTP status code, absent for connection-level failures.
        status: Option<u16>,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The registry refused the request because a rate limit was exhausted.
    #[error("rate limited by {url}")]
    RateLimited {
        /// The URL that was rate limited.
        url: String,
    },

    /// The registry response could not be decoded.
    #[error("unexpected response from {url}: {reason}")]
    Decode {
        /// The URL whose response was malformed.
        url: String,
        /// Description of the decoding failure.
        reason: String,
    },

    /// Reading or writing transferred bytes failed locally.
    #[error("I/O error during transfer: {0}")]
    Io(#[from] io::Error),
}

impl TransferError {
    /// Whether the failure is transient and worth retrying.
    ///
    /// Rate limits, server errors, and connection-level failures are
    /// retryable. Client errors such as authentication or validation
    /// failures are fatal.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_trust::transfer::TransferError;
    ///
    /// let busy = TransferError::Http {
    ///     url: "https://api.example.test".to_owned(),
    ///     status: Some(503),
    ///     reason: "service unavailable".to_owned(),
    /// };
    /// assert!(busy.is_retryable());
    ///
    /// let denied = TransferError::Http {
    ///     url: "https://api.example.test".to_owned(),
    ///     status: Some(401),
    ///     reason: "bad credentials".to_owned(),
    /// };
    /// assert!(!denied.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Http { status, .. } => match status {
                None => true,
                Some(code) => *code == 429 || (500..600).contains(code),
            },
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
            ),
            Self::NotFound { .. } | Self::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn http(status: Option<u16>) -> TransferError {
        TransferError::Http {
            url: "https://api.example.test/repos".to_owned(),
            status,
            reason: "failure".to_owned(),
        }
    }

    #[rstest]
    #[case::too_many_requests(Some(429), true)]
    #[case::internal_error(Some(500), true)]
    #[case::bad_gateway(Some(502), true)]
    #[case::connection_failure(None, true)]
    #[case::unauthorised(Some(401), false)]
    #[case::forbidden(Some(403), false)]
    #[case::unprocessable(Some(422), false)]
    fn classifies_http_statuses(#[case] status: Option<u16>, #[case] retryable: bool) {
        assert_eq!(http(status).is_retryable(), retryable);
    }

    #[test]
    fn rate_limit_is_retryable() {
        let err = TransferError::RateLimited {
            url: "https://api.example.test".to_owned(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn not_found_is_fatal() {
        let err = TransferError::NotFound {
            url: "https://api.example.test/missing".to_owned(),
        };
        assert!(!err.is_retryable());
    }

    #[rstest]
    #[case::reset(io::ErrorKind::ConnectionReset, true)]
    #[case::eof(io::ErrorKind::UnexpectedEof, true)]
    #[case::disk_full(io::ErrorKind::PermissionDenied, false)]
    fn classifies_io_errors(#[case] kind: io::ErrorKind, #[case] retryable: bool) {
        let err = TransferError::from(io::Error::new(kind, "boom"));
        assert_eq!(err.is_retryable(), retryable);
    }
}
