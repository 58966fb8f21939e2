//! UTC timestamps in the `YYYY-MM-DDThh:mm:ssZ` form used by manifests and
//! the release registry.

use crate::error::{Result, ValueError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated RFC 3339 UTC timestamp with second precision.
///
/// Only the canonical form is accepted, so a parsed timestamp always
/// serializes back to the same text.
///
/// # Examples
///
/// ```
/// use repo_trust::timestamp::Timestamp;
///
/// let ts = Timestamp::from_epoch_secs(946_684_800);
/// assert_eq!(ts.to_string(), "2000-01-01T00:00:00Z");
/// assert!(Timestamp::try_from("2000-01-01").is_err());
/// assert!(Timestamp::try_from("2026-13-45T99:99:99Z").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current wall-clock time, truncated to whole seconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_epoch_secs(Utc::now().timestamp())
    }

    /// The instant `epoch_secs` seconds after the Unix epoch.
    ///
    /// Offsets outside the representable range clamp to the epoch.
    #[must_use]
    pub fn from_epoch_secs(epoch_secs: i64) -> Self {
        Self(DateTime::from_timestamp(epoch_secs, 0).unwrap_or_default())
    }

    /// The underlying instant.
    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_epoch_secs(value.timestamp())
    }
}

impl TryFrom<&str> for Timestamp {
    type Error = ValueError;

    fn try_from(value: &str) -> Result<Self> {
        let invalid = || ValueError::InvalidTimestamp {
            value: value.to_owned(),
        };
        let parsed = DateTime::parse_from_rfc3339(value).map_err(|_| invalid())?;
        let timestamp = Self(parsed.with_timezone(&Utc));
        if timestamp.to_string() == value {
            Ok(timestamp)
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self> {
        Self::try_from(value.as_str())
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}
