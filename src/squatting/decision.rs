//! Trust decisions and the redirects they schedule.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Delay before a verified visitor is sent back.
pub const VERIFIED_REDIRECT_DELAY: Duration = Duration::from_secs(5);

/// Delay before a visitor is taken away from a suspected squatter's page.
pub const WARNING_REDIRECT_DELAY: Duration = Duration::from_secs(15);

/// How far a visitor's origin can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// The visitor came from the expected repository's official history.
    Verified,
    /// The visitor probably came from an impersonating fork.
    Warning,
    /// Provenance could not be established either way.
    Indeterminate,
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Verified => "verified",
            Self::Warning => "warning",
            Self::Indeterminate => "indeterminate",
        };
        f.write_str(label)
    }
}

/// Result of comparing a referenced commit with the default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    /// The default branch contains the reference and more.
    Ahead,
    /// The reference is the default branch tip.
    Identical,
    /// The reference is past the default branch tip.
    Behind,
    /// The two histories have split.
    Diverged,
}

impl ComparisonStatus {
    /// Parse the status string reported by the comparison API.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_trust::squatting::ComparisonStatus;
    ///
    /// assert_eq!(ComparisonStatus::parse("identical"), Some(ComparisonStatus::Identical));
    /// assert_eq!(ComparisonStatus::parse("sideways"), None);
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ahead" => Some(Self::Ahead),
            "identical" => Some(Self::Identical),
            "behind" => Some(Self::Behind),
            "diverged" => Some(Self::Diverged),
            _ => None,
        }
    }

    /// Whether this status shows the reference is part of official history.
    ///
    /// The comparison uses the reference as base and the default branch as
    /// head, so `Behind` means the reference sits on top of the branch. The
    /// protocol still classifies it as official history; only `Diverged` is
    /// a warning.
    #[must_use]
    pub fn is_official_history(self) -> bool {
        matches!(self, Self::Ahead | Self::Identical | Self::Behind)
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ahead => "ahead",
            Self::Identical => "identical",
            Self::Behind => "behind",
            Self::Diverged => "diverged",
        };
        f.write_str(label)
    }
}

/// Structured facts behind a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionDetail {
    /// Host the visitor came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_host: Option<String>,
    /// Object id found in the referrer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Default branch the reference was compared with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// What the comparison reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonStatus>,
}

/// A navigation scheduled after a delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectPlan {
    /// Where to go.
    pub target: String,
    /// How long to wait, in whole seconds.
    #[serde(rename = "delay_seconds", serialize_with = "serialize_secs")]
    pub delay: Duration,
}

fn serialize_secs<S: serde::Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(delay.as_secs())
}

/// The outcome of a provenance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustDecision {
    /// Classification.
    pub level: TrustLevel,
    /// Explanation shown to the visitor.
    pub reason: String,
    /// Facts the classification was based on.
    pub detail: DecisionDetail,
    /// Navigation to perform unless cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectPlan>,
}

impl TrustDecision {
    /// A verified decision returning the visitor to `target`.
    #[must_use]
    pub fn verified(reason: impl Into<String>, detail: DecisionDetail, target: String) -> Self {
        Self {
            level: TrustLevel::Verified,
            reason: reason.into(),
            detail,
            redirect: Some(RedirectPlan {
                target,
                delay: VERIFIED_REDIRECT_DELAY,
            }),
        }
    }

    /// A warning that moves the visitor to the canonical repository at
    /// `canonical`.
    #[must_use]
    pub fn warning(reason: impl Into<String>, detail: DecisionDetail, canonical: String) -> Self {
        Self {
            level: TrustLevel::Warning,
            reason: reason.into(),
            detail,
            redirect: Some(RedirectPlan {
                target: canonical,
                delay: WARNING_REDIRECT_DELAY,
            }),
        }
    }

    /// An indeterminate decision. It never redirects.
    #[must_use]
    pub fn indeterminate(reason: impl Into<String>, detail: DecisionDetail) -> Self {
        Self {
            level: TrustLevel::Indeterminate,
            reason: reason.into(),
            detail,
            redirect: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::ahead(ComparisonStatus::Ahead, true)]
    #[case::identical(ComparisonStatus::Identical, true)]
    #[case::behind(ComparisonStatus::Behind, true)]
    #[case::diverged(ComparisonStatus::Diverged, false)]
    fn official_history(#[case] status: ComparisonStatus, #[case] official: bool) {
        assert_eq!(status.is_official_history(), official);
        assert_eq!(ComparisonStatus::parse(&status.to_string()), Some(status));
    }

    #[test]
    fn warnings_wait_longer_than_verified_redirects() {
        let verified = TrustDecision::verified("ok", DecisionDetail::default(), "a".into());
        let warning = TrustDecision::warning("bad", DecisionDetail::default(), "b".into());
        let v = verified.redirect.expect("verified redirect");
        let w = warning.redirect.expect("warning redirect");
        assert!(w.delay > v.delay);
        assert_eq!(w.target, "b");
    }

    #[test]
    fn indeterminate_never_redirects() {
        let decision = TrustDecision::indeterminate("unknown", DecisionDetail::default());
        assert!(decision.redirect.is_none());
    }

    #[test]
    fn serializes_for_display() {
        let decision = TrustDecision::warning(
            "fork",
            DecisionDetail {
                reference: Some("abc1234".into()),
                ..DecisionDetail::default()
            },
            "https://github.com/octo/widgets".into(),
        );
        let json = serde_json::to_value(&decision).expect("json");
        assert_eq!(json["level"], "warning");
        assert_eq!(json["detail"]["reference"], "abc1234");
        assert!(json["detail"].get("branch").is_none());
        assert_eq!(json["redirect"]["delay_seconds"], 15);
    }
}
