//! Repo-squatting detection for visitors arriving at the download page.
//!
//! The detector classifies where a visitor came from using the `Referer`
//! value and, when the referrer names a commit, the repository's ancestry
//! comparison. The decision carries an optional redirect that a
//! [`countdown::RedirectCountdown`] performs unless the visitor cancels it.
//!
//! ```text
//! Checking ──► Verified       (redirect after a short delay)
//!          ├─► Warning        (redirect to the canonical repository)
//!          └─► Indeterminate  (no redirect)
//! ```

pub mod countdown;
pub mod decision;
pub mod detector;
pub mod referrer;

pub use countdown::{CancellationToken, RedirectCountdown, Tick};
pub use decision::{ComparisonStatus, DecisionDetail, RedirectPlan, TrustDecision, TrustLevel};
pub use detector::{AncestryOracle, SquattingDetector};
pub use referrer::{ExpectedRepository, ReferrerClass, ReferrerError, classify_referrer};
