//! Reserved asset names for the manifest and its signature.
//!
//! Both files are uploaded next to the artifacts they describe, so the
//! builder must never hash them as artifacts of their own release.

/// Filename of the manifest asset.
pub const MANIFEST_FILENAME: &str = "repo-trust-manifest.json";

/// Suffix appended to a signed file's name to name its detached signature.
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// Prefix shared by every reserved manifest or signature asset name.
pub const RESERVED_PREFIX: &str = "repo-trust-manifest";

/// Prefix shared by every asset this tool publishes, used to hide them from
/// download listings.
pub const PROTOCOL_ASSET_PREFIX: &str = "repo-trust-";

/// Return the detached signature filename for `signed`.
///
/// # Examples
///
/// ```
/// use repo_trust::manifest::naming::{MANIFEST_FILENAME, signature_filename};
///
/// assert_eq!(
///     signature_filename(MANIFEST_FILENAME),
///     "repo-trust-manifest.json.sig"
/// );
/// ```
#[must_use]
pub fn signature_filename(signed: &str) -> String {
    format!("{signed}{SIGNATURE_SUFFIX}")
}

/// Whether `name` belongs to the reserved manifest/signature namespace.
///
/// # Examples
///
/// ```
/// use repo_trust::manifest::naming::is_reserved;
///
/// assert!(is_reserved("repo-trust-manifest.json"));
/// assert!(is_reserved("repo-trust-manifest.json.sig"));
/// assert!(!is_reserved("widget-1.0.tar.gz"));
/// ```
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Whether `name` is any asset published by this tool.
#[must_use]
pub fn is_protocol_asset(name: &str) -> bool {
    name.starts_with(PROTOCOL_ASSET_PREFIX)
}
