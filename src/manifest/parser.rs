//! Structural validation of manifest documents received from elsewhere.
//!
//! Missing fields are reported together, by dotted path, before typed
//! deserialization runs. An unrecognized schema version is only a warning so
//! that manifests written by newer generators remain verifiable.

use super::schema::{Manifest, ManifestError};
use log::warn;
use serde_json::Value;

/// Top-level fields every manifest must carry, with accepted aliases.
const REQUIRED_FIELDS: &[&[&str]] = &[
    &["schema_version", "repo_trust_version"],
    &["repository"],
    &["release"],
    &["artifacts"],
    &["generated_at"],
    &["generator"],
];

/// Fields every `repository` block must carry.
const REQUIRED_REPOSITORY_FIELDS: &[&str] = &["owner", "name", "full_name"];

/// Fields every `release` block must carry.
const REQUIRED_RELEASE_FIELDS: &[&str] = &["tag", "commit", "release_id"];

/// Parse and structurally validate manifest bytes.
///
/// # Errors
///
/// Returns [`ManifestError::MissingFields`] listing every absent required
/// field, [`ManifestError::Json`] for syntax or type errors, or an
/// invariant violation from [`Manifest::check_invariants`].
///
/// # Examples
///
/// ```
/// use repo_trust::manifest::parser::parse_manifest;
/// use repo_trust::manifest::schema::ManifestError;
///
/// let err = parse_manifest(br#"{"repository": {}}"#).unwrap_err();
/// assert!(matches!(err, ManifestError::MissingFields { .. }));
/// ```
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    let document: Value = serde_json::from_slice(bytes)?;
    let missing = missing_fields(&document)?;
    if !missing.is_empty() {
        return Err(ManifestError::MissingFields { fields: missing });
    }
    let manifest: Manifest = serde_json::from_value(document)?;
    manifest.check_invariants()?;
    if !manifest.schema_version().is_recognized() {
        warn!(
            "manifest schema version {} is not recognized; verifying known fields only",
            manifest.schema_version()
        );
    }
    Ok(manifest)
}

fn missing_fields(document: &Value) -> Result<Vec<String>, ManifestError> {
    let object = document.as_object().ok_or(ManifestError::NotAnObject)?;
    let mut missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|aliases| !aliases.iter().any(|name| object.contains_key(*name)))
        .filter_map(|aliases| aliases.first().map(|name| (*name).to_owned()))
        .collect();
    missing.extend(missing_nested(object.get("repository"), "repository", REQUIRED_REPOSITORY_FIELDS));
    missing.extend(missing_nested(object.get("release"), "release", REQUIRED_RELEASE_FIELDS));
    Ok(missing)
}

fn missing_nested(block: Option<&Value>, prefix: &str, required: &[&str]) -> Vec<String> {
    let Some(fields) = block.and_then(Value::as_object) else {
        return Vec::new();
    };
    required
        .iter()
        .filter(|name| !fields.contains_key(**name))
        .map(|name| format!("{prefix}.{name}"))
        .collect()
}
