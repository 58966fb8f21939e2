//! PEM-style armoring used by OpenSSH keys and signatures.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Column at which armored base64 is wrapped.
const LINE_WIDTH: usize = 70;

/// Wrap `bytes` in `-----BEGIN {label}-----` / `-----END {label}-----`.
///
/// # Examples
///
/// ```
/// use repo_trust::signing::armor::{armor, dearmor};
///
/// let text = armor("SSH SIGNATURE", b"payload");
/// assert!(text.starts_with("-----BEGIN SSH SIGNATURE-----\n"));
/// assert_eq!(dearmor("SSH SIGNATURE", &text).unwrap(), b"payload");
/// ```
#[must_use]
pub fn armor(label: &str, bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut out = format!("-----BEGIN {label}-----\n");
    let mut rest = encoded.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(LINE_WIDTH));
        out.push_str(line);
        out.push('\n');
        rest = tail;
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}

/// Failure to remove armor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArmorError {
    /// The begin or end marker is missing.
    #[error("missing \"-----BEGIN {0}-----\" / \"-----END {0}-----\" markers")]
    MissingMarkers(String),
    /// The body is not valid base64.
    #[error("armored body is not valid base64")]
    InvalidBase64,
}

/// Extract and decode the body between the `label` markers.
///
/// Text outside the markers and whitespace inside them are ignored.
///
/// # Errors
///
/// Returns [`ArmorError`] if the markers are absent or the body is not
/// base64.
pub fn dearmor(label: &str, text: &str) -> Result<Vec<u8>, ArmorError> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");
    let missing = || ArmorError::MissingMarkers(label.to_owned());
    let (_, after_begin) = text.split_once(&begin).ok_or_else(missing)?;
    let (body, _) = after_begin.split_once(&end).ok_or_else(missing)?;
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|_| ArmorError::InvalidBase64)
}
