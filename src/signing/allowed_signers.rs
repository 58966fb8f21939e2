//! The OpenSSH `allowed_signers` trust list.
//!
//! Each non-comment line reads
//! `principals [options] keytype base64-key [comment]`. The `namespaces`
//! option restricts which signature purposes a key is trusted for,
//! `valid-after` and `valid-before` bound when it is trusted, and
//! `cert-authority` marks keys that only vouch for certificates.
//!
//! Validity bounds are `YYYYMMDD`, `YYYYMMDDHHMM` or `YYYYMMDDHHMMSS`,
//! optionally suffixed with `Z`, and are always read as UTC.

use super::openssh_key::{PublicKey, PublicKeyError};
use crate::timestamp::Timestamp;
use camino::Utf8Path;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::io;
use thiserror::Error;

/// Errors arising from loading or parsing a trust list.
#[derive(Debug, Error)]
pub enum TrustListError {
    /// The file could not be read.
    #[error("failed to read trusted signers from {path}: {source}")]
    Read {
        /// Path of the trust list.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A line could not be parsed.
    #[error("trusted signers line {line}: {reason}")]
    Syntax {
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        reason: String,
    },

    /// The list contains no usable entries.
    #[error("trusted signers list contains no entries")]
    Empty,
}

/// One trusted key and the identities it may sign as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedSigner {
    /// Principals (identity labels) this key signs as.
    pub principals: Vec<String>,
    /// Namespaces the key is limited to, if restricted.
    pub namespaces: Option<Vec<String>>,
    /// Whether the key is a certificate authority.
    pub cert_authority: bool,
    /// Earliest instant the key is trusted, if bounded.
    pub valid_after: Option<Timestamp>,
    /// Latest instant the key is trusted, if bounded.
    pub valid_before: Option<Timestamp>,
    /// The trusted key.
    pub key: PublicKey,
}

impl AllowedSigner {
    /// Whether this entry trusts its key for signatures in `namespace`.
    #[must_use]
    pub fn permits_namespace(&self, namespace: &str) -> bool {
        self.namespaces
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|entry| entry == namespace))
    }

    /// Whether `at` falls inside the entry's validity window. Both bounds
    /// are inclusive.
    #[must_use]
    pub fn is_valid_at(&self, at: &Timestamp) -> bool {
        self.valid_after.is_none_or(|after| *at >= after)
            && self.valid_before.is_none_or(|before| *at <= before)
    }
}

/// A parsed trust list, retaining its original text.
///
/// # Examples
///
/// ```
/// use ed25519_dalek::SigningKey;
/// use repo_trust::signing::allowed_signers::TrustedSigners;
/// use repo_trust::signing::openssh_key::PublicKey;
///
/// let key = PublicKey::from_ed25519(&SigningKey::from_bytes(&[1; 32]).verifying_key());
/// let text = format!(
///     "# release key\nrepo-trust namespaces=\"repo-trust\" {} ci\n",
///     key.to_openssh()
/// );
/// let signers = TrustedSigners::parse(&text).unwrap();
/// assert_eq!(signers.entries().len(), 1);
/// assert!(signers.entries()[0].permits_namespace("repo-trust"));
/// assert!(!signers.entries()[0].permits_namespace("git"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedSigners {
    text: String,
    entries: Vec<AllowedSigner>,
}

impl TrustedSigners {
    /// Parse trust list text.
    ///
    /// # Errors
    ///
    /// Returns [`TrustListError::Syntax`] for the first malformed line, or
    /// [`TrustListError::Empty`] if no entries remain.
    pub fn parse(text: &str) -> Result<Self, TrustListError> {
        let mut entries = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = parse_line(line).map_err(|reason| TrustListError::Syntax {
                line: index + 1,
                reason,
            })?;
            entries.push(entry);
        }
        if entries.is_empty() {
            return Err(TrustListError::Empty);
        }
        Ok(Self {
            text: text.to_owned(),
            entries,
        })
    }

    /// Read and parse a trust list file.
    ///
    /// # Errors
    ///
    /// Returns [`TrustListError::Read`] if the file cannot be read, or any
    /// error from [`TrustedSigners::parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, TrustListError> {
        let text = fs::read_to_string(path).map_err(|source| TrustListError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// The parsed entries, in file order.
    #[must_use]
    pub fn entries(&self) -> &[AllowedSigner] {
        &self.entries
    }

    /// The original text, for handing to external verifiers.
    #[must_use]
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// Non-CA entries that trust `key` for `namespace`, whatever their
    /// validity window.
    pub fn candidates<'a>(
        &'a self,
        key: &PublicKey,
        namespace: &str,
    ) -> impl Iterator<Item = &'a AllowedSigner> {
        self.entries.iter().filter(move |entry| {
            !entry.cert_authority && entry.key == *key && entry.permits_namespace(namespace)
        })
    }

    /// The first non-CA entry that trusts `key` for `namespace` at `at`.
    #[must_use]
    pub fn find(&self, key: &PublicKey, namespace: &str, at: &Timestamp) -> Option<&AllowedSigner> {
        self.candidates(key, namespace)
            .find(|entry| entry.is_valid_at(at))
    }
}

fn parse_line(line: &str) -> Result<AllowedSigner, String> {
    let mut tokens = tokenize(line)?.into_iter();
    let principals_token = tokens.next().ok_or("missing principals")?;
    let principals: Vec<String> = principals_token
        .split(',')
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect();
    if principals.is_empty() {
        return Err("missing principals".to_owned());
    }

    let mut next = tokens.next().ok_or("missing key type")?;
    let mut namespaces = None;
    let mut cert_authority = false;
    let mut valid_after = None;
    let mut valid_before = None;
    if !looks_like_key_type(&next) {
        for option in split_options(&next) {
            let (name, value) = option
                .split_once('=')
                .map_or((option.as_str(), None), |(n, v)| (n, Some(v)));
            match (name.to_ascii_lowercase().as_str(), value) {
                ("cert-authority", None) => cert_authority = true,
                ("namespaces", Some(list)) => {
                    namespaces = Some(
                        unquote(list)
                            .split(',')
                            .map(|ns| ns.trim().to_owned())
                            .filter(|ns| !ns.is_empty())
                            .collect(),
                    );
                }
                ("valid-after", Some(value)) => valid_after = Some(parse_validity(value)?),
                ("valid-before", Some(value)) => valid_before = Some(parse_validity(value)?),
                _ => return Err(format!("unsupported option \"{option}\"")),
            }
        }
        next = tokens.next().ok_or("missing key type")?;
    }

    let body = tokens.next().ok_or("missing key data")?;
    let key = PublicKey::from_openssh(&next, &body).map_err(|err: PublicKeyError| err.to_string())?;
    Ok(AllowedSigner {
        principals,
        namespaces,
        cert_authority,
        valid_after,
        valid_before,
        key,
    })
}

fn parse_validity(value: &str) -> Result<Timestamp, String> {
    let raw = unquote(value);
    let digits = raw.strip_suffix(['Z', 'z']).unwrap_or(raw);
    let parsed = if digits.bytes().all(|b| b.is_ascii_digit()) {
        match digits.len() {
            8 => NaiveDate::parse_from_str(digits, "%Y%m%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0)),
            12 => NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M").ok(),
            14 => NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M%S").ok(),
            _ => None,
        }
    } else {
        None
    };
    parsed
        .map(|instant| Timestamp::from(instant.and_utc()))
        .ok_or_else(|| format!("invalid validity time \"{raw}\""))
}

fn looks_like_key_type(token: &str) -> bool {
    ["ssh-", "ecdsa-", "sk-"]
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// Split on whitespace, keeping double-quoted runs intact.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if quoted {
        return Err("unterminated quote".to_owned());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Split an options token on commas outside quotes.
fn split_options(token: &str) -> Vec<String> {
    let mut options = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in token.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => options.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    options.push(current);
    options.retain(|option| !option.is_empty());
    options
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
