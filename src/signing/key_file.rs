//! Pre-flight checks on the private key file.
//!
//! Unattended signing fails in confusing ways when the key secret was
//! written out wrongly, so the file is inspected before any signer runs.

use super::error::SigningError;
use camino::Utf8Path;
use log::warn;
use std::fs;
use std::io;

/// Keys larger than this are almost certainly not a single private key.
pub const MAX_EXPECTED_KEY_BYTES: u64 = 10_000;

/// A questionable but usable property of the key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFileWarning {
    /// The file is unusually large.
    Oversized {
        /// File size in bytes.
        size: u64,
    },
    /// Group or other users can access the file.
    LoosePermissions {
        /// The file's permission bits.
        mode: u32,
    },
}

/// Check that `path` names a readable, non-empty regular file and read it.
///
/// Questionable properties are logged and returned as warnings.
///
/// # Errors
///
/// Returns [`SigningError::KeyNotFound`], [`SigningError::NotAFile`],
/// [`SigningError::EmptyKey`], or [`SigningError::PermissionDenied`].
pub fn read_key_file(path: &Utf8Path) -> Result<(String, Vec<KeyFileWarning>), SigningError> {
    let metadata = fs::metadata(path).map_err(|err| map_io(path, err))?;
    if !metadata.is_file() {
        return Err(SigningError::NotAFile {
            path: path.to_owned(),
        });
    }
    if metadata.len() == 0 {
        return Err(SigningError::EmptyKey {
            path: path.to_owned(),
        });
    }

    let mut warnings = Vec::new();
    if metadata.len() > MAX_EXPECTED_KEY_BYTES {
        warn!(
            "signing key {path} is {} bytes; expected a single private key",
            metadata.len()
        );
        warnings.push(KeyFileWarning::Oversized {
            size: metadata.len(),
        });
    }
    if let Some(mode) = loose_mode(&metadata) {
        warn!("signing key {path} is accessible to other users (mode {mode:o}); use chmod 600");
        warnings.push(KeyFileWarning::LoosePermissions { mode });
    }

    let text = fs::read_to_string(path).map_err(|err| map_io(path, err))?;
    Ok((text, warnings))
}

#[cfg(unix)]
fn loose_mode(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    (mode & 0o077 != 0).then_some(mode)
}

#[cfg(not(unix))]
fn loose_mode(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

fn map_io(path: &Utf8Path, err: io::Error) -> SigningError {
    match err.kind() {
        io::ErrorKind::NotFound => SigningError::KeyNotFound {
            path: path.to_owned(),
        },
        io::ErrorKind::PermissionDenied => SigningError::PermissionDenied {
            path: path.to_owned(),
        },
        io::ErrorKind::InvalidData => SigningError::InvalidKeyFormat {
            reason: "key file is not UTF-8 text".to_owned(),
        },
        _ => SigningError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn scratch() -> (TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf-8 path");
        (dir, root)
    }

    #[cfg(unix)]
    fn chmod(path: &Utf8Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("chmod");
    }

    #[test]
    fn missing_key_is_reported() {
        let (_dir, root) = scratch();
        let err = read_key_file(&root.join("absent")).expect_err("missing");
        assert!(matches!(err, SigningError::KeyNotFound { .. }));
    }

    #[test]
    fn directories_are_rejected() {
        let (_dir, root) = scratch();
        let err = read_key_file(&root).expect_err("directory");
        assert!(matches!(err, SigningError::NotAFile { .. }));
    }

    #[test]
    fn empty_files_are_rejected() {
        let (_dir, root) = scratch();
        let path = root.join("key");
        fs::write(&path, "").expect("write");
        let err = read_key_file(&path).expect_err("empty");
        assert!(matches!(err, SigningError::EmptyKey { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn loose_permissions_warn() {
        let (_dir, root) = scratch();
        let path = root.join("key");
        fs::write(&path, "key material").expect("write");
        chmod(&path, 0o644);
        let (_, warnings) = read_key_file(&path).expect("readable");
        assert_eq!(warnings, vec![KeyFileWarning::LoosePermissions { mode: 0o644 }]);
    }

    #[cfg(unix)]
    #[test]
    fn oversized_keys_warn() {
        let (_dir, root) = scratch();
        let path = root.join("key");
        fs::write(&path, "k".repeat(10_001)).expect("write");
        chmod(&path, 0o600);
        let (text, warnings) = read_key_file(&path).expect("readable");
        assert_eq!(text.len(), 10_001);
        assert_eq!(warnings, vec![KeyFileWarning::Oversized { size: 10_001 }]);
    }
}
