//! Shared test utilities: deterministic key material, sample manifests and a
//! scripted [`CommandExecutor`].
//!
//! Enabled for this crate's own tests and, through the `test-support`
//! feature, for dependent crates' tests.

use crate::command::{CommandExecutor, Invocation};
use crate::digest::Sha256Digest;
use crate::identity::RepositoryIdentity;
use crate::manifest::schema::{Manifest, ReleaseArtifact, ReleaseRecord};
use crate::signing::openssh_key::{PublicKey, encode_private_key};
use crate::signing::{PROTOCOL_NAMESPACE, SigningKeyRef, TrustedSigners};
use crate::timestamp::Timestamp;
use camino::{Utf8Path, Utf8PathBuf};
use ed25519_dalek::SigningKey;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io;
use std::process::{ExitStatus, Output};

/// SHA-256 of the three bytes `abc`.
pub const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

/// Fixed ed25519 keys for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKey {
    /// The key a release is signed with.
    Release,
    /// A key nobody trusts.
    Impostor,
}

impl TestKey {
    fn seed(self) -> [u8; 32] {
        match self {
            Self::Release => [7; 32],
            Self::Impostor => [13; 32],
        }
    }

    /// The private key.
    pub fn signing_key(self) -> SigningKey {
        SigningKey::from_bytes(&self.seed())
    }

    /// The public key in OpenSSH form.
    pub fn public_key(self) -> PublicKey {
        PublicKey::from_ed25519(&self.signing_key().verifying_key())
    }

    /// The private key as an unencrypted OpenSSH key file.
    pub fn openssh_private_key(self) -> String {
        encode_private_key(&self.signing_key(), "test@repo-trust", 0x5eed_5eed)
            .expect("encode test key")
    }

    /// An `allowed_signers` line trusting this key for the protocol
    /// namespace under `principal`.
    pub fn allowed_signers_line(self, principal: &str) -> String {
        format!(
            "{principal} namespaces=\"{PROTOCOL_NAMESPACE}\" {}\n",
            self.public_key().to_openssh()
        )
    }
}

/// A key written to a private temporary directory together with a trust
/// list naming it.
#[derive(Debug)]
pub struct KeyFixture {
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
    key: TestKey,
}

impl KeyFixture {
    /// Write `key` and its trust list to a new temporary directory.
    pub fn new(key: TestKey) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 tempdir");
        let fixture = Self {
            _dir: dir,
            root,
            key,
        };
        write_private(&fixture.key_path(), &key.openssh_private_key());
        fs::write(fixture.allowed_signers_path(), key.allowed_signers_line("repo-trust"))
            .expect("write allowed signers");
        fixture
    }

    /// The temporary directory.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Path of the private key file.
    pub fn key_path(&self) -> Utf8PathBuf {
        self.root.join("id_ed25519")
    }

    /// Reference to the private key file.
    pub fn key_ref(&self) -> SigningKeyRef {
        SigningKeyRef::new(self.key_path())
    }

    /// Path of the `allowed_signers` file.
    pub fn allowed_signers_path(&self) -> Utf8PathBuf {
        self.root.join("allowed_signers")
    }

    /// The parsed trust list.
    pub fn trusted_signers(&self) -> TrustedSigners {
        TrustedSigners::parse(&self.key.allowed_signers_line("repo-trust")).expect("trust list")
    }
}

#[cfg(unix)]
fn write_private(path: &Utf8Path, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, contents).expect("write key");
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).expect("chmod key");
}

#[cfg(not(unix))]
fn write_private(path: &Utf8Path, contents: &str) {
    fs::write(path, contents).expect("write key");
}

/// A manifest for `full_name` with one artifact holding `abc`.
pub fn sample_manifest(full_name: &str) -> Manifest {
    let identity = RepositoryIdentity::parse(full_name).expect("identity");
    let release = ReleaseRecord {
        tag: "v1.2.0".to_owned(),
        commit: "0123456789abcdef0123456789abcdef01234567".to_owned(),
        published_at: Some(Timestamp::from_epoch_secs(1_771_156_800)),
        release_id: 4242,
    };
    let artifacts = vec![ReleaseArtifact {
        filename: "widgets-1.2.0.tar.gz".to_owned(),
        sha256: Sha256Digest::try_from(ABC_SHA256).expect("digest"),
        size_bytes: 3,
        download_url: format!(
            "https://github.com/{full_name}/releases/download/v1.2.0/widgets-1.2.0.tar.gz"
        ),
    }];
    Manifest::new(
        &identity,
        None,
        release,
        artifacts,
        Timestamp::from_epoch_secs(1_771_160_400),
    )
    .expect("sample manifest")
}

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    text_output("")
}

/// Creates a successful command `Output` printing `stdout`.
pub fn text_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// An expected command invocation.
///
/// Only the leading arguments are compared, since invocations often end in
/// temporary paths.
#[derive(Debug)]
pub struct ExpectedCall {
    /// Program expected to run.
    pub program: &'static str,
    /// Arguments the invocation must start with.
    pub leading_args: Vec<&'static str>,
    /// The result to return.
    pub result: io::Result<Output>,
    /// Side effect performed before returning, standing in for the tool's
    /// own file writes.
    pub effect: Option<fn(&Invocation)>,
}

impl ExpectedCall {
    /// Expect `program` with arguments starting `leading_args`, succeeding
    /// silently unless told otherwise.
    pub fn new(program: &'static str, leading_args: &[&'static str]) -> Self {
        Self {
            program,
            leading_args: leading_args.to_vec(),
            result: Ok(success_output()),
            effect: None,
        }
    }

    /// Return `result` for this call.
    #[must_use]
    pub fn returning(mut self, result: io::Result<Output>) -> Self {
        self.result = result;
        self
    }

    /// Run `effect` when the call happens.
    #[must_use]
    pub fn with_effect(mut self, effect: fn(&Invocation)) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    seen: RefCell<Vec<Invocation>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    /// Every invocation received so far.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.seen.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} remain: {:?}",
            remaining.len(),
            remaining.iter().map(|call| call.program).collect::<Vec<_>>()
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, invocation: &Invocation) -> io::Result<Output> {
        self.seen.borrow_mut().push(invocation.clone());
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected command invocation: {}", invocation.display()));

        assert_eq!(call.program, invocation.program, "program mismatch");
        let leading: Vec<&str> = invocation
            .args
            .iter()
            .take(call.leading_args.len())
            .map(String::as_str)
            .collect();
        assert_eq!(
            call.leading_args, leading,
            "argument mismatch for {}",
            invocation.display()
        );
        if let Some(effect) = call.effect {
            effect(invocation);
        }
        call.result
    }
}
