//! Signing and verification through `ssh-keygen -Y`.

use super::key_file::read_key_file;
use super::{
    DetachedSignature, Namespace, SignatureScheme, SignerMatch, SigningError, SigningKeyRef,
    TrustedSigners,
};
use crate::command::{CommandExecutor, Invocation, stderr_text, stdout_text};
use crate::verify::VerificationError;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;
use std::io;
use std::process::Output;

/// Default program name.
pub const SSH_KEYGEN: &str = "ssh-keygen";

const MESSAGE_FILE: &str = "message";

/// Delegates signatures to the OpenSSH `ssh-keygen` tool.
pub struct SshKeygenScheme<'a> {
    executor: &'a dyn CommandExecutor,
    namespace: Namespace,
    program: String,
}

impl<'a> SshKeygenScheme<'a> {
    /// Create a scheme that runs `ssh-keygen` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, namespace: Namespace) -> Self {
        Self {
            executor,
            namespace,
            program: SSH_KEYGEN.to_owned(),
        }
    }

    /// Use a different program path.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn run(&self, invocation: &Invocation) -> Result<Output, SigningError> {
        debug!("running {}", invocation.display());
        self.executor
            .run(invocation)
            .map_err(|err| self.launch_error(&err))
    }

    fn launch_error(&self, err: &io::Error) -> SigningError {
        match err.kind() {
            io::ErrorKind::NotFound => SigningError::ToolNotFound {
                tool: self.program.clone(),
            },
            io::ErrorKind::TimedOut => SigningError::Timeout {
                tool: self.program.clone(),
            },
            _ => SigningError::ToolFailed {
                tool: self.program.clone(),
                message: err.to_string(),
            },
        }
    }

    fn sign_failure(&self, output: &Output, key: &Utf8Path) -> SigningError {
        let stderr = stderr_text(output);
        let lowered = stderr.to_lowercase();
        if lowered.contains("passphrase") {
            SigningError::PassphraseProtected {
                path: key.to_owned(),
            }
        } else if lowered.contains("permission denied") || lowered.contains("bad permissions") {
            SigningError::PermissionDenied {
                path: key.to_owned(),
            }
        } else if lowered.contains("no such file") {
            SigningError::KeyNotFound {
                path: key.to_owned(),
            }
        } else if lowered.contains("invalid format") || lowered.contains("error in libcrypto") {
            SigningError::InvalidKeyFormat { reason: stderr }
        } else {
            SigningError::ToolFailed {
                tool: self.program.clone(),
                message: stderr,
            }
        }
    }
}

fn scratch_dir() -> Result<(tempfile::TempDir, Utf8PathBuf), io::Error> {
    let dir = tempfile::tempdir()?;
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|path| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("temporary directory {} is not UTF-8", path.display()),
        )
    })?;
    Ok((dir, path))
}

impl SignatureScheme for SshKeygenScheme<'_> {
    fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    fn sign(&self, message: &[u8], key: &SigningKeyRef) -> Result<DetachedSignature, SigningError> {
        read_key_file(key.path())?;
        let (_guard, dir) = scratch_dir()?;
        let message_path = dir.join(MESSAGE_FILE);
        fs::write(&message_path, message)?;

        let invocation = Invocation::new(&self.program).args([
            "-Y",
            "sign",
            "-f",
            key.path().as_str(),
            "-n",
            self.namespace.as_str(),
            message_path.as_str(),
        ]);
        let output = self.run(&invocation)?;
        if !output.status.success() {
            return Err(self.sign_failure(&output, key.path()));
        }

        let signature_path = Utf8PathBuf::from(format!("{message_path}.sig"));
        let bytes = fs::read(&signature_path).map_err(|err| SigningError::ToolFailed {
            tool: self.program.clone(),
            message: format!("no signature written to {signature_path}: {err}"),
        })?;
        Ok(DetachedSignature::from_bytes(bytes))
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &DetachedSignature,
        signers: &TrustedSigners,
    ) -> Result<SignerMatch, VerificationError> {
        let (_guard, dir) = scratch_dir().map_err(SigningError::from)?;
        let allowed_path = dir.join("allowed_signers");
        let signature_path = dir.join("signature.sig");
        fs::write(&allowed_path, signers.as_text()).map_err(SigningError::from)?;
        fs::write(&signature_path, signature.as_bytes()).map_err(SigningError::from)?;

        let find = Invocation::new(&self.program).args([
            "-Y",
            "find-principals",
            "-s",
            signature_path.as_str(),
            "-f",
            allowed_path.as_str(),
        ]);
        let found = self.run(&find)?;
        if !found.status.success() {
            return Err(classify_verify_failure(&stderr_text(&found)));
        }
        let principals: Vec<String> = stdout_text(&found)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        let Some(principal) = principals.first() else {
            return Err(VerificationError::UntrustedSigner {
                fingerprint: String::from("unknown"),
            });
        };

        let check = Invocation::new(&self.program)
            .args([
                "-Y",
                "verify",
                "-f",
                allowed_path.as_str(),
                "-I",
                principal.as_str(),
                "-n",
                self.namespace.as_str(),
                "-s",
                signature_path.as_str(),
            ])
            .stdin(message.to_vec());
        let verified = self.run(&check)?;
        if !verified.status.success() {
            return Err(classify_verify_failure(&stderr_text(&verified)));
        }
        Ok(SignerMatch {
            principals,
            fingerprint: fingerprint_from(&stdout_text(&verified)),
        })
    }
}

fn classify_verify_failure(stderr: &str) -> VerificationError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("no principal matched") || lowered.contains("not found in allowed") {
        VerificationError::UntrustedSigner {
            fingerprint: fingerprint_from(stderr).unwrap_or_else(|| String::from("unknown")),
        }
    } else if lowered.contains("namespace") {
        VerificationError::WrongNamespace {
            expected: String::new(),
            found: stderr.trim().to_owned(),
        }
    } else if lowered.contains("couldn't parse") || lowered.contains("invalid format") {
        VerificationError::MalformedSignature {
            reason: stderr.trim().to_owned(),
        }
    } else {
        VerificationError::BadSignature
    }
}

fn fingerprint_from(text: &str) -> Option<String> {
    text.split_whitespace()
        .find(|word| word.starts_with("SHA256:"))
        .map(|word| word.trim_end_matches(|c: char| !c.is_ascii_alphanumeric() && c != '/' && c != '+').to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        ExpectedCall, KeyFixture, StubExecutor, TestKey, failure_output, success_output,
        text_output,
    };
    use std::io;

    fn write_signature(invocation: &Invocation) {
        let message = invocation.args.last().expect("message path");
        fs::write(format!("{message}.sig"), b"-----BEGIN SSH SIGNATURE-----\n")
            .expect("write signature");
    }

    #[test]
    fn signs_through_ssh_keygen() {
        let fixture = KeyFixture::new(TestKey::Release);
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("ssh-keygen", &["-Y", "sign", "-f"])
                .returning(Ok(success_output()))
                .with_effect(write_signature),
        ]);
        let scheme = SshKeygenScheme::new(&executor, Namespace::protocol());

        let signature = scheme.sign(b"manifest", &fixture.key_ref()).expect("sign");

        assert!(signature.as_bytes().starts_with(b"-----BEGIN SSH SIGNATURE"));
        executor.assert_finished();
        let seen = executor.invocations();
        assert!(seen[0].args.contains(&"repo-trust".to_owned()));
    }

    #[test]
    fn missing_tool_is_reported() {
        let fixture = KeyFixture::new(TestKey::Release);
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("ssh-keygen", &["-Y", "sign"])
                .returning(Err(io::Error::from(io::ErrorKind::NotFound))),
        ]);
        let scheme = SshKeygenScheme::new(&executor, Namespace::protocol());

        let err = scheme.sign(b"m", &fixture.key_ref()).expect_err("no tool");

        assert!(matches!(err, SigningError::ToolNotFound { ref tool } if tool == "ssh-keygen"));
    }

    #[test]
    fn passphrase_prompts_are_key_errors() {
        let fixture = KeyFixture::new(TestKey::Release);
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("ssh-keygen", &["-Y", "sign"]).returning(Ok(failure_output(
                "Enter passphrase: incorrect passphrase supplied to decrypt private key",
            ))),
        ]);
        let scheme = SshKeygenScheme::new(&executor, Namespace::protocol());

        let err = scheme.sign(b"m", &fixture.key_ref()).expect_err("passphrase");

        assert!(matches!(err, SigningError::PassphraseProtected { .. }));
    }

    #[test]
    fn verifies_with_found_principal() {
        let fixture = KeyFixture::new(TestKey::Release);
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("ssh-keygen", &["-Y", "find-principals"])
                .returning(Ok(text_output("repo-trust\n"))),
            ExpectedCall::new("ssh-keygen", &["-Y", "verify"]).returning(Ok(text_output(
                "Good \"repo-trust\" signature for repo-trust with ED25519 key SHA256:abc+/def\n",
            ))),
        ]);
        let scheme = SshKeygenScheme::new(&executor, Namespace::protocol());

        let signer = scheme
            .verify(
                b"manifest",
                &DetachedSignature::from_bytes(b"sig".to_vec()),
                &fixture.trusted_signers(),
            )
            .expect("verify");

        assert_eq!(signer.principals, vec!["repo-trust"]);
        assert_eq!(signer.fingerprint.as_deref(), Some("SHA256:abc+/def"));
        let seen = executor.invocations();
        assert_eq!(seen[1].stdin.as_deref(), Some(b"manifest".as_slice()));
        executor.assert_finished();
    }

    #[test]
    fn unknown_signers_are_untrusted() {
        let fixture = KeyFixture::new(TestKey::Release);
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("ssh-keygen", &["-Y", "find-principals"])
                .returning(Ok(failure_output("No principal matched.\n"))),
        ]);
        let scheme = SshKeygenScheme::new(&executor, Namespace::protocol());

        let err = scheme
            .verify(
                b"manifest",
                &DetachedSignature::from_bytes(b"sig".to_vec()),
                &fixture.trusted_signers(),
            )
            .expect_err("untrusted");

        assert!(matches!(err, VerificationError::UntrustedSigner { .. }));
    }

    #[test]
    fn failed_verification_is_a_bad_signature() {
        let fixture = KeyFixture::new(TestKey::Release);
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("ssh-keygen", &["-Y", "find-principals"])
                .returning(Ok(text_output("repo-trust\n"))),
            ExpectedCall::new("ssh-keygen", &["-Y", "verify"])
                .returning(Ok(failure_output("Signature verification failed: incorrect signature\n"))),
        ]);
        let scheme = SshKeygenScheme::new(&executor, Namespace::protocol());

        let err = scheme
            .verify(
                b"manifest",
                &DetachedSignature::from_bytes(b"sig".to_vec()),
                &fixture.trusted_signers(),
            )
            .expect_err("bad");

        assert!(matches!(err, VerificationError::BadSignature));
    }
}
