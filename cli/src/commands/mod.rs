//! One module per subcommand.
//!
//! Each `run` function resolves what it needs from [`Context`], performs its
//! single top-level operation and returns the process exit code. Failures
//! abort the subcommand immediately.

pub mod check_referrer;
pub mod generate;
pub mod publish;
pub mod sign;
pub mod upload;
pub mod verify;

use crate::cli::Command;
use crate::config::{Config, SignerKind};
use crate::error::{CliError, Result};
use crate::logging::Annotations;
use crate::output::RunSummary;
use camino::Utf8Path;
use repo_trust::command::CommandExecutor;
use repo_trust::retry::RetryPolicy;
use repo_trust::signing::native::NativeScheme;
use repo_trust::signing::ssh_keygen::SshKeygenScheme;
use repo_trust::signing::{Namespace, SignatureScheme};
use std::fs;
use std::io::{self, Write};

/// Everything a subcommand may draw on.
pub struct Context<'a> {
    /// Environment configuration.
    pub config: &'a Config,
    /// CI annotation helpers.
    pub annotations: &'a Annotations,
    /// Runs `git` and `ssh-keygen`.
    pub executor: &'a dyn CommandExecutor,
    /// Retry policy for registry transfers.
    pub retry: RetryPolicy,
}

impl Context<'_> {
    /// The signature scheme selected by `REPO_TRUST_SIGNER`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown signer.
    pub fn scheme(&self) -> Result<Box<dyn SignatureScheme + '_>> {
        Ok(match self.config.signer()? {
            SignerKind::Native => Box::new(NativeScheme::new(Namespace::protocol())),
            SignerKind::SshKeygen => {
                Box::new(SshKeygenScheme::new(self.executor, Namespace::protocol()))
            }
        })
    }

    /// Print `summary` and record step outputs.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if step outputs cannot be written.
    pub fn finish(&self, summary: &RunSummary, out: &mut dyn Write) -> Result<()> {
        let path = self.config.output_file().unwrap_or_default();
        summary
            .emit(out, self.annotations)
            .map_err(|err| CliError::io(path, err))
    }
}

/// Run `command` and return the exit code.
///
/// # Errors
///
/// Returns the subcommand's failure.
pub fn dispatch(command: &Command, ctx: &Context<'_>, out: &mut dyn Write) -> Result<i32> {
    match command {
        Command::GenerateManifest(args) => generate::run(args, ctx, out),
        Command::Sign(args) => sign::run(args, ctx, out),
        Command::Verify(args) => verify::run(args, ctx, out),
        Command::Upload(args) => upload::run(args, ctx, out),
        Command::Publish(args) => publish::run(args, ctx, out),
        Command::CheckReferrer(args) => check_referrer::run(args, ctx, out),
    }
}

/// Read an input file, reporting a missing one with a hint.
pub(crate) fn read_input(path: &Utf8Path, what: &'static str, hint: &'static str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => CliError::MissingFile {
            what,
            path: path.to_owned(),
            hint,
        },
        _ => CliError::io(path, err),
    })
}

/// Write an output file.
pub(crate) fn write_output(path: &Utf8Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|err| CliError::io(path, err))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for subcommand tests.

    use super::*;
    use repo_trust::test_utils::StubExecutor;

    /// Configuration for `octo/widgets`; `vars` take precedence.
    pub fn config_with(vars: &[(&str, &str)]) -> Config {
        let mut all: Vec<(String, String)> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        all.push(("GITHUB_REPOSITORY".to_owned(), "octo/widgets".to_owned()));
        all.push(("GITHUB_TOKEN".to_owned(), "ghs_test".to_owned()));
        Config::from_lookup(move |name| {
            all.iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        })
    }

    /// Run `body` with a context over `config` and an idle executor.
    pub fn with_context<T>(config: &Config, body: impl FnOnce(&Context<'_>) -> T) -> T {
        let annotations = Annotations::default();
        let executor = StubExecutor::new(Vec::new());
        let ctx = Context {
            config,
            annotations: &annotations,
            executor: &executor,
            retry: RetryPolicy::immediate(1),
        };
        body(&ctx)
    }
}
