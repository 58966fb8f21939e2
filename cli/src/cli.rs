//! Command-line interface definitions.
//!
//! Inputs that identify the repository, release and keys come from the
//! environment (see [`crate::config`]); flags only select files and modes.

use crate::pages::BadgeStatus;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use repo_trust::manifest::naming::{MANIFEST_FILENAME, SIGNATURE_SUFFIX};

/// Sign release manifests and publish a verification badge.
#[derive(Parser, Debug)]
#[command(name = "repo-trust")]
#[command(version, about)]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  GITHUB_REPOSITORY           owner/name of the repository\n",
    "  GITHUB_TOKEN                registry access token\n",
    "  GITHUB_API_URL              REST API base URL\n",
    "  GITHUB_SERVER_URL           source host base URL\n",
    "  GITHUB_REF_NAME             release tag\n",
    "  GITHUB_SHA                  release commit\n",
    "  REPO_TRUST_KEY_PATH         private signing key\n",
    "  REPO_TRUST_ALLOWED_SIGNERS  trusted signers list\n",
    "  REPO_TRUST_SIGNER           native (default) or ssh-keygen\n",
    "  REPO_TRUST_LOG_LEVEL        debug, info, warning or error\n\n",
    "EXIT CODES:\n",
    "  0  success\n",
    "  1  failure\n",
    "  2  configuration error\n",
    "  3  check-referrer could not determine provenance",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Hash every release asset and write the manifest.
    GenerateManifest(GenerateArgs),

    /// Sign a file with the configured key.
    Sign(SignArgs),

    /// Verify a manifest, its signature and its repository identity.
    Verify(VerifyArgs),

    /// Upload the manifest and signature as release assets.
    Upload(UploadArgs),

    /// Publish the verification badge and page.
    Publish(PublishArgs),

    /// Classify a visitor's referrer and plan a redirect.
    CheckReferrer(CheckReferrerArgs),
}

/// Arguments for `generate-manifest`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    /// Where to write the manifest.
    #[arg(short, long, value_name = "PATH", default_value = MANIFEST_FILENAME)]
    pub output: Utf8PathBuf,

    /// Also sign the manifest once written.
    #[arg(long)]
    pub sign: bool,
}

/// Arguments for `sign`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SignArgs {
    /// File to sign.
    #[arg(value_name = "FILE", default_value = MANIFEST_FILENAME)]
    pub file: Utf8PathBuf,

    /// Signature destination [default: FILE with `.sig` appended].
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,
}

impl SignArgs {
    /// Where the signature is written.
    #[must_use]
    pub fn signature_path(&self) -> Utf8PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from(format!("{}{SIGNATURE_SUFFIX}", self.file)))
    }
}

/// Arguments for `verify`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct VerifyArgs {
    /// Manifest to verify.
    #[arg(short, long, value_name = "PATH", default_value = MANIFEST_FILENAME)]
    pub manifest: Utf8PathBuf,

    /// Detached signature [default: manifest path with `.sig` appended].
    #[arg(short, long, value_name = "PATH")]
    pub signature: Option<Utf8PathBuf>,

    /// Download the manifest and signature from the configured release first.
    #[arg(long)]
    pub from_release: bool,
}

impl VerifyArgs {
    /// Where the signature is read from.
    #[must_use]
    pub fn signature_path(&self) -> Utf8PathBuf {
        signature_beside(&self.manifest, self.signature.as_ref())
    }
}

/// Arguments for `upload`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct UploadArgs {
    /// Manifest to upload.
    #[arg(short, long, value_name = "PATH", default_value = MANIFEST_FILENAME)]
    pub manifest: Utf8PathBuf,

    /// Signature to upload [default: manifest path with `.sig` appended].
    #[arg(short, long, value_name = "PATH")]
    pub signature: Option<Utf8PathBuf>,
}

impl UploadArgs {
    /// Where the signature is read from.
    #[must_use]
    pub fn signature_path(&self) -> Utf8PathBuf {
        signature_beside(&self.manifest, self.signature.as_ref())
    }
}

/// Arguments for `publish`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PublishArgs {
    /// Badge variant to publish.
    #[arg(long, value_enum, default_value_t = BadgeStatus::Verified)]
    pub status: BadgeStatus,
}

/// Arguments for `check-referrer`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CheckReferrerArgs {
    /// The referring URL, if the visitor sent one.
    #[arg(long, value_name = "URL")]
    pub referrer: Option<String>,

    /// Run the redirect countdown in real time after deciding.
    #[arg(long)]
    pub countdown: bool,
}

fn signature_beside(manifest: &Utf8Path, explicit: Option<&Utf8PathBuf>) -> Utf8PathBuf {
    explicit
        .cloned()
        .unwrap_or_else(|| Utf8PathBuf::from(format!("{manifest}{SIGNATURE_SUFFIX}")))
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
