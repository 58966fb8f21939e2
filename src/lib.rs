//! Trust protocol for release artifacts.
//!
//! The crate builds a content-addressed manifest of a release's assets,
//! signs it with a detached signature bound to the `repo-trust` namespace,
//! verifies signed manifests against a trusted signers list and the
//! repository identity, and classifies visitors by referrer to detect
//! repo squatting. Network access and git plumbing stay outside the crate,
//! behind the [`manifest::AssetLister`], [`manifest::AssetDownloader`],
//! [`squatting::AncestryOracle`] and [`command::CommandExecutor`] ports.

pub mod command;
pub mod digest;
pub mod error;
pub mod git_sha;
pub mod identity;
pub mod manifest;
pub mod retry;
pub mod signing;
pub mod squatting;
pub mod timestamp;
pub mod transfer;
pub mod verify;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use error::ValueError;
pub use identity::RepositoryIdentity;
pub use transfer::TransferError;
pub use verify::{VerificationError, VerifiedManifest, verify_manifest};
