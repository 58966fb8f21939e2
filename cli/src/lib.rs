//! Repo Trust command-line interface.
//!
//! This crate wires the `repo_trust` core to the release registry, the
//! signing backends and the static-pages branch. The `repo-trust` binary
//! is a thin wrapper around [`commands::dispatch`].
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`commands`] - One module per subcommand
//! - [`config`] - Environment-derived configuration
//! - [`error`] - Error taxonomy and exit codes
//! - [`logging`] - `log` backend with CI annotations
//! - [`output`] - Run summaries and decision printing
//! - [`pages`] - Badge and page rendering and git publishing
//! - [`registry`] - Release registry HTTP client

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pages;
pub mod registry;
