//! `sign`: write a detached signature for a file.

use super::{Context, read_input, write_output};
use crate::cli::SignArgs;
use crate::error::{EXIT_SUCCESS, Result};
use crate::output::RunSummary;
use camino::Utf8Path;
use log::info;
use repo_trust::signing::SigningKeyRef;
use std::io::Write;

/// Run the subcommand.
///
/// # Errors
///
/// Returns a [`crate::error::CliError`] if the key or file is missing or
/// signing fails.
pub fn run(args: &SignArgs, ctx: &Context<'_>, out: &mut dyn Write) -> Result<i32> {
    let repository = ctx.config.repository()?;
    sign_file(&args.file, &args.signature_path(), ctx, out)?;
    let summary = RunSummary {
        manifest: Some(args.file.clone()),
        ..RunSummary::success(repository.full_name())
    };
    ctx.finish(&summary, out)?;
    Ok(EXIT_SUCCESS)
}

/// Sign `file` with the configured key and write the signature to
/// `signature`.
///
/// # Errors
///
/// Returns a [`crate::error::CliError`] if the key or file is missing or
/// signing fails.
pub fn sign_file(
    file: &Utf8Path,
    signature: &Utf8Path,
    ctx: &Context<'_>,
    out: &mut dyn Write,
) -> Result<()> {
    let key = SigningKeyRef::new(ctx.config.key_path()?);
    ctx.annotations.section(out, &format!("Signing {file}"));
    let message = read_input(
        file,
        "file to sign",
        "run generate-manifest first or pass the file to sign",
    )?;
    let scheme = ctx.scheme()?;
    let detached = scheme.sign(&message, &key)?;
    write_output(signature, detached.as_bytes())?;
    info!("wrote signature {signature}");
    ctx.annotations.end_section(out);
    Ok(())
}
