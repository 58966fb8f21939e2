//! `upload`: attach the manifest and signature to their release.

use super::{Context, read_input};
use crate::cli::UploadArgs;
use crate::error::{CliError, EXIT_SUCCESS, Result};
use crate::output::RunSummary;
use crate::registry::models::ReleaseInfo;
use crate::registry::{RegistryClient, ReleaseApi};
use log::{info, warn};
use repo_trust::manifest::naming::{MANIFEST_FILENAME, signature_filename};
use repo_trust::manifest::parse_manifest;
use std::io::Write;

const JSON_CONTENT_TYPE: &str = "application/json";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Run the subcommand.
///
/// # Errors
///
/// Returns a [`CliError`] if an input is missing, the manifest is invalid,
/// or an upload fails.
pub fn run(args: &UploadArgs, ctx: &Context<'_>, out: &mut dyn Write) -> Result<i32> {
    let client = RegistryClient::from_config(ctx.config)?.with_retry(ctx.retry);
    let summary = upload(args, ctx, &client, out)?;
    ctx.finish(&summary, out)?;
    Ok(EXIT_SUCCESS)
}

/// Upload both files through `api`.
///
/// The release is the one recorded in the manifest, so a manifest can never
/// be attached to a release it does not describe.
///
/// # Errors
///
/// See [`run`].
pub fn upload(
    args: &UploadArgs,
    ctx: &Context<'_>,
    api: &dyn ReleaseApi,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let repository = ctx.config.repository()?;
    let manifest_bytes = read_input(&args.manifest, "manifest", "run generate-manifest first")?;
    let signature_path = args.signature_path();
    let signature_bytes = read_input(&signature_path, "signature", "run sign first")?;
    let manifest = parse_manifest(&manifest_bytes).map_err(|source| CliError::Manifest {
        path: args.manifest.clone(),
        source,
    })?;

    let release = api
        .release(manifest.release().release_id)
        .map_err(|err| CliError::transfer("fetch release", err))?;

    ctx.annotations.section(out, "Uploading manifest");
    replace_asset(api, &release, MANIFEST_FILENAME, JSON_CONTENT_TYPE, &manifest_bytes)?;
    ctx.annotations.end_section(out);

    ctx.annotations.section(out, "Uploading signature");
    let signature_name = signature_filename(MANIFEST_FILENAME);
    replace_asset(api, &release, &signature_name, BINARY_CONTENT_TYPE, &signature_bytes)?;
    ctx.annotations.end_section(out);

    Ok(RunSummary {
        release: Some(release.tag_name),
        artifacts: Some(manifest.artifacts().len()),
        manifest: Some(args.manifest.clone()),
        ..RunSummary::success(repository.full_name())
    })
}

fn replace_asset(
    api: &dyn ReleaseApi,
    release: &ReleaseInfo,
    name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Result<()> {
    if let Some(existing) = release.asset_named(name) {
        info!("replacing existing asset {name}");
        if let Err(err) = api.delete_asset(existing.id) {
            warn!("could not delete existing asset {name}: {err}");
        }
    }
    let uploaded = api
        .upload_asset(release, name, content_type, bytes)
        .map_err(|err| CliError::transfer("upload release asset", err))?;
    info!("uploaded {} ({} bytes)", uploaded.name, uploaded.size);
    Ok(())
}
