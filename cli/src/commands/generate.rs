//! `generate-manifest`: hash every release asset and write the manifest.

use super::{Context, sign, write_output};
use crate::cli::GenerateArgs;
use crate::error::{CliError, EXIT_SUCCESS, Result};
use crate::output::RunSummary;
use crate::registry::{RegistryClient, ReleaseApi};
use log::info;
use repo_trust::manifest::naming::signature_filename;
use repo_trust::manifest::{
    AssetDownloader, AssetLister, BuildRequest, ReleaseDescriptor, ReleaseRecord, build_manifest,
};
use repo_trust::timestamp::Timestamp;
use std::io::Write;

/// Run the subcommand against the live registry.
///
/// # Errors
///
/// Returns a [`CliError`] if configuration is missing, the release cannot
/// be read, any asset fails to hash, or the manifest cannot be written.
pub fn run(args: &GenerateArgs, ctx: &Context<'_>, out: &mut dyn Write) -> Result<i32> {
    let client = RegistryClient::from_config(ctx.config)?.with_retry(ctx.retry);
    let summary = generate(args, ctx, &client, &client, &client, out)?;
    ctx.finish(&summary, out)?;
    Ok(EXIT_SUCCESS)
}

/// Build and write the manifest using the given registry ports.
///
/// # Errors
///
/// See [`run`].
pub fn generate(
    args: &GenerateArgs,
    ctx: &Context<'_>,
    api: &dyn ReleaseApi,
    lister: &dyn AssetLister,
    downloader: &dyn AssetDownloader,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let repository = ctx.config.repository()?;
    let tag = ctx.config.release_tag()?;
    let server_url = ctx.config.server_url()?;
    ctx.annotations.section(out, "Generating manifest");

    let release = api
        .release_by_tag(tag)
        .map_err(|err| CliError::transfer("fetch release", err))?;
    let published_at = release
        .published_at
        .as_deref()
        .map(Timestamp::try_from)
        .transpose()?;
    let descriptor = ReleaseDescriptor {
        git_url: Some(format!(
            "{}/{}",
            server_url.as_str().trim_end_matches('/'),
            repository.full_name()
        )),
        repository: repository.clone(),
        release: ReleaseRecord {
            tag: release.tag_name.clone(),
            commit: ctx.config.commit_sha().to_owned(),
            published_at,
            release_id: release.id,
        },
    };
    info!(
        "generating manifest for {} release {}",
        repository.full_name(),
        release.tag_name
    );

    let request = BuildRequest {
        release: descriptor,
        generated_at: Timestamp::now(),
        retry: ctx.retry,
    };
    let built = build_manifest(&request, lister, downloader)?;
    let json = built
        .manifest
        .to_canonical_json()
        .map_err(|source| CliError::Manifest {
            path: args.output.clone(),
            source,
        })?;
    write_output(&args.output, json.as_bytes())?;
    info!(
        "wrote {} with {} artifacts",
        args.output, built.artifact_count
    );
    ctx.annotations.end_section(out);

    if args.sign {
        let signature = args
            .output
            .with_file_name(signature_filename(args.output.file_name().unwrap_or_default()));
        sign::sign_file(&args.output, &signature, ctx, out)?;
    }

    Ok(RunSummary {
        release: Some(release.tag_name),
        artifacts: Some(built.artifact_count),
        manifest: Some(args.output.clone()),
        ..RunSummary::success(repository.full_name())
    })
}
