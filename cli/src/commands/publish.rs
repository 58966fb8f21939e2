//! `publish`: render the badge and page and push them to the pages branch.

use super::Context;
use crate::cli::PublishArgs;
use crate::error::{EXIT_SUCCESS, PublishError, Result};
use crate::output::{RunSummary, write_line};
use crate::pages::{GitPublisher, PagesFiles, PublishOutcome, PublishTarget, ReleaseData, badge_url};
use crate::registry::{RegistryClient, ReleaseApi};
use camino::Utf8PathBuf;
use log::{info, warn};
use repo_trust::transfer::TransferError;
use std::io::{self, Write};

/// Run the subcommand.
///
/// # Errors
///
/// Returns a [`crate::error::CliError`] if configuration is missing or the
/// push fails.
/// Release lookup failures only produce warnings.
pub fn run(args: &PublishArgs, ctx: &Context<'_>, out: &mut dyn Write) -> Result<i32> {
    let client = RegistryClient::from_config(ctx.config)?.with_retry(ctx.retry);
    let summary = publish(args, ctx, &client, out)?;
    ctx.finish(&summary, out)?;
    Ok(EXIT_SUCCESS)
}

/// Render and publish through `api` and the context's executor.
///
/// # Errors
///
/// See [`run`].
pub fn publish(
    args: &PublishArgs,
    ctx: &Context<'_>,
    api: &dyn ReleaseApi,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let repository = ctx.config.repository()?;
    let token = ctx.config.token()?;
    let server_url = ctx.config.server_url()?;
    ctx.annotations.mask_secret(out, token);

    ctx.annotations.section(out, "Collecting release data");
    let release = release_data(ctx, api);
    ctx.annotations.end_section(out);

    ctx.annotations.section(out, "Publishing verification page");
    let files = PagesFiles::render(args.status, &repository, &release)?;
    let scratch = tempfile::tempdir().map_err(PublishError::from)?;
    let workdir = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf()).map_err(|path| {
        PublishError::Io(io::Error::other(format!(
            "working directory {} is not valid UTF-8",
            path.display()
        )))
    })?;
    let target = PublishTarget {
        repository: &repository,
        server_url: &server_url,
        token,
        branch: ctx.config.pages_branch(),
    };
    let outcome = GitPublisher::new(ctx.executor).publish(&target, &files, &workdir)?;
    if outcome == PublishOutcome::Pushed {
        info!("published {} badge to {}", args.status, target.branch);
    }
    ctx.annotations.end_section(out);

    let url = badge_url(&repository, ctx.config.pages_domain());
    write_line(out, &format!("Badge URL: {url}"));
    write_line(out, "Add to your README:");
    write_line(out, &format!("  ![Repo Trust]({url})"));

    Ok(RunSummary {
        release: release.tag,
        artifacts: Some(release.assets.len()),
        badge_url: Some(url),
        ..RunSummary::success(repository.full_name())
    })
}

/// Release data for the page. Failures degrade to an empty release.
fn release_data(ctx: &Context<'_>, api: &dyn ReleaseApi) -> ReleaseData {
    let fetched = match ctx.config.release_tag_opt() {
        Some(tag) => api.release_by_tag(tag),
        None => api.latest_release(),
    };
    match fetched {
        Ok(release) => {
            let data = ReleaseData::from_release(&release);
            info!(
                "release {} has {} downloadable assets",
                release.tag_name,
                data.assets.len()
            );
            data
        }
        Err(TransferError::NotFound { .. }) => {
            warn!("No releases found; publishing the page without downloads");
            ReleaseData::default()
        }
        Err(err) => {
            warn!("could not fetch release data: {err}");
            ReleaseData::default()
        }
    }
}
