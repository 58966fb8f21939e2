//! `check-referrer`: run squatting detection for one visitor.
//!
//! Exits 0 for a verified origin, 1 for a warning and 3 when provenance
//! cannot be determined.

use super::Context;
use crate::cli::CheckReferrerArgs;
use crate::error::{EXIT_FAILURE, EXIT_INDETERMINATE, EXIT_SUCCESS, Result};
use crate::output::{describe_tick, write_decision, write_line};
use crate::registry::RegistryClient;
use log::debug;
use repo_trust::squatting::{
    AncestryOracle, CancellationToken, ExpectedRepository, RedirectCountdown, SquattingDetector,
    TrustDecision, TrustLevel,
};
use std::io::Write;
use std::thread;

/// Run the subcommand against the live registry.
///
/// # Errors
///
/// Returns a [`crate::error::CliError`] if the repository or source URL is
/// not configured correctly. Registry failures yield an indeterminate
/// decision rather than an error.
pub fn run(args: &CheckReferrerArgs, ctx: &Context<'_>, out: &mut dyn Write) -> Result<i32> {
    let client = RegistryClient::from_config(ctx.config)?.with_retry(ctx.retry);
    let decision = decide(args, ctx, &client)?;
    write_decision(out, &decision)?;
    if let (true, Some(plan)) = (args.countdown, decision.redirect.clone()) {
        let countdown = RedirectCountdown::new(plan, CancellationToken::new());
        let last = countdown.run(thread::sleep, |tick| write_line(out, &describe_tick(tick)));
        debug!("countdown finished: {last:?}");
    }
    Ok(exit_code_for(decision.level))
}

/// Evaluate `args.referrer` against the configured repository.
///
/// # Errors
///
/// See [`run`].
pub fn decide(
    args: &CheckReferrerArgs,
    ctx: &Context<'_>,
    oracle: &dyn AncestryOracle,
) -> Result<TrustDecision> {
    let expected = ExpectedRepository::new(
        ctx.config.repository()?,
        ctx.config.server_url()?.as_str(),
        ctx.config.pages_domain(),
    )?;
    Ok(SquattingDetector::new(&expected, oracle).evaluate(args.referrer.as_deref()))
}

/// Exit code for a decision level.
#[must_use]
pub fn exit_code_for(level: TrustLevel) -> i32 {
    match level {
        TrustLevel::Verified => EXIT_SUCCESS,
        TrustLevel::Warning => EXIT_FAILURE,
        TrustLevel::Indeterminate => EXIT_INDETERMINATE,
    }
}
