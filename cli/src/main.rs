//! Repo Trust CLI entrypoint.
//!
//! Parses arguments, loads configuration from the environment, installs the
//! logger and runs one subcommand. Errors become exit codes only here.

use clap::Parser;
use repo_trust::command::SystemCommandExecutor;
use repo_trust::retry::RetryPolicy;
use repo_trust_cli::cli::Cli;
use repo_trust_cli::commands::{Context, dispatch};
use repo_trust_cli::config::Config;
use repo_trust_cli::error::{CliError, Result};
use repo_trust_cli::logging::{ActionsLogger, Annotations};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let config = Config::from_env();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    install_logger(&config, &mut stderr);

    let annotations = Annotations::new(config.in_actions(), config.output_file());
    let run_result = run(&cli, &config, &annotations, &mut stdout);
    if run_result.is_err() && annotations.set_output("success", "false").is_err() {
        // Best-effort output; the error below is what matters.
    }
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn install_logger(config: &Config, stderr: &mut dyn Write) {
    let level = config.log_level();
    let mut logger = ActionsLogger::new(level.filter, config.in_actions());
    if let Ok(token) = config.token() {
        logger = logger.with_secret(token);
    }
    if logger.install().is_err() {
        write_stderr_line(stderr, "warning: a logger was already installed");
    }
    if let Some(raw) = level.unrecognised {
        log::warn!("unknown log level {raw:?}; using info");
    }
}

fn run(cli: &Cli, config: &Config, annotations: &Annotations, stdout: &mut dyn Write) -> Result<i32> {
    let executor = SystemCommandExecutor;
    let ctx = Context {
        config,
        annotations,
        executor: &executor,
        retry: RetryPolicy::default(),
    };
    dispatch(&cli.command, &ctx, stdout)
}

fn exit_code_for_run_result(result: Result<i32>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(code) => code,
        Err(err) => {
            report_error(&err, stderr);
            err.exit_code()
        }
    }
}

fn report_error(err: &CliError, stderr: &mut dyn Write) {
    log::error!("{err}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        log::debug!("caused by: {cause}");
        source = cause.source();
    }
    if let Some(hint) = err.hint() {
        write_stderr_line(stderr, format!("hint: {hint}"));
    }
    if log::max_level() == log::LevelFilter::Off {
        write_stderr_line(stderr, format!("error: {err}"));
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
