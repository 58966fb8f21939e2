//! Publishing the verification page to the static-pages branch with git.
//!
//! The branch is treated as a single compare-and-swap slot: one push without
//! force, and on a non-fast-forward rejection one `pull --rebase` followed by
//! one more push. Only files under [`PAGES_DIR`] are touched.

use super::PagesFiles;
use crate::error::PublishError;
use crate::logging::redact;
use camino::Utf8Path;
use log::{debug, info, warn};
use repo_trust::command::{CommandExecutor, Invocation, stderr_text, stdout_text};
use repo_trust::identity::RepositoryIdentity;
use std::fs;
use std::io;
use std::process::Output;
use url::Url;

/// Reserved subdirectory on the pages branch.
pub const PAGES_DIR: &str = "repo-trust";

/// Badge filename inside [`PAGES_DIR`].
pub const BADGE_FILE: &str = "distribution.svg";

const GIT: &str = "git";
const BOT_NAME: &str = "repo-trust-bot";
const BOT_EMAIL: &str = "repo-trust@users.noreply.github.com";
const COMMIT_MESSAGE: &str = "Update Repo Trust verification badge";
const TOKEN_USER: &str = "x-access-token";

/// What a publish run changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A commit was pushed.
    Pushed,
    /// The rendered files matched the branch; nothing was pushed.
    Unchanged,
}

/// Where and as whom to publish.
#[derive(Debug, Clone)]
pub struct PublishTarget<'a> {
    /// Repository owning the pages branch.
    pub repository: &'a RepositoryIdentity,
    /// Source host base URL.
    pub server_url: &'a Url,
    /// Access token used for the push.
    pub token: &'a str,
    /// Pages branch name.
    pub branch: &'a str,
}

/// Authenticated remote URL for `target`.
///
/// # Errors
///
/// Returns [`PublishError::Git`] if credentials cannot be attached to the
/// server URL.
pub fn remote_url(target: &PublishTarget<'_>) -> Result<String, PublishError> {
    let mut url = target.server_url.clone();
    let invalid = || PublishError::Git {
        command: "remote".to_owned(),
        message: format!("cannot attach credentials to {}", target.server_url),
    };
    url.set_username(TOKEN_USER).map_err(|()| invalid())?;
    url.set_password(Some(target.token)).map_err(|()| invalid())?;
    let base = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!(
        "{base}/{}/{}.git",
        target.repository.owner(),
        target.repository.name()
    ));
    Ok(url.to_string())
}

/// Drives `git` through a [`CommandExecutor`].
pub struct GitPublisher<'a> {
    executor: &'a dyn CommandExecutor,
    program: String,
}

impl<'a> GitPublisher<'a> {
    /// Publish with the `git` found on `PATH`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self {
            executor,
            program: GIT.to_owned(),
        }
    }

    /// Publish `files` to `target` using the empty directory `workdir`.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] if any git step fails, the push is refused,
    /// or a racing publisher wins twice.
    pub fn publish(
        &self,
        target: &PublishTarget<'_>,
        files: &PagesFiles,
        workdir: &Utf8Path,
    ) -> Result<PublishOutcome, PublishError> {
        let session = Session {
            publisher: self,
            workdir,
            secret: target.token,
        };
        session.git(&["init", "-q"])?;
        session.git(&["config", "user.name", BOT_NAME])?;
        session.git(&["config", "user.email", BOT_EMAIL])?;
        session.git(&["remote", "add", "origin", &remote_url(target)?])?;

        let branch = target.branch;
        let listing = session.git(&["ls-remote", "--heads", "origin", branch])?;
        if stdout_text(&listing).is_empty() {
            info!("creating {branch} branch");
            session.git(&["checkout", "-q", "--orphan", branch])?;
            fs::write(workdir.join(".nojekyll"), b"")?;
            session.git(&["add", ".nojekyll"])?;
        } else {
            session.git(&["fetch", "-q", "origin", branch])?;
            session.git(&["checkout", "-q", "-b", branch, &format!("origin/{branch}")])?;
        }

        write_files(workdir, files)?;
        session.git(&["add", PAGES_DIR])?;
        let status = session.git(&["status", "--porcelain"])?;
        if stdout_text(&status).is_empty() {
            info!("verification page is already up to date");
            return Ok(PublishOutcome::Unchanged);
        }
        session.git(&["commit", "-q", "-m", COMMIT_MESSAGE])?;
        session.push(branch)?;
        Ok(PublishOutcome::Pushed)
    }
}

/// Write the rendered files into the reserved subdirectory of `workdir`.
///
/// # Errors
///
/// Returns an I/O error if the directory or a file cannot be written.
pub fn write_files(workdir: &Utf8Path, files: &PagesFiles) -> io::Result<()> {
    let dir = workdir.join(PAGES_DIR);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(BADGE_FILE), &files.badge)?;
    fs::write(dir.join("index.html"), &files.index)?;
    fs::write(dir.join("release-data.json"), &files.release_data)?;
    Ok(())
}

struct Session<'s, 'a> {
    publisher: &'s GitPublisher<'a>,
    workdir: &'s Utf8Path,
    secret: &'s str,
}

impl Session<'_, '_> {
    fn run(&self, args: &[&str]) -> Result<Output, PublishError> {
        let invocation = Invocation::new(self.publisher.program.as_str())
            .args(args.iter().copied())
            .current_dir(self.workdir);
        debug!("running {}", redact(&invocation.display(), self.secret));
        self.publisher
            .executor
            .run(&invocation)
            .map_err(|err| PublishError::Git {
                command: subcommand(args),
                message: redact(&err.to_string(), self.secret),
            })
    }

    fn git(&self, args: &[&str]) -> Result<Output, PublishError> {
        let output = self.run(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(PublishError::Git {
                command: subcommand(args),
                message: redact(&stderr_text(&output), self.secret),
            })
        }
    }

    fn push(&self, branch: &str) -> Result<(), PublishError> {
        let first = self.run(&["push", "origin", branch])?;
        if first.status.success() {
            return Ok(());
        }
        match classify_push_failure(branch, &redact(&stderr_text(&first), self.secret)) {
            PushFailure::Stale => {}
            PushFailure::Fatal(err) => return Err(err),
        }

        warn!("{branch} moved while publishing; rebasing once and retrying");
        self.git(&["pull", "-q", "--rebase", "origin", branch])?;
        let second = self.run(&["push", "origin", branch])?;
        if second.status.success() {
            return Ok(());
        }
        match classify_push_failure(branch, &redact(&stderr_text(&second), self.secret)) {
            PushFailure::Stale => Err(PublishError::Conflict {
                branch: branch.to_owned(),
            }),
            PushFailure::Fatal(err) => Err(err),
        }
    }
}

enum PushFailure {
    Stale,
    Fatal(PublishError),
}

fn classify_push_failure(branch: &str, message: &str) -> PushFailure {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("403") || lower.contains("denied to") {
        return PushFailure::Fatal(PublishError::PermissionDenied {
            branch: branch.to_owned(),
            message: message.to_owned(),
        });
    }
    if lower.contains("protected branch")
        || lower.contains("gh006")
        || lower.contains("pre-receive hook declined")
    {
        return PushFailure::Fatal(PublishError::Rejected {
            branch: branch.to_owned(),
            message: message.to_owned(),
        });
    }
    if lower.contains("non-fast-forward") || lower.contains("fetch first") {
        return PushFailure::Stale;
    }
    PushFailure::Fatal(PublishError::Git {
        command: "push".to_owned(),
        message: message.to_owned(),
    })
}

fn subcommand(args: &[&str]) -> String {
    args.first().copied().unwrap_or_default().to_owned()
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
