//! External command execution behind a narrow port.
//!
//! Signing with `ssh-keygen` and publishing with `git` both shell out. They
//! go through [`CommandExecutor`] so tests can script the tools' responses.

use camino::{Utf8Path, Utf8PathBuf};
use std::io::{self, Read, Write};
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default timeout for external commands (5 minutes).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A fully described command invocation.
///
/// # Examples
///
/// ```
/// use repo_trust::command::Invocation;
///
/// let invocation = Invocation::new("git")
///     .args(["status", "--porcelain"])
///     .stdin(b"".to_vec());
/// assert_eq!(invocation.display(), "git status --porcelain");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Working directory, if different from the current one.
    pub cwd: Option<Utf8PathBuf>,
    /// Bytes written to the child's standard input.
    pub stdin: Option<Vec<u8>>,
    /// Time after which the child is killed.
    pub timeout: Duration,
}

impl Invocation {
    /// Start describing an invocation of `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: &Utf8Path) -> Self {
        self.cwd = Some(dir.to_owned());
        self
    }

    /// Feed `bytes` to standard input.
    #[must_use]
    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    /// Override the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program and arguments joined with spaces, for messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Run `invocation` to completion and return its captured output.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the program cannot be started, or one of
    /// kind [`io::ErrorKind::TimedOut`] if it outlives its timeout.
    fn run(&self, invocation: &Invocation) -> io::Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, invocation: &Invocation) -> io::Result<Output> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir.as_std_path());
        }

        let mut child = cmd.spawn()?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        if let (Some(mut input), Some(bytes)) = (child.stdin.take(), invocation.stdin.as_ref()) {
            // A child that exits without reading its input closes the pipe.
            match input.write_all(bytes) {
                Err(err) if err.kind() != io::ErrorKind::BrokenPipe => {
                    kill_quietly(&mut child);
                    return Err(err);
                }
                _ => {}
            }
        }

        match child.wait_timeout(invocation.timeout)? {
            Some(status) => Ok(Output {
                status,
                stdout: collect(stdout)?,
                stderr: collect(stderr)?,
            }),
            None => {
                kill_quietly(&mut child);
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!(
                        "{} timed out after {} seconds",
                        invocation.program,
                        invocation.timeout.as_secs()
                    ),
                ))
            }
        }
    }
}

/// Read a child pipe to the end on a helper thread so a chatty child never
/// blocks on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader thread panicked"))?,
    }
}

fn kill_quietly(child: &mut Child) {
    if child.kill().is_ok() {
        drop(child.wait());
    }
}

/// Human-readable, trimmed stderr of a finished command.
#[must_use]
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

/// Human-readable, trimmed stdout of a finished command.
#[must_use]
pub fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}
