//! External command execution with a bounded time budget.
//!
//! Every system command the engine runs goes through the [`Executor`] trait so
//! that callers can be tested against a mock. [`SystemExecutor`] is the real
//! implementation: it pipes the optional scripted input to stdin, drains both
//! output streams on background threads, and kills the child once the timeout
//! elapses. Output is collected against the same deadline, so a grandchild
//! that keeps an inherited pipe open cannot stretch the call past it.
use std::fmt;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ExecError;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Read size for the output drain threads.
const CHUNK_SIZE: usize = 8192;

/// A program and its arguments, never interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name or path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Build a command line from a program and string-like arguments.
    #[must_use]
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the platform reported one.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Combined stdout and stderr, for marker matching.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            text.push('\n');
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Runs external commands.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run `cmd` to completion or until `timeout` elapses.
    ///
    /// `input`, when present, is written to the child's stdin followed by a
    /// newline and the pipe is closed.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::InvalidTimeout`] for a zero timeout,
    /// [`ExecError::Spawn`] if the program cannot be started, and
    /// [`ExecError::Timeout`] if the child was killed for running too long.
    fn execute(
        &self,
        cmd: &CommandLine,
        timeout: Duration,
        input: Option<&'static str>,
    ) -> Result<ExecResult, ExecError>;

    /// Check if a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// Executor backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(
        &self,
        cmd: &CommandLine,
        timeout: Duration,
        input: Option<&'static str>,
    ) -> Result<ExecResult, ExecError> {
        let label = cmd.to_string();
        if timeout.is_zero() {
            return Err(ExecError::InvalidTimeout { command: label });
        }
        let deadline = Instant::now() + timeout;

        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: label.clone(),
                source,
            })?;

        if let Some(line) = input
            && let Some(mut stdin) = child.stdin.take()
        {
            // A child that exits without reading stdin closes the pipe; that
            // is not an error worth surfacing.
            let _ = writeln!(stdin, "{line}");
        }

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_deadline(&mut child, deadline, timeout, &label)?;

        Ok(ExecResult {
            stdout: collect(stdout, deadline, &label),
            stderr: collect(stderr, deadline, &label),
            success: status.success(),
            code: status.code(),
        })
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

type Chunks = Option<mpsc::Receiver<Vec<u8>>>;

/// Forward everything read from `stream` as chunks until EOF.
///
/// The thread is detached: if a grandchild holds the pipe open it outlives
/// the call and ends when the pipe finally closes.
fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Chunks {
    stream.map(|mut s| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0_u8; CHUNK_SIZE];
            loop {
                match s.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let chunk = buf.get(..n).map(<[u8]>::to_vec).unwrap_or_default();
                        if tx.send(chunk).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        rx
    })
}

/// Gather chunks until the stream closes or `deadline` passes, whichever
/// comes first. Output still pending at the deadline is dropped.
fn collect(chunks: Chunks, deadline: Instant, label: &str) -> String {
    let mut bytes = Vec::new();
    if let Some(rx) = chunks {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(chunk) => bytes.extend_from_slice(&chunk),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::debug!("'{label}' exited but its output is still open; keeping what arrived");
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
    label: &str,
) -> Result<std::process::ExitStatus, ExecError> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::debug!("killed '{label}' after {}s", timeout.as_secs());
                return Err(ExecError::Timeout {
                    command: label.to_string(),
                    after: timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(ExecError::Io {
                    command: label.to_string(),
                    source,
                });
            }
        }
    }
}

/// Text fragments that classify command output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Markers {
    /// Any of these in the output means success.
    pub success: &'static [&'static str],
    /// Any of these in the output means failure; checked first.
    pub failure: &'static [&'static str],
}

/// Outcome of matching output against [`Markers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    /// A success marker matched and no failure marker did.
    Success,
    /// A failure marker matched.
    Failure,
    /// No marker matched; the caller falls back to the exit status.
    Unknown,
}

impl Markers {
    /// Classify `output` case-insensitively. Failure markers win over success.
    ///
    /// NUL bytes are dropped first: some system tools write UTF-16 even when
    /// their output is piped.
    #[must_use]
    pub fn classify(&self, output: &str) -> OutputStatus {
        let lower = output.replace('\0', "").to_lowercase();
        if self
            .failure
            .iter()
            .any(|m| lower.contains(&m.to_lowercase()))
        {
            OutputStatus::Failure
        } else if self
            .success
            .iter()
            .any(|m| lower.contains(&m.to_lowercase()))
        {
            OutputStatus::Success
        } else {
            OutputStatus::Unknown
        }
    }

    /// Whether a finished command counts as successful under these markers.
    #[must_use]
    pub fn judge(&self, result: &ExecResult) -> bool {
        match self.classify(&result.combined()) {
            OutputStatus::Success => true,
            OutputStatus::Failure => false,
            OutputStatus::Unknown => result.success,
        }
    }
}
