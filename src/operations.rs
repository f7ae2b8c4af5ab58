//! Filesystem and process abstractions for replacing a locked executable.
//!
//! Provides the [`FileSystemOps`] and [`ProcessTerminator`] traits so that the
//! retry loop in [`remove_locked_file`] can be unit-tested without touching
//! real files or processes. Production code uses [`SystemFileSystemOps`] and
//! [`SystemProcessTerminator`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ReplaceError;
use crate::exec::{CommandLine, Executor};
use crate::logging::Log;

/// Abstraction over the filesystem calls used during replacement.
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Remove the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails (commonly `PermissionDenied` while
    /// another process holds the file open).
    fn remove(&self, path: &Path) -> std::io::Result<()>;

    /// Copy `from` to `to`, overwriting `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn copy(&self, from: &Path, to: &Path) -> std::io::Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }
}

/// Finds and terminates processes by image name.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessTerminator: Send + Sync + std::fmt::Debug {
    /// PIDs of running processes whose image name is `image`.
    fn running_instances(&self, image: &str) -> Vec<u32>;

    /// Forcefully terminate `pid` and its children. Returns `true` on success.
    fn terminate(&self, pid: u32) -> bool;
}

/// [`ProcessTerminator`] backed by `tasklist`/`taskkill` on Windows and
/// `pgrep`/`kill` elsewhere.
#[derive(Debug)]
pub struct SystemProcessTerminator {
    executor: Arc<dyn Executor>,
}

impl SystemProcessTerminator {
    /// Create a terminator that runs its commands through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    const TIMEOUT: Duration = Duration::from_secs(15);
}

impl ProcessTerminator for SystemProcessTerminator {
    fn running_instances(&self, image: &str) -> Vec<u32> {
        let cmd = if cfg!(windows) {
            CommandLine::new(
                "tasklist",
                [
                    "/FI".to_string(),
                    format!("IMAGENAME eq {image}"),
                    "/FO".to_string(),
                    "CSV".to_string(),
                    "/NH".to_string(),
                ],
            )
        } else {
            CommandLine::new("pgrep", ["-x", image])
        };
        match self.executor.execute(&cmd, Self::TIMEOUT, None) {
            Ok(result) if cfg!(windows) => parse_tasklist_csv(&result.stdout),
            Ok(result) => result
                .stdout
                .lines()
                .filter_map(|l| l.trim().parse().ok())
                .collect(),
            Err(e) => {
                tracing::debug!("process lookup for {image} failed: {e}");
                Vec::new()
            }
        }
    }

    fn terminate(&self, pid: u32) -> bool {
        let pid = pid.to_string();
        let cmd = if cfg!(windows) {
            CommandLine::new("taskkill", ["/F", "/T", "/PID", pid.as_str()])
        } else {
            CommandLine::new("kill", ["-9", pid.as_str()])
        };
        self.executor
            .execute(&cmd, Self::TIMEOUT, None)
            .is_ok_and(|r| r.success)
    }
}

/// Extract PIDs from `tasklist /FO CSV /NH` output.
///
/// Each row looks like `"name.exe","1234","Console","1","10,000 K"`; the
/// "no tasks" info line has no second column and is ignored.
fn parse_tasklist_csv(output: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|line| line.split("\",\"").nth(1))
        .filter_map(|pid| pid.trim_matches('"').parse().ok())
        .collect()
}

/// Retry schedule for deleting a file that may be locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total deletion attempts (at least one is always made).
    pub attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 12,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Delete `path`, retrying while it is locked.
///
/// After the first failed attempt every other running instance of the same
/// image name is terminated once; deletion is then retried on the fixed
/// backoff until the policy is exhausted. A missing file is success.
///
/// # Errors
///
/// Returns [`ReplaceError::CannotOverwrite`] carrying the last I/O error when
/// every attempt fails.
pub fn remove_locked_file(
    path: &Path,
    fs: &dyn FileSystemOps,
    terminator: &dyn ProcessTerminator,
    policy: RetryPolicy,
    log: &dyn Log,
) -> Result<(), ReplaceError> {
    if !fs.exists(path) {
        return Ok(());
    }

    let attempts = policy.attempts.max(1);
    let mut escalated = false;
    let mut last_error = None;

    for attempt in 1..=attempts {
        match fs.remove(path) {
            Ok(()) => {
                log.debug(&format!("removed {} (attempt {attempt})", path.display()));
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                log.debug(&format!(
                    "attempt {attempt}/{attempts} to remove {} failed: {e}",
                    path.display()
                ));
                last_error = Some(e);
            }
        }

        if !escalated {
            escalated = true;
            terminate_holders(path, terminator, log);
        }
        if attempt < attempts && !policy.backoff.is_zero() {
            std::thread::sleep(policy.backoff);
        }
    }

    Err(ReplaceError::CannotOverwrite {
        path: path.to_path_buf(),
        source: last_error.unwrap_or_else(|| std::io::Error::other("file is locked")),
    })
}

fn terminate_holders(path: &Path, terminator: &dyn ProcessTerminator, log: &dyn Log) {
    let Some(image) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let own = std::process::id();
    let pids: Vec<u32> = terminator
        .running_instances(image)
        .into_iter()
        .filter(|&pid| pid != own)
        .collect();
    if pids.is_empty() {
        log.debug(&format!("no running {image} instances to terminate"));
        return;
    }
    log.warn(&format!(
        "{} is locked; terminating {} running instance(s)",
        path.display(),
        pids.len()
    ));
    for pid in pids {
        if !terminator.terminate(pid) {
            log.warn(&format!("failed to terminate pid {pid}"));
        }
    }
}

/// Replace `to` with a copy of `from`, clearing a locked destination first.
///
/// # Errors
///
/// Returns [`ReplaceError`] if the destination cannot be removed or the copy
/// fails.
pub fn replace_file(
    from: &Path,
    to: &Path,
    fs: &dyn FileSystemOps,
    terminator: &dyn ProcessTerminator,
    policy: RetryPolicy,
    log: &dyn Log,
) -> Result<(), ReplaceError> {
    remove_locked_file(to, fs, terminator, policy, log)?;
    fs.copy(from, to).map_err(|source| ReplaceError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Mock [`FileSystemOps`] for unit tests.
///
/// The file at every configured path exists until removed; `remove` fails
/// with `PermissionDenied` for the first `locked_for` calls.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockFileSystemOps {
    existing: std::sync::Mutex<std::collections::HashSet<std::path::PathBuf>>,
    locked_for: u32,
    remove_calls: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MockFileSystemOps {
    /// Create an empty mock with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as an existing file.
    #[must_use]
    pub fn with_file(self, path: impl Into<std::path::PathBuf>) -> Self {
        self.existing
            .lock()
            .expect("mock existing set poisoned")
            .insert(path.into());
        self
    }

    /// Fail the first `n` removals with `PermissionDenied`.
    #[must_use]
    pub const fn locked_for(mut self, n: u32) -> Self {
        self.locked_for = n;
        self
    }

    /// Number of `remove` calls made so far.
    pub fn remove_calls(&self) -> u32 {
        self.remove_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl FileSystemOps for MockFileSystemOps {
    fn exists(&self, path: &Path) -> bool {
        self.existing
            .lock()
            .expect("mock existing set poisoned")
            .contains(path)
    }

    fn remove(&self, path: &Path) -> std::io::Result<()> {
        let call = self
            .remove_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if call < self.locked_for {
            return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        }
        self.existing
            .lock()
            .expect("mock existing set poisoned")
            .remove(path);
        Ok(())
    }

    fn copy(&self, _from: &Path, to: &Path) -> std::io::Result<()> {
        self.existing
            .lock()
            .expect("mock existing set poisoned")
            .insert(to.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::exec::{ExecResult, MockExecutor};
    use crate::logging::test_helpers::RecordingLog;
    use mockall::predicate::eq;

    const TARGET: &str = "dist/hosttune.exe";

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::ZERO,
        }
    }

    #[test]
    fn default_policy_is_twelve_by_half_second() {
        let p = RetryPolicy::default();
        assert_eq!(p.attempts, 12);
        assert_eq!(p.backoff, Duration::from_millis(500));
    }

    #[test]
    fn missing_file_is_success_without_attempts() {
        let fs = MockFileSystemOps::new();
        let mut term = MockProcessTerminator::new();
        term.expect_running_instances().never();
        let log = RecordingLog::default();
        remove_locked_file(Path::new(TARGET), &fs, &term, fast(3), &log).unwrap();
        assert_eq!(fs.remove_calls(), 0);
    }

    #[test]
    fn unlocked_file_removed_first_try() {
        let fs = MockFileSystemOps::new().with_file(TARGET);
        let mut term = MockProcessTerminator::new();
        term.expect_running_instances().never();
        let log = RecordingLog::default();
        remove_locked_file(Path::new(TARGET), &fs, &term, fast(12), &log).unwrap();
        assert_eq!(fs.remove_calls(), 1);
        assert!(!fs.exists(Path::new(TARGET)));
    }

    #[test]
    fn locked_file_terminates_once_then_succeeds() {
        let fs = MockFileSystemOps::new().with_file(TARGET).locked_for(3);
        let mut term = MockProcessTerminator::new();
        term.expect_running_instances()
            .with(eq("hosttune.exe"))
            .times(1)
            .returning(|_| vec![4242]);
        term.expect_terminate()
            .with(eq(4242))
            .times(1)
            .returning(|_| true);
        let log = RecordingLog::default();
        remove_locked_file(Path::new(TARGET), &fs, &term, fast(12), &log).unwrap();
        assert_eq!(fs.remove_calls(), 4);
        assert_eq!(log.at("warn").len(), 1);
    }

    #[test]
    fn exhausted_retries_fail_with_cannot_overwrite() {
        let fs = MockFileSystemOps::new().with_file(TARGET).locked_for(u32::MAX);
        let mut term = MockProcessTerminator::new();
        term.expect_running_instances()
            .times(1)
            .returning(|_| vec![7, 8]);
        term.expect_terminate().times(2).returning(|_| false);
        let log = RecordingLog::default();
        let err = remove_locked_file(Path::new(TARGET), &fs, &term, fast(12), &log).unwrap_err();
        assert_eq!(fs.remove_calls(), 12);
        assert!(matches!(err, ReplaceError::CannotOverwrite { .. }));
        assert!(err.to_string().contains("Close the running .exe"));
        // one escalation warning plus one per failed kill
        assert_eq!(log.at("warn").len(), 3);
    }

    #[test]
    fn own_process_is_never_terminated() {
        let own = std::process::id();
        let fs = MockFileSystemOps::new().with_file(TARGET).locked_for(1);
        let mut term = MockProcessTerminator::new();
        term.expect_running_instances()
            .returning(move |_| vec![own]);
        term.expect_terminate().never();
        let log = RecordingLog::default();
        remove_locked_file(Path::new(TARGET), &fs, &term, fast(2), &log).unwrap();
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let fs = MockFileSystemOps::new().with_file(TARGET);
        let term = MockProcessTerminator::new();
        let log = RecordingLog::default();
        remove_locked_file(Path::new(TARGET), &fs, &term, fast(0), &log).unwrap();
        assert_eq!(fs.remove_calls(), 1);
    }

    #[test]
    fn replace_file_copies_after_removal() {
        let fs = MockFileSystemOps::new().with_file(TARGET).locked_for(1);
        let mut term = MockProcessTerminator::new();
        term.expect_running_instances().returning(|_| vec![]);
        let log = RecordingLog::default();
        replace_file(
            Path::new("target/release/hosttune.exe"),
            Path::new(TARGET),
            &fs,
            &term,
            fast(3),
            &log,
        )
        .unwrap();
        assert!(fs.exists(Path::new(TARGET)));
    }

    #[test]
    fn parse_tasklist_csv_rows() {
        let out = "\"hosttune.exe\",\"1234\",\"Console\",\"1\",\"10,000 K\"\r\n\
                   \"hosttune.exe\",\"5678\",\"Console\",\"1\",\"9,000 K\"\r\n";
        assert_eq!(parse_tasklist_csv(out), vec![1234, 5678]);
    }

    #[test]
    fn parse_tasklist_no_match_line() {
        let out = "INFO: No tasks are running which match the specified criteria.\r\n";
        assert!(parse_tasklist_csv(out).is_empty());
    }

    #[test]
    fn system_terminator_reports_kill_result() {
        let mut exec = MockExecutor::new();
        exec.expect_execute().returning(|_, _, _| {
            Ok(ExecResult {
                success: true,
                code: Some(0),
                ..ExecResult::default()
            })
        });
        let term = SystemProcessTerminator::new(Arc::new(exec));
        assert!(term.terminate(99));
    }

    #[test]
    fn real_filesystem_remove_and_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("new.exe");
        let dst = dir.path().join("old.exe");
        std::fs::write(&src, b"new").unwrap();
        std::fs::write(&dst, b"old").unwrap();
        let log = RecordingLog::default();
        let term = MockProcessTerminator::new();
        replace_file(&src, &dst, &SystemFileSystemOps, &term, fast(1), &log).unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"new");
    }
}
