//! Operating system detection and the elevation check.
use std::fmt;
use std::time::Duration;

use crate::exec::{CommandLine, Executor};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    /// Linux and other Unix-likes.
    Linux,
    /// Microsoft Windows.
    Windows,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// Platform information for the current system.
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub const fn detect() -> Self {
        Self {
            os: if cfg!(target_os = "windows") {
                Os::Windows
            } else {
                Os::Linux
            },
        }
    }

    /// Whether the engine's stores and commands are available here.
    #[must_use]
    pub const fn is_windows(&self) -> bool {
        matches!(self.os, Os::Windows)
    }
}

/// Check whether the current process holds administrative privileges.
///
/// On Windows `net session` only succeeds from an elevated token; elsewhere
/// the effective uid is compared against root.
#[must_use]
pub fn is_elevated(executor: &dyn Executor) -> bool {
    let cmd = if cfg!(windows) {
        CommandLine::new("net", ["session"])
    } else {
        CommandLine::new("id", ["-u"])
    };
    match executor.execute(&cmd, Duration::from_secs(10), None) {
        Ok(result) if cfg!(windows) => result.success,
        Ok(result) => result.success && result.stdout.trim() == "0",
        Err(e) => {
            tracing::debug!("elevation check failed: {e}");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ExecError;
    use crate::exec::{ExecResult, MockExecutor};

    #[test]
    fn os_display() {
        assert_eq!(Os::Linux.to_string(), "linux");
        assert_eq!(Os::Windows.to_string(), "windows");
    }

    #[test]
    fn detect_matches_target() {
        assert_eq!(Platform::detect().is_windows(), cfg!(target_os = "windows"));
    }

    #[test]
    fn elevated_when_net_session_succeeds() {
        let mut exec = MockExecutor::new();
        exec.expect_execute().returning(|_, _, _| {
            Ok(ExecResult {
                stdout: "0\n".into(),
                success: true,
                code: Some(0),
                ..ExecResult::default()
            })
        });
        assert!(is_elevated(&exec));
    }

    #[test]
    fn not_elevated_when_net_session_fails() {
        let mut exec = MockExecutor::new();
        exec.expect_execute().returning(|cmd, _, _| {
            Err(ExecError::Spawn {
                command: cmd.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        });
        assert!(!is_elevated(&exec));
    }
}
