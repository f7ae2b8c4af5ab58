//! Domain-specific error types for the configuration engine.
//!
//! Library layers return the typed errors below; command handlers at the CLI
//! boundary convert them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! EngineError
//! ├── Validation(ValidationError) — requested value violates a constraint
//! ├── Discovery                   — resource enumeration failed (operation-fatal)
//! ├── Store(StoreError)           — configuration store read/write/delete
//! ├── Exec(ExecError)             — external command could not run or timed out
//! └── Snapshot(SnapshotError)     — snapshot file I/O or corruption
//!
//! ReplaceError                    — locked-file replacement (deploy)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Guidance shown alongside every permission failure.
pub const ELEVATION_HINT: &str = "run hosttune from an elevated (Administrator) prompt";

/// Top-level error type for the configuration engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The requested value was rejected before any write was attempted.
    #[error("invalid value: {0}")]
    Validation(#[from] ValidationError),

    /// Resource enumeration failed as a whole.
    #[error("resource discovery failed: {reason}")]
    Discovery {
        /// Human-readable cause.
        reason: String,
    },

    /// A configuration store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An external command failed to run.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Snapshot persistence failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl EngineError {
    /// Return `true` if this error was caused by missing privileges.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Store(StoreError::PermissionDenied { .. }))
    }

    /// Actionable advice for the user, if there is any.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        if self.is_permission_denied() {
            Some(ELEVATION_HINT)
        } else {
            None
        }
    }
}

/// A requested setting value that violates the setting's declared constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The setting name is not part of the domain.
    #[error("unknown setting '{setting}'")]
    UnknownSetting {
        /// Setting name as requested.
        setting: String,
    },

    /// The value has the wrong type for the setting.
    #[error("{setting} expects {expected}, got '{value}'")]
    TypeMismatch {
        /// Setting name.
        setting: String,
        /// Declared kind of the setting.
        expected: String,
        /// Offending value, rendered.
        value: String,
    },

    /// An integer below the allowed minimum.
    #[error("{setting} = {value} is below the minimum of {min}")]
    BelowMinimum {
        /// Setting name.
        setting: String,
        /// Requested value.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
    },

    /// An integer above the allowed maximum.
    #[error("{setting} = {value} is above the maximum of {max}")]
    AboveMaximum {
        /// Setting name.
        setting: String,
        /// Requested value.
        value: i64,
        /// Inclusive upper bound.
        max: i64,
    },

    /// A string outside the enumerated set.
    #[error("{setting} = '{value}' is not one of: {allowed}")]
    NotAllowed {
        /// Setting name.
        setting: String,
        /// Requested value.
        value: String,
        /// Comma-separated allowed values.
        allowed: String,
    },
}

/// Errors raised by a [`ConfigStore`](crate::store::ConfigStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The write was refused by the operating system.
    #[error("permission denied writing {key}\\{name}")]
    PermissionDenied {
        /// Key or handle being written.
        key: String,
        /// Value name.
        name: String,
    },

    /// The key or value does not exist.
    #[error("{key}\\{name} not found")]
    NotFound {
        /// Key or handle.
        key: String,
        /// Value name.
        name: String,
    },

    /// The current value exists but could not be interpreted.
    #[error("cannot read {key}\\{name}: {reason}")]
    Unreadable {
        /// Key or handle.
        key: String,
        /// Value name.
        name: String,
        /// Why the value could not be read.
        reason: String,
    },

    /// The store does not support this operation (or this platform).
    #[error("operation '{operation}' is not supported by the {store} store")]
    Unsupported {
        /// Store name.
        store: &'static str,
        /// Operation name (e.g. `"delete"`).
        operation: &'static str,
    },

    /// Any other I/O failure from the backing store.
    #[error("store I/O error on {key}: {source}")]
    Io {
        /// Key or handle.
        key: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The store talks to a command that failed to run.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl StoreError {
    /// Map an I/O error from the backing store onto the typed taxonomy.
    #[must_use]
    pub fn from_io(key: &str, name: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                key: key.to_string(),
                name: name.to_string(),
            },
            std::io::ErrorKind::NotFound => Self::NotFound {
                key: key.to_string(),
                name: name.to_string(),
            },
            _ => Self::Io {
                key: key.to_string(),
                source,
            },
        }
    }
}

/// Errors from the command runner.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The timeout was zero.
    #[error("timeout for '{command}' must be positive")]
    InvalidTimeout {
        /// Command line, rendered.
        command: String,
    },

    /// The process could not be started.
    #[error("failed to execute '{command}': {source}")]
    Spawn {
        /// Command line, rendered.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The process exceeded its time budget and was terminated.
    #[error("'{command}' timed out after {}s", .after.as_secs())]
    Timeout {
        /// Command line, rendered.
        command: String,
        /// The budget that was exceeded.
        after: Duration,
    },

    /// Waiting on or talking to the process failed.
    #[error("I/O error while running '{command}': {source}")]
    Io {
        /// Command line, rendered.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors from snapshot persistence.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The snapshot file could not be read or written.
    #[error("snapshot I/O error on {}: {source}", .path.display())]
    Io {
        /// Snapshot file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot file exists but is not a valid snapshot document.
    #[error("snapshot {} is corrupt: {source}", .path.display())]
    Corrupt {
        /// Snapshot file path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

/// Errors from replacing a file that may be held open by a running process.
#[derive(Error, Debug)]
pub enum ReplaceError {
    /// Every deletion attempt failed, including after terminating holders.
    #[error("Cannot overwrite '{}'. Close the running .exe and try again", .path.display())]
    CannotOverwrite {
        /// Locked destination path.
        path: PathBuf,
        /// The last deletion error observed.
        source: std::io::Error,
    },

    /// Copying the replacement into place failed.
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        /// Source file.
        from: PathBuf,
        /// Destination file.
        to: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
