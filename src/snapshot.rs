//! Pre-change capture of setting values and its on-disk persistence.
//!
//! One snapshot document per domain lives at `<state_dir>/<domain>_backup.json`.
//! Each backup overwrites the previous one. Writes go through a temporary
//! file in the same directory followed by a rename, so a crash never leaves a
//! truncated document behind.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::resources::Scope;
use crate::setting::SettingValue;

/// The recorded state of one setting at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Captured {
    /// The value existed.
    Present {
        /// Value read from the store.
        value: SettingValue,
    },
    /// The value did not exist; restoring deletes it.
    Absent,
    /// The value could not be read; restoring skips it.
    Unreadable {
        /// Why the read failed.
        reason: String,
    },
}

/// Captured settings of one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeCapture {
    /// Where the settings live.
    pub scope: Scope,
    /// Setting name to captured state.
    pub settings: BTreeMap<String, Captured>,
}

/// A domain's captured configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the capture was taken.
    pub created_at: DateTime<Utc>,
    /// Domain name.
    pub domain: String,
    /// Scope label to captured settings.
    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeCapture>,
}

impl Snapshot {
    /// An empty snapshot for `domain` stamped with the current time.
    #[must_use]
    pub fn new(domain: &str) -> Self {
        Self {
            created_at: Utc::now(),
            domain: domain.to_string(),
            scopes: BTreeMap::new(),
        }
    }

    /// Add or replace the capture for a scope.
    pub fn insert(&mut self, capture: ScopeCapture) {
        self.scopes
            .insert(capture.scope.label().to_string(), capture);
    }
}

/// Directory-backed persistence of [`Snapshot`]s.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store snapshots under `dir` (created on first save).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the snapshots live in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path of `domain`'s snapshot.
    #[must_use]
    pub fn path_for(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}_backup.json"))
    }

    /// Persist `snapshot`, replacing any previous one for the same domain.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the directory or file cannot be
    /// written.
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, SnapshotError> {
        let path = self.path_for(&snapshot.domain);
        let io_err = |source| SnapshotError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;

        let json = serde_json::to_string_pretty(snapshot).map_err(|e| SnapshotError::Io {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        tracing::debug!("saved snapshot to {}", path.display());
        Ok(path)
    }

    /// Load `domain`'s snapshot. `Ok(None)` when none has been taken.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the file exists but cannot be read,
    /// and [`SnapshotError::Corrupt`] if it is not a valid snapshot.
    pub fn load(&self, domain: &str) -> Result<Option<Snapshot>, SnapshotError> {
        let path = self.path_for(domain);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no snapshot at {}", path.display());
                return Ok(None);
            }
            Err(source) => return Err(SnapshotError::Io { path, source }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| SnapshotError::Corrupt { path, source })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let mut snap = Snapshot::new("mtu");
        let mut settings = BTreeMap::new();
        settings.insert(
            "MTU".to_string(),
            Captured::Present {
                value: SettingValue::Integer(1500),
            },
        );
        snap.insert(ScopeCapture {
            scope: Scope::Resource {
                name: "Ethernet".into(),
                handle: "Ethernet".into(),
            },
            settings,
        });
        snap
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested"));
        let snap = sample();
        let path = store.save(&snap).unwrap();
        assert!(path.ends_with("mtu_backup.json"));
        assert_eq!(store.load("mtu").unwrap(), Some(snap));
    }

    #[test]
    fn save_overwrites_single_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        store.save(&sample()).unwrap();
        let mut second = Snapshot::new("mtu");
        second.insert(ScopeCapture {
            scope: Scope::Machine { key: "K".into() },
            settings: BTreeMap::new(),
        });
        store.save(&second).unwrap();
        let loaded = store.load("mtu").unwrap().unwrap();
        assert_eq!(loaded.scopes.keys().collect::<Vec<_>>(), ["machine"]);
        assert!(!dir.path().join("mtu_backup.json.tmp").exists());
    }

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(SnapshotStore::new(dir.path()).load("dns").unwrap(), None);
    }

    #[test]
    fn corrupt_snapshot_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        fs::write(store.path_for("dns"), "{ not json").unwrap();
        assert!(matches!(
            store.load("dns"),
            Err(SnapshotError::Corrupt { .. })
        ));
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["domain"], "mtu");
        assert_eq!(json["scopes"]["Ethernet"]["scope"]["kind"], "resource");
        assert_eq!(
            json["scopes"]["Ethernet"]["settings"]["MTU"]["state"],
            "present"
        );
        assert_eq!(
            json["scopes"]["Ethernet"]["settings"]["MTU"]["value"]["value"],
            1500
        );
    }

    #[test]
    fn absent_round_trips() {
        let captured = Captured::Absent;
        let json = serde_json::to_string(&captured).unwrap();
        assert_eq!(json, r#"{"state":"absent"}"#);
        assert_eq!(serde_json::from_str::<Captured>(&json).unwrap(), captured);
    }
}
