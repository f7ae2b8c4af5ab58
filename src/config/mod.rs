//! Application configuration: an optional `hosttune.toml` plus defaults.
pub mod toml_loader;

use anyhow::{Context as _, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domains::{Domain, MAX_MTU, MIN_MTU};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "hosttune.toml";

/// Environment variable overriding the default snapshot directory.
pub const STATE_DIR_ENV: &str = "HOSTTUNE_STATE_DIR";

/// Tunables read from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Snapshot directory; resolved by [`AppConfig::state_dir`] when unset.
    pub state_dir: Option<PathBuf>,
    /// Percentage of optimize steps that must succeed.
    pub threshold_percent: u32,
    /// DNS preset applied by `optimize`.
    pub dns_preset: String,
    /// MTU applied by `optimize`.
    pub mtu: i64,
    /// Timeout for commands that do not declare their own.
    pub command_timeout_secs: u64,
    /// Optimize steps to leave out.
    pub skip: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: None,
            threshold_percent: 80,
            dns_preset: "cloudflare".to_string(),
            mtu: 1450,
            command_timeout_secs: 30,
            skip: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `hosttune.toml` in the
    /// working directory is used if present, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = match path {
            Some(p) => {
                if !p.exists() {
                    bail!("config file not found: {}", p.display());
                }
                toml_loader::load_config(p)?
            }
            None => toml_loader::load_config(Path::new(DEFAULT_CONFIG_FILE))?,
        };
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.threshold_percent) {
            bail!(
                "threshold_percent must be between 1 and 100, got {}",
                self.threshold_percent
            );
        }
        if self.command_timeout_secs == 0 {
            bail!("command_timeout_secs must be positive");
        }
        if !(MIN_MTU..=MAX_MTU).contains(&self.mtu) {
            bail!(
                "mtu must be between {MIN_MTU} and {MAX_MTU}, got {}",
                self.mtu
            );
        }
        if Domain::Dns.spec().preset(&self.dns_preset).is_none() {
            bail!("unknown dns_preset '{}'", self.dns_preset);
        }
        Ok(())
    }

    /// Snapshot directory: the configured one, else `$HOSTTUNE_STATE_DIR`,
    /// else `~/.hosttune/snapshots`.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(STATE_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }
        home_dir().join(".hosttune").join("snapshots")
    }

    /// Default command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

fn home_dir() -> PathBuf {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var(var)
        .or_else(|_| std::env::var("HOME"))
        .map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::logging::TEST_ENV_MUTEX;

    fn write(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("hosttune.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.threshold_percent, 80);
        assert_eq!(config.dns_preset, "cloudflare");
        assert_eq!(config.mtu, 1450);
        assert_eq!(config.command_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "threshold_percent = 90\nskip = [\"system-repair\"]\n");
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.threshold_percent, 90);
        assert_eq!(config.skip, ["system-repair"]);
        assert_eq!(config.mtu, 1450);
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn unknown_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "treshold_percent = 90\n");
        assert!(AppConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn threshold_bounds() {
        for (value, ok) in [(0, false), (1, true), (100, true), (101, false)] {
            let config = AppConfig {
                threshold_percent: value,
                ..AppConfig::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "threshold {value}");
        }
    }

    #[test]
    fn mtu_and_preset_validated() {
        let config = AppConfig {
            mtu: 9001,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
        let config = AppConfig {
            dns_preset: "nextdns".into(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("nextdns"));
    }

    #[test]
    fn state_dir_precedence() {
        let _guard = TEST_ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let explicit = AppConfig {
            state_dir: Some(PathBuf::from("/explicit")),
            ..AppConfig::default()
        };
        // SAFETY: Protected by TEST_ENV_MUTEX; restored before lock is released.
        #[allow(unsafe_code)]
        unsafe {
            std::env::set_var(STATE_DIR_ENV, "/from-env");
        }
        assert_eq!(explicit.state_dir(), PathBuf::from("/explicit"));
        assert_eq!(AppConfig::default().state_dir(), PathBuf::from("/from-env"));
        // SAFETY: Still under TEST_ENV_MUTEX.
        #[allow(unsafe_code)]
        unsafe {
            std::env::remove_var(STATE_DIR_ENV);
        }
        assert!(
            AppConfig::default()
                .state_dir()
                .ends_with(Path::new(".hosttune").join("snapshots"))
        );
    }
}
