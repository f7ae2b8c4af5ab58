use std::sync::Arc;
use std::time::Duration;

use super::ConfigStore;
use crate::error::StoreError;
use crate::exec::{CommandLine, ExecResult, Executor};
use crate::setting::SettingValue;

/// The only value name this store understands.
pub const MTU_VALUE: &str = "MTU";

/// [`ConfigStore`] for per-interface IPv4 MTU through `netsh`.
///
/// Keys are interface names (`Ethernet`, `Wi-Fi`); the only supported value
/// name is [`MTU_VALUE`]. Writes are persistent. `delete` is unsupported
/// because an interface always has an MTU.
#[derive(Debug)]
pub struct NetshStore {
    executor: Arc<dyn Executor>,
    timeout: Duration,
}

impl NetshStore {
    const NAME: &'static str = "netsh";

    /// Create a store that runs `netsh` through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    fn show(&self, interface: &str) -> Result<ExecResult, StoreError> {
        let cmd = CommandLine::new(
            "netsh",
            ["interface", "ipv4", "show", "subinterface", interface],
        );
        Ok(self.executor.execute(&cmd, self.timeout, None)?)
    }

    fn check_name(name: &str) -> Result<(), StoreError> {
        if name.eq_ignore_ascii_case(MTU_VALUE) {
            Ok(())
        } else {
            Err(StoreError::Unsupported {
                store: Self::NAME,
                operation: "non-MTU value",
            })
        }
    }
}

/// Map a failed `netsh` run onto the store error taxonomy.
fn classify_failure(key: &str, name: &str, result: &ExecResult) -> StoreError {
    let text = result.combined().to_lowercase();
    let kind = if text.contains("access is denied") || text.contains("elevation") {
        std::io::ErrorKind::PermissionDenied
    } else if text.contains("element not found") || text.contains("not found") {
        std::io::ErrorKind::NotFound
    } else {
        std::io::ErrorKind::Other
    };
    StoreError::from_io(
        key,
        name,
        std::io::Error::new(kind, result.combined().trim().to_string()),
    )
}

/// Pull the MTU column out of `show subinterface` output.
///
/// The table has a dashed separator line; the first data row after it starts
/// with the MTU. Header text is localised, so only the shape is relied on.
fn parse_mtu(output: &str) -> Option<i64> {
    output
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("---"))
        .skip(1)
        .find_map(|l| l.split_whitespace().next()?.parse().ok())
}

impl ConfigStore for NetshStore {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read(&self, key: &str, name: &str) -> Result<Option<SettingValue>, StoreError> {
        Self::check_name(name)?;
        let result = self.show(key)?;
        if !result.success {
            return Err(classify_failure(key, name, &result));
        }
        parse_mtu(&result.stdout)
            .map(|mtu| Some(SettingValue::Integer(mtu)))
            .ok_or_else(|| StoreError::Unreadable {
                key: key.to_string(),
                name: name.to_string(),
                reason: "no MTU in netsh output".to_string(),
            })
    }

    fn write(&self, key: &str, name: &str, value: &SettingValue) -> Result<(), StoreError> {
        Self::check_name(name)?;
        let cmd = CommandLine::new(
            "netsh",
            [
                "interface".to_string(),
                "ipv4".to_string(),
                "set".to_string(),
                "subinterface".to_string(),
                key.to_string(),
                format!("mtu={}", value.as_text()),
                "store=persistent".to_string(),
            ],
        );
        let result = self.executor.execute(&cmd, self.timeout, None)?;
        if result.success {
            Ok(())
        } else {
            Err(classify_failure(key, name, &result))
        }
    }

    fn delete(&self, _key: &str, _name: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported {
            store: Self::NAME,
            operation: "delete",
        })
    }

    fn key_exists(&self, key: &str) -> bool {
        self.show(key).is_ok_and(|r| r.success)
    }
}
