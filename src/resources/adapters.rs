//! Network adapter discovery through WMI.
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::{LinkStatus, Resource, ResourceInventory};
use crate::error::EngineError;
use crate::exec::{CommandLine, Executor};

/// WMI connection status codes that make an adapter eligible.
const ELIGIBLE_STATUSES: [u16; 2] = [1, 2];

const QUERY: &str = "Get-CimInstance -ClassName Win32_NetworkAdapter \
     | Where-Object { $_.NetConnectionID } \
     | Select-Object DeviceID,GUID,NetConnectionID,Name,NetConnectionStatus \
     | ConvertTo-Json -Compress";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WmiAdapter {
    #[serde(rename = "DeviceID")]
    device_id: String,
    #[serde(rename = "GUID", default)]
    guid: Option<String>,
    #[serde(rename = "NetConnectionID", default)]
    net_connection_id: Option<String>,
    #[serde(default)]
    net_connection_status: Option<u16>,
}

/// `ConvertTo-Json` emits a bare object for a single result.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(WmiAdapter),
    Many(Vec<WmiAdapter>),
}

/// [`ResourceInventory`] of physical network adapters.
///
/// Keeps adapters that have a connection id and a connection status of 1
/// (connecting) or 2 (connected); discovery order is preserved.
#[derive(Debug)]
pub struct AdapterInventory {
    executor: Arc<dyn Executor>,
    timeout: Duration,
}

impl AdapterInventory {
    /// Create an inventory that queries WMI through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }
}

impl ResourceInventory for AdapterInventory {
    fn discover(&self) -> Result<Vec<Resource>, EngineError> {
        let cmd = CommandLine::new(
            "powershell",
            ["-NoProfile", "-NonInteractive", "-Command", QUERY],
        );
        let result = self
            .executor
            .execute(&cmd, self.timeout, None)
            .map_err(|e| EngineError::Discovery {
                reason: e.to_string(),
            })?;
        if !result.success {
            return Err(EngineError::Discovery {
                reason: format!("adapter query failed: {}", result.stderr.trim()),
            });
        }
        parse_adapters(&result.stdout)
    }
}

/// Parse `ConvertTo-Json` output into eligible resources.
fn parse_adapters(json: &str) -> Result<Vec<Resource>, EngineError> {
    let json = json.trim();
    if json.is_empty() {
        return Ok(Vec::new());
    }
    let parsed: OneOrMany = serde_json::from_str(json).map_err(|e| EngineError::Discovery {
        reason: format!("unexpected adapter query output: {e}"),
    })?;
    let adapters = match parsed {
        OneOrMany::One(a) => vec![a],
        OneOrMany::Many(v) => v,
    };
    Ok(adapters
        .into_iter()
        .filter_map(|a| {
            let status = a.net_connection_status?;
            if !ELIGIBLE_STATUSES.contains(&status) {
                return None;
            }
            let name = a.net_connection_id.filter(|n| !n.trim().is_empty())?;
            Some(Resource {
                id: a.device_id,
                guid: a.guid.filter(|g| !g.is_empty()),
                name,
                status: if status == 2 {
                    LinkStatus::Up
                } else {
                    LinkStatus::Down
                },
                handle: None,
            })
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::{ExecResult, MockExecutor};

    const TWO: &str = r#"[
        {"DeviceID":"7","GUID":"{AAAA-1}","NetConnectionID":"Ethernet","Name":"Intel","NetConnectionStatus":2},
        {"DeviceID":"12","GUID":"{BBBB-2}","NetConnectionID":"Wi-Fi","Name":"Realtek","NetConnectionStatus":7},
        {"DeviceID":"3","GUID":null,"NetConnectionID":"Hotspot","Name":"Virtual","NetConnectionStatus":1}
    ]"#;

    #[test]
    fn filters_ineligible_statuses_and_keeps_order() {
        let resources = parse_adapters(TWO).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].name, "Ethernet");
        assert_eq!(resources[0].status, LinkStatus::Up);
        assert_eq!(resources[0].guid.as_deref(), Some("{AAAA-1}"));
        assert_eq!(resources[1].name, "Hotspot");
        assert_eq!(resources[1].status, LinkStatus::Down);
        assert_eq!(resources[1].guid, None);
    }

    #[test]
    fn single_object_is_accepted() {
        let json = r#"{"DeviceID":"1","GUID":"{X}","NetConnectionID":"Ethernet","Name":"n","NetConnectionStatus":2}"#;
        assert_eq!(parse_adapters(json).unwrap().len(), 1);
    }

    #[test]
    fn empty_output_is_zero_resources() {
        assert!(parse_adapters("  \r\n").unwrap().is_empty());
    }

    #[test]
    fn malformed_output_is_discovery_error() {
        assert!(matches!(
            parse_adapters("not json"),
            Err(EngineError::Discovery { .. })
        ));
    }

    #[test]
    fn failed_query_is_discovery_error() {
        let mut exec = MockExecutor::new();
        exec.expect_execute().returning(|_, _, _| {
            Ok(ExecResult {
                stderr: "Get-CimInstance : Access denied".into(),
                success: false,
                code: Some(1),
                ..ExecResult::default()
            })
        });
        let inv = AdapterInventory::new(Arc::new(exec), Duration::from_secs(30));
        assert!(matches!(
            inv.discover(),
            Err(EngineError::Discovery { .. })
        ));
    }
}
