// Shared helpers for integration tests.
//
// Provides a scripted executor and a context builder over in-memory stores so
// each integration test can run the engine without touching the host.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hosttune::config::AppConfig;
use hosttune::error::ExecError;
use hosttune::exec::{CommandLine, ExecResult, Executor};
use hosttune::logging::{Log, Logger};
use hosttune::resources::handle::NET_CLASS_KEY;
use hosttune::resources::{Resource, StaticInventory};
use hosttune::store::MemoryStore;
use hosttune::tasks::Context;

/// Executor that succeeds for every program except the listed ones, and
/// remembers what it was asked to run.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    failing: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    /// Every command fails when its program is in `failing`.
    pub fn failing(programs: &[&'static str]) -> Self {
        Self {
            failing: programs.to_vec(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Command lines run so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Executor for ScriptedExecutor {
    fn execute(
        &self,
        cmd: &CommandLine,
        _timeout: Duration,
        _input: Option<&'static str>,
    ) -> Result<ExecResult, ExecError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd.to_string());
        }
        let ok = !self
            .failing
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&cmd.program));
        Ok(ExecResult {
            stdout: String::new(),
            stderr: if ok { String::new() } else { "Access is denied.".to_string() },
            success: ok,
            code: Some(i32::from(!ok)),
        })
    }

    fn which(&self, _program: &str) -> bool {
        true
    }
}

/// Adapter class key for device id `id`.
pub fn class_key(id: &str) -> String {
    format!(r"{NET_CLASS_KEY}\{id:0>4}")
}

/// Two up adapters, "Ethernet" (device 1) and "Wi-Fi" (device 2).
pub fn adapters() -> Vec<Resource> {
    vec![Resource::new("1", "Ethernet"), Resource::new("2", "Wi-Fi")]
}

/// Build a [`Context`] over in-memory backends with snapshots under
/// `state_dir`, returning the logger so tests can inspect recorded steps.
pub fn make_context(
    state_dir: &Path,
    executor: Arc<dyn Executor>,
    registry: Arc<MemoryStore>,
    netsh: Arc<MemoryStore>,
    resources: Vec<Resource>,
) -> (Context, Arc<Logger>) {
    let log = Arc::new(Logger::new("test"));
    let config = AppConfig {
        state_dir: Some(state_dir.to_path_buf()),
        ..AppConfig::default()
    };
    let ctx = Context::new(config, Arc::clone(&log) as Arc<dyn Log>, executor).with_backends(
        registry,
        netsh,
        Arc::new(StaticInventory::new(resources)),
    );
    (ctx, log)
}
