//! Subcommand handlers and the shared setup they start from.
pub mod apply;
pub mod deploy;
pub mod list;
pub mod optimize;
pub mod restore;
pub mod status;
pub mod version;

use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::AppConfig;
use crate::error::ELEVATION_HINT;
use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::mutation::{MutationResult, ResourceOutcome};
use crate::platform;
use crate::tasks::Context;

/// Shared state produced by the common command setup sequence.
///
/// Loads configuration, applies command-line overrides and wires a
/// [`Context`] to the real system.
#[derive(Debug)]
pub struct CommandSetup {
    /// Context handed to the engine and the optimize steps.
    pub ctx: Context,
}

impl CommandSetup {
    /// Load configuration and build the context.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read, parsed or
    /// validated.
    pub fn init(global: &GlobalOpts, log: &Arc<Logger>) -> Result<Self> {
        let mut config = AppConfig::load(global.config.as_deref())?;
        if let Some(dir) = &global.state_dir {
            config.state_dir = Some(dir.clone());
        }
        log.debug(&format!("snapshots in {}", config.state_dir().display()));

        let executor: Arc<dyn Executor> = Arc::new(SystemExecutor);
        let ctx = Context::new(config, Arc::clone(log) as Arc<dyn Log>, executor);
        if !ctx.platform.is_windows() {
            log.warn(&format!(
                "hosttune targets Windows; registry and netsh operations are unavailable on {}",
                ctx.platform.os
            ));
        }
        Ok(Self { ctx })
    }

    /// Warn, without stopping, when the process is not elevated.
    pub fn warn_if_not_elevated(&self) {
        if !platform::is_elevated(self.ctx.executor.as_ref()) {
            self.ctx
                .log
                .warn(&format!("not running elevated; changes may fail ({ELEVATION_HINT})"));
        }
    }
}

/// Log each resource outcome and the `N of M succeeded` line.
pub fn report_mutation(log: &dyn Log, what: &str, result: &MutationResult) {
    for report in &result.reports {
        match &report.outcome {
            ResourceOutcome::Failed(_) => {
                log.warn(&format!("  {}: {}", report.label, report.outcome));
            }
            ResourceOutcome::Applied | ResourceOutcome::Skipped => {
                log.info(&format!("  {}: {}", report.label, report.outcome));
            }
        }
    }
    if let Some(path) = &result.snapshot {
        log.info(&format!("snapshot: {}", path.display()));
    }
    log.info(&format!("{what}: {}", result.summary()));
}
