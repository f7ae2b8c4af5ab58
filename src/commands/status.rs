//! Command: show the current values of a domain.
use std::sync::Arc;

use anyhow::Result;

use super::CommandSetup;
use crate::cli::{GlobalOpts, StatusOpts};
use crate::logging::Logger;
use crate::mutation::StatusReport;
use crate::snapshot::Captured;

/// Run the status command.
///
/// # Errors
///
/// Returns an error if configuration loading or adapter discovery fails.
pub fn run(global: &GlobalOpts, opts: &StatusOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    log.stage(&format!("{} status", opts.domain.spec().title));
    let reports = setup.ctx.engine(opts.domain).status(opts.adapter.as_deref())?;
    if reports.is_empty() {
        log.info("nothing to show");
    }
    for report in &reports {
        for line in render(report) {
            log.info(&line);
        }
    }
    Ok(())
}

/// Lines describing one scope.
#[must_use]
pub fn render(report: &StatusReport) -> Vec<String> {
    let Some(handle) = &report.handle else {
        return vec![format!("{}: no configuration key", report.label)];
    };
    let mut lines = vec![format!("{} ({handle})", report.label)];
    for (name, captured) in &report.values {
        let value = match captured {
            Captured::Present { value } => value.to_string(),
            Captured::Absent => "<not set>".to_string(),
            Captured::Unreadable { reason } => format!("<unreadable: {reason}>"),
        };
        lines.push(format!("  {name} = {value}"));
    }
    lines
}
