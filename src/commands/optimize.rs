//! Command: run the full optimization sequence.
use std::sync::Arc;

use anyhow::{Result, bail};

use super::CommandSetup;
use crate::cli::{GlobalOpts, OptimizeOpts};
use crate::config::AppConfig;
use crate::logging::{Log, Logger, StepStatus};
use crate::tasks::{self, SequenceResult, Task, Verdict};

/// Printed after a fully optimized run.
pub const RESTART_RECOMMENDATION: &str =
    "Restart the computer so every change takes full effect.";

/// Run the optimize command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, a `--skip`/`--only`
/// name is unknown, or the sequence ends partially optimized.
pub fn run(global: &GlobalOpts, opts: &OptimizeOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let threshold = opts
        .threshold
        .unwrap_or(setup.ctx.config.threshold_percent);
    let steps = selected_steps(opts, &setup.ctx.config)?;

    setup.warn_if_not_elevated();
    let result = tasks::run_sequence(&steps, &setup.ctx);
    record_skipped(log.as_ref(), &steps);
    log.print_summary();

    let (verdict, message) = conclude(&result, threshold);
    match verdict {
        Verdict::FullyOptimized => {
            log.info(&message);
            log.stage("Restart recommended");
            log.info(RESTART_RECOMMENDATION);
            Ok(())
        }
        Verdict::PartiallyOptimized => bail!("{message}"),
    }
}

/// Optimize steps after applying the configured and command-line filters.
///
/// # Errors
///
/// Returns an error if a filter names an unknown step.
pub fn selected_steps(opts: &OptimizeOpts, config: &AppConfig) -> Result<Vec<Box<dyn Task>>> {
    let mut skip = config.skip.clone();
    skip.extend(opts.skip.iter().cloned());
    tasks::select(tasks::all_optimize_steps(), &skip, &opts.only)
}

/// Record every optimize step left out of `selected` as skipped, so the
/// summary lists the full sequence.
pub fn record_skipped(log: &dyn Log, selected: &[Box<dyn Task>]) {
    for step in tasks::all_optimize_steps() {
        if !selected.iter().any(|s| s.name() == step.name()) {
            log.record_step(step.name(), StepStatus::Skipped, Some("filtered out"));
        }
    }
}

/// Verdict and the line describing it.
#[must_use]
pub fn conclude(result: &SequenceResult, threshold: u32) -> (Verdict, String) {
    let verdict = result.verdict(threshold);
    let label = match verdict {
        Verdict::FullyOptimized => "fully optimized",
        Verdict::PartiallyOptimized => "partially optimized",
    };
    (
        verdict,
        format!(
            "{label}: {} of {} steps succeeded (threshold {threshold}%)",
            result.succeeded, result.total
        ),
    )
}
