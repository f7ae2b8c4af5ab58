//! Named optimize steps and the fail-forward sequence that runs them.
pub mod action;
mod context;
pub mod mutation;

pub use context::Context;

use anyhow::{Result, bail};

use crate::actions;
use crate::domains::Domain;
use crate::logging::StepStatus;

/// What a step reports when it ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// The step reached its goal; carries a short summary.
    Ok(String),
    /// The step ran but did not reach its goal; carries a short summary.
    Failed(String),
}

/// A named, executable step of the optimize sequence.
pub trait Task: Send + Sync {
    /// Identifier used by `--skip`/`--only` and in the step summary.
    fn name(&self) -> &str;

    /// Human-readable stage title.
    fn title(&self) -> &str;

    /// Execute the step.
    ///
    /// # Errors
    ///
    /// Returns an error when the step cannot run at all, such as an invalid
    /// configured value or a failed adapter discovery.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// The full optimize sequence, in execution order.
#[must_use]
pub fn all_optimize_steps() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(action::RunAction::new(&actions::NETWORK_RESET)),
        Box::new(action::RunAction::new(&actions::SSL_CLEANUP)),
        Box::new(mutation::ApplyDomain::new(Domain::Dns)),
        Box::new(mutation::ApplyDomain::new(Domain::Lso)),
        Box::new(mutation::ApplyDomain::new(Domain::Mtu)),
        Box::new(mutation::ApplyDomain::new(Domain::AdapterPower)),
        Box::new(mutation::ApplyDomain::new(Domain::TcpTimeout)),
        Box::new(mutation::ApplyDomain::new(Domain::TcpStack)),
        Box::new(mutation::ApplyDomain::new(Domain::WindowsUpdate)),
        Box::new(mutation::ApplyDomain::new(Domain::UpdateServices)),
        Box::new(action::RunAction::new(&actions::SYSTEM_OPTIMIZATION)),
        Box::new(action::RunAction::new(&actions::SYSTEM_REPAIR)),
    ]
}

/// Keep the steps named by `only` (all when empty), minus those in `skip`.
///
/// # Errors
///
/// Returns an error if a name in either list matches no step.
pub fn select(
    steps: Vec<Box<dyn Task>>,
    skip: &[String],
    only: &[String],
) -> Result<Vec<Box<dyn Task>>> {
    for name in skip.iter().chain(only) {
        if !steps.iter().any(|s| s.name().eq_ignore_ascii_case(name)) {
            let known: Vec<&str> = steps.iter().map(|s| s.name()).collect();
            bail!("unknown step '{name}' (known: {})", known.join(", "));
        }
    }
    let named = |list: &[String], step: &dyn Task| {
        list.iter().any(|n| n.eq_ignore_ascii_case(step.name()))
    };
    Ok(steps
        .into_iter()
        .filter(|s| only.is_empty() || named(only, s.as_ref()))
        .filter(|s| !named(skip, s.as_ref()))
        .collect())
}

/// Outcome of one step in a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Step name.
    pub name: String,
    /// Whether the step reached its goal.
    pub succeeded: bool,
    /// Summary or error text.
    pub detail: String,
}

/// Overall verdict of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// At least the threshold share of steps succeeded.
    FullyOptimized,
    /// Fewer steps succeeded than the threshold requires.
    PartiallyOptimized,
}

/// Outcome of [`run_sequence`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceResult {
    /// Per-step reports in execution order.
    pub reports: Vec<StepReport>,
    /// Steps that succeeded.
    pub succeeded: usize,
    /// Steps that ran.
    pub total: usize,
}

impl SequenceResult {
    /// Judge the sequence against `threshold_percent`.
    ///
    /// `succeeded * 100 >= total * threshold` is fully optimized; an empty
    /// sequence never is.
    #[must_use]
    pub fn verdict(&self, threshold_percent: u32) -> Verdict {
        let threshold = usize::try_from(threshold_percent).unwrap_or(usize::MAX);
        if self.total > 0 && self.succeeded * 100 >= self.total * threshold {
            Verdict::FullyOptimized
        } else {
            Verdict::PartiallyOptimized
        }
    }
}

/// Run `steps` strictly in order, recording each result.
///
/// A step that errors or reports failure is logged and recorded; the next
/// step still runs.
pub fn run_sequence(steps: &[Box<dyn Task>], ctx: &Context) -> SequenceResult {
    let mut result = SequenceResult::default();
    for (index, step) in steps.iter().enumerate() {
        ctx.log
            .stage(&format!("[{}/{}] {}", index + 1, steps.len(), step.title()));

        let (succeeded, detail) = match step.run(ctx) {
            Ok(TaskResult::Ok(summary)) => {
                ctx.log.record_step(step.name(), StepStatus::Ok, Some(&summary));
                (true, summary)
            }
            Ok(TaskResult::Failed(summary)) => {
                ctx.log.warn(&format!("{}: {summary}", step.title()));
                ctx.log
                    .record_step(step.name(), StepStatus::Failed, Some(&summary));
                (false, summary)
            }
            Err(e) => {
                let detail = format!("{e:#}");
                ctx.log.error(&format!("{}: {detail}", step.title()));
                ctx.log
                    .record_step(step.name(), StepStatus::Failed, Some(&detail));
                (false, detail)
            }
        };

        result.total += 1;
        if succeeded {
            result.succeeded += 1;
        }
        result.reports.push(StepReport {
            name: step.name().to_string(),
            succeeded,
            detail,
        });
    }
    result
}

/// Shared helpers for task unit tests.
#[cfg(test)]
pub mod test_helpers {
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::exec::Executor;
    use crate::logging::test_helpers::RecordingLog;
    use crate::resources::{Resource, StaticInventory};
    use crate::store::MemoryStore;

    use super::Context;

    /// Build a [`Context`] over in-memory backends with snapshots under
    /// `state_dir`, returning the recording logger as well.
    pub fn make_context(
        state_dir: &std::path::Path,
        executor: Arc<dyn Executor>,
        registry: Arc<MemoryStore>,
        netsh: Arc<MemoryStore>,
        resources: Vec<Resource>,
    ) -> (Context, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        let config = AppConfig {
            state_dir: Some(state_dir.to_path_buf()),
            ..AppConfig::default()
        };
        let ctx = Context::new(config, Arc::clone(&log) as Arc<dyn crate::logging::Log>, executor)
            .with_backends(registry, netsh, Arc::new(StaticInventory::new(resources)));
        (ctx, log)
    }
}
