//! Optimize step that runs a composite command action.
use anyhow::Result;

use super::{Context, Task, TaskResult};
use crate::actions::CommandAction;

/// Run a fixed [`CommandAction`] as one optimize step.
#[derive(Debug)]
pub struct RunAction {
    action: &'static CommandAction,
}

impl RunAction {
    /// Wrap `action` as a step.
    #[must_use]
    pub const fn new(action: &'static CommandAction) -> Self {
        Self { action }
    }
}

impl Task for RunAction {
    fn name(&self) -> &str {
        self.action.name
    }

    fn title(&self) -> &str {
        self.action.title
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let result = self.action.run(
            ctx.executor.as_ref(),
            ctx.log.as_ref(),
            ctx.config.command_timeout(),
        );
        let summary = result.summary();
        Ok(if result.passed {
            TaskResult::Ok(summary)
        } else {
            TaskResult::Failed(summary)
        })
    }
}
