//! Optimize step that applies a domain's values through the mutation engine.
use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult};
use crate::config::AppConfig;
use crate::domains::{DesiredValues, Domain};
use crate::error::ValidationError;
use crate::mutation::MutationRequest;

/// The values `optimize` applies to `domain`.
///
/// DNS uses the configured preset and MTU the configured value; every other
/// domain uses its default preset.
///
/// # Errors
///
/// Returns [`ValidationError`] if a configured preset or value is invalid.
pub fn optimize_values(domain: Domain, config: &AppConfig) -> Result<DesiredValues, ValidationError> {
    let spec = domain.spec();
    match domain {
        Domain::Dns => spec.preset_values(&config.dns_preset),
        Domain::Mtu => spec.primary_value(&config.mtu.to_string()),
        Domain::Lso
        | Domain::AdapterPower
        | Domain::TcpTimeout
        | Domain::TcpStack
        | Domain::WindowsUpdate
        | Domain::UpdateServices => spec.preset_values(spec.default_preset),
    }
}

/// Apply a domain's optimize values to every eligible resource.
#[derive(Debug)]
pub struct ApplyDomain {
    domain: Domain,
}

impl ApplyDomain {
    /// Step for `domain`.
    #[must_use]
    pub const fn new(domain: Domain) -> Self {
        Self { domain }
    }
}

impl Task for ApplyDomain {
    fn name(&self) -> &str {
        self.domain.name()
    }

    fn title(&self) -> &str {
        self.domain.spec().title
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let request = MutationRequest {
            values: optimize_values(self.domain, &ctx.config)?,
            resource_filter: None,
            take_snapshot: true,
        };
        let result = ctx
            .engine(self.domain)
            .apply(&request)
            .with_context(|| format!("applying {}", self.domain))?;
        let summary = result.summary();
        Ok(if result.is_success() {
            TaskResult::Ok(summary)
        } else {
            TaskResult::Failed(summary)
        })
    }
}
