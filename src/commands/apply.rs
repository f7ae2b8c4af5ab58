//! Command: snapshot, then write a domain's settings.
use std::sync::Arc;

use anyhow::{Result, bail};

use super::{CommandSetup, report_mutation};
use crate::cli::{ApplyOpts, GlobalOpts};
use crate::config::AppConfig;
use crate::domains::DesiredValues;
use crate::error::ValidationError;
use crate::logging::Logger;
use crate::mutation::MutationRequest;
use crate::tasks::mutation::optimize_values;

/// Run the apply command.
///
/// # Errors
///
/// Returns an error if a requested value is invalid, discovery fails, or no
/// adapter ended up at the requested values.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let values = requested_values(opts, &setup.ctx.config)?;
    let request = MutationRequest {
        values,
        resource_filter: opts.adapter.clone(),
        take_snapshot: !opts.no_backup,
    };

    setup.warn_if_not_elevated();
    let spec = opts.domain.spec();
    log.stage(&format!("Applying {}", spec.title));
    for (name, desired) in &request.values {
        log.debug(&format!("{name} -> {desired}"));
    }

    let result = setup.ctx.engine(opts.domain).apply(&request)?;
    report_mutation(log.as_ref(), spec.name, &result);
    if !result.is_success() {
        bail!("{}: {}", spec.name, result.summary());
    }
    Ok(())
}

/// Values chosen by `--value`, `--preset` or `--set`, else the values
/// `optimize` would apply.
///
/// # Errors
///
/// Returns [`ValidationError`] for unknown presets or settings and
/// unparsable values.
pub fn requested_values(
    opts: &ApplyOpts,
    config: &AppConfig,
) -> Result<DesiredValues, ValidationError> {
    let spec = opts.domain.spec();
    if let Some(value) = &opts.value {
        spec.primary_value(value)
    } else if let Some(preset) = &opts.preset {
        spec.preset_values(preset)
    } else if !opts.set.is_empty() {
        spec.assignment_values(&opts.set)
    } else {
        optimize_values(opts.domain, config)
    }
}
