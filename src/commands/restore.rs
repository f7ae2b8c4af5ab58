//! Command: write back the values captured by the last snapshot.
use std::sync::Arc;

use anyhow::{Result, bail};

use super::{CommandSetup, report_mutation};
use crate::cli::{GlobalOpts, RestoreOpts};
use crate::logging::Logger;

/// Run the restore command.
///
/// A domain without a snapshot has nothing to restore and succeeds.
///
/// # Errors
///
/// Returns an error if the snapshot is unreadable, or if it covered at least
/// one scope and none of them could be restored.
pub fn run(global: &GlobalOpts, opts: &RestoreOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    setup.warn_if_not_elevated();

    let spec = opts.domain.spec();
    log.stage(&format!("Restoring {}", spec.title));
    let result = setup
        .ctx
        .engine(opts.domain)
        .restore(opts.adapter.as_deref())?;
    if result.attempted == 0 {
        return Ok(());
    }
    report_mutation(log.as_ref(), spec.name, &result);
    if !result.is_success() {
        bail!("{}: {}", spec.name, result.summary());
    }
    Ok(())
}
